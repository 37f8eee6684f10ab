//! Edit-session change tracking.
//!
//! # Responsibility
//! - Pair a live graph with the last persisted baseline.
//! - Track exactly which nodes carry unsaved prerequisite changes.
//!
//! # Invariants
//! - A node is dirty iff its current prerequisite set differs from baseline.
//! - Only the dependent side of an edge change can become dirty.

pub mod edit_session;
