//! In-memory prerequisite graph engine.
//!
//! # Responsibility
//! - Hold one scope's skills and their "requires" edges.
//! - Gate edge insertion on acyclicity.
//! - Produce a deterministic layered layout for rendering.
//!
//! # Invariants
//! - Graph state never contains self-loops, duplicate edges, dangling edges
//!   or cycles.
//! - Nothing in this module performs I/O.

pub mod cycle;
pub mod inspect;
pub mod layout;
pub mod model;
