//! Persistence gateway contracts and the bundled SQLite implementation.
//!
//! # Responsibility
//! - Define the fetch/upsert boundary the editor persists through.
//! - Keep SQL details out of graph and session code.
//!
//! # Invariants
//! - The unit of persistence is one node's complete prerequisite list.
//! - Gateway APIs return semantic errors (`ScopeNotFound`, `NodeNotFound`)
//!   in addition to transport errors.

pub mod gateway;
pub mod skill_repo;
