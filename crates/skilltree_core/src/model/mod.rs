//! Domain model for skill-tree prerequisite graphs.
//!
//! # Responsibility
//! - Define the node shape exchanged with persistence gateways and hosts.
//! - Keep identifier types explicit in signatures.
//!
//! # Invariants
//! - Every skill is identified by a stable `SkillId`, unique within its scope.
//! - A `null` prerequisite list is equivalent to an empty one.

pub mod skill;
