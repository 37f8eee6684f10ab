//! Core engine for skill-tree prerequisite graphs.
//! This crate is the single source of truth for graph invariants.

pub mod config;
pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use config::{ConfigError, EngineConfig};
pub use graph::cycle::{topological_order, would_create_cycle};
pub use graph::inspect::{dump_graph, validate, GraphIssue};
pub use graph::layout::{compute_layout, Layout, LayoutConfig, LayoutEntry, Orientation};
pub use graph::model::{GraphBuildError, GraphModel};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::skill::{ScopeId, SkillId, SkillNode, SkillValidationError};
pub use repo::gateway::{GatewayError, GatewayResult, SkillGateway};
pub use repo::skill_repo::SqliteSkillRepository;
pub use service::graph_editor::{GraphEditor, LoadError, SaveResult};
pub use session::edit_session::{EdgeOp, EditError, EditSession, NodeEdgesUpdate};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
