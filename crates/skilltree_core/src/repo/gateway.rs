//! Persistence gateway contract.
//!
//! # Responsibility
//! - Fetch every skill of one scope.
//! - Replace one skill's prerequisite list.
//!
//! # Invariants
//! - An empty prerequisite slice clears the node's prerequisites.
//! - Implementations own their own timeout/retry policy.

use crate::db::DbError;
use crate::model::skill::{ScopeId, SkillId, SkillNode};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors from persistence gateway operations.
#[derive(Debug)]
pub enum GatewayError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Requested scope does not exist.
    ScopeNotFound(ScopeId),
    /// Target skill does not exist.
    NodeNotFound(SkillId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid node.
    InvalidData(String),
    /// Remote backend refused or could not be reached.
    Unavailable(String),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ScopeNotFound(id) => write!(f, "skill scope not found: {id}"),
            Self::NodeNotFound(id) => write!(f, "skill not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "skill repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "skill repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid skill data: {message}"),
            Self::Unavailable(message) => write!(f, "skill backend unavailable: {message}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for GatewayError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage boundary the graph editor loads from and saves through.
pub trait SkillGateway {
    /// Loads every skill in one scope, in display order.
    fn fetch_nodes(&self, scope_id: &str) -> GatewayResult<Vec<SkillNode>>;
    /// Replaces one skill's prerequisite list.
    fn update_node_edges(&self, node_id: &str, prerequisite_ids: &[SkillId])
        -> GatewayResult<()>;
}

impl<G: SkillGateway + ?Sized> SkillGateway for &G {
    fn fetch_nodes(&self, scope_id: &str) -> GatewayResult<Vec<SkillNode>> {
        (**self).fetch_nodes(scope_id)
    }

    fn update_node_edges(
        &self,
        node_id: &str,
        prerequisite_ids: &[SkillId],
    ) -> GatewayResult<()> {
        (**self).update_node_edges(node_id, prerequisite_ids)
    }
}
