//! SQLite-backed skill gateway.
//!
//! # Responsibility
//! - Persist scopes and skills with a denormalized prerequisite list per row.
//! - Keep SQL and JSON column encoding inside the repository boundary.
//!
//! # Invariants
//! - Listing is deterministic: `sort_order ASC, skill_id ASC`.
//! - `prerequisite_ids` is a JSON array of ids, or `NULL` when empty.
//! - Read paths reject malformed rows instead of masking them.

use crate::db::migrations::{latest_version, schema_version};
use crate::model::skill::{SkillId, SkillNode};
use crate::repo::gateway::{GatewayError, GatewayResult, SkillGateway};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const SKILL_SELECT_SQL: &str = "SELECT
    skill_id,
    name,
    difficulty,
    prerequisite_ids
FROM skills";

/// SQLite-backed implementation of [`SkillGateway`].
pub struct SqliteSkillRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSkillRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> GatewayResult<Self> {
        ensure_skill_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Creates a scope; existing scopes keep their name.
    pub fn create_scope(&self, scope_id: &str, display_name: &str) -> GatewayResult<()> {
        self.conn.execute(
            "INSERT INTO skill_scopes (scope_id, display_name)
             VALUES (?1, ?2)
             ON CONFLICT(scope_id) DO NOTHING;",
            params![scope_id, display_name.trim()],
        )?;
        Ok(())
    }

    /// Creates one skill with a generated id and no prerequisites.
    pub fn create_skill(
        &self,
        scope_id: &str,
        name: &str,
        difficulty: Option<u32>,
    ) -> GatewayResult<SkillNode> {
        let mut node = SkillNode::new(Uuid::new_v4().to_string(), name.trim());
        node.difficulty = difficulty;
        self.insert_skill(scope_id, &node)?;
        Ok(node)
    }

    /// Inserts one caller-identified skill at the end of its scope.
    ///
    /// Prerequisites are stored as given; referential checks happen when the
    /// scope is loaded into a graph.
    pub fn insert_skill(&self, scope_id: &str, node: &SkillNode) -> GatewayResult<()> {
        node.validate()
            .map_err(|err| GatewayError::InvalidData(err.to_string()))?;
        self.ensure_scope_exists(scope_id)?;

        let sort_order: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM skills
             WHERE scope_id = ?1;",
            [scope_id],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT INTO skills (
                skill_id,
                scope_id,
                name,
                difficulty,
                prerequisite_ids,
                sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                node.id,
                scope_id,
                node.name,
                node.difficulty,
                encode_prerequisites(node.prerequisites())?,
                sort_order,
            ],
        )?;
        Ok(())
    }

    fn ensure_scope_exists(&self, scope_id: &str) -> GatewayResult<()> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM skill_scopes WHERE scope_id = ?1;",
                [scope_id],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Ok(()),
            None => Err(GatewayError::ScopeNotFound(scope_id.to_string())),
        }
    }
}

impl SkillGateway for SqliteSkillRepository<'_> {
    fn fetch_nodes(&self, scope_id: &str) -> GatewayResult<Vec<SkillNode>> {
        self.ensure_scope_exists(scope_id)?;

        let mut stmt = self.conn.prepare(&format!(
            "{SKILL_SELECT_SQL}
             WHERE scope_id = ?1
             ORDER BY sort_order ASC, skill_id ASC;"
        ))?;
        let mut rows = stmt.query([scope_id])?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next()? {
            nodes.push(parse_skill_row(row)?);
        }
        Ok(nodes)
    }

    fn update_node_edges(&self, node_id: &str, prerequisite_ids: &[SkillId]) -> GatewayResult<()> {
        let changed = self.conn.execute(
            "UPDATE skills
             SET prerequisite_ids = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE skill_id = ?1;",
            params![node_id, encode_prerequisites(prerequisite_ids)?],
        )?;
        if changed == 0 {
            return Err(GatewayError::NodeNotFound(node_id.to_string()));
        }
        Ok(())
    }
}

fn encode_prerequisites(ids: &[SkillId]) -> GatewayResult<Option<String>> {
    if ids.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(ids)
        .map(Some)
        .map_err(|err| GatewayError::InvalidData(format!("cannot encode prerequisites: {err}")))
}

fn parse_skill_row(row: &Row<'_>) -> GatewayResult<SkillNode> {
    let id: String = row.get("skill_id")?;

    let difficulty = row
        .get::<_, Option<i64>>("difficulty")?
        .map(|value| {
            u32::try_from(value).map_err(|_| {
                GatewayError::InvalidData(format!(
                    "invalid difficulty `{value}` in skills.difficulty for {id}"
                ))
            })
        })
        .transpose()?;

    let prerequisite_ids = row
        .get::<_, Option<String>>("prerequisite_ids")?
        .map(|text| {
            serde_json::from_str::<Vec<SkillId>>(&text).map_err(|err| {
                GatewayError::InvalidData(format!(
                    "invalid prerequisite list in skills.prerequisite_ids for {id}: {err}"
                ))
            })
        })
        .transpose()?;

    Ok(SkillNode {
        id,
        name: row.get("name")?,
        difficulty,
        prerequisite_ids,
    })
}

fn ensure_skill_connection_ready(conn: &Connection) -> GatewayResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(GatewayError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["skill_scopes", "skills"] {
        if !table_exists(conn, table)? {
            return Err(GatewayError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> GatewayResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
