//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the skill-tree editor to Dart via FRB as sync, use-case-level
//!   functions.
//! - Keep one process-wide editor session over the entry database.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported inside response envelopes, never thrown.
//! - Only one scope is loaded at a time; loading another discards edits.

use log::error;
use rusqlite::Connection;
use skilltree_core::db::open_db;
use skilltree_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    EditError, EngineConfig, GatewayResult, GraphEditor, LayoutConfig, LoggingConfig, SaveResult,
    SkillGateway, SkillId, SkillNode, SqliteSkillRepository,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};

const ENTRY_DB_FILE_NAME: &str = "skilltree_entry.sqlite3";
static ENTRY_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static LAYOUT_CONFIG: Mutex<Option<LayoutConfig>> = Mutex::new(None);
static EDITOR: Mutex<Option<GraphEditor<ConnectionGateway>>> = Mutex::new(None);

/// Gateway owning its SQLite connection so the editor can outlive a call.
struct ConnectionGateway {
    conn: Connection,
}

impl SkillGateway for ConnectionGateway {
    fn fetch_nodes(&self, scope_id: &str) -> GatewayResult<Vec<SkillNode>> {
        SqliteSkillRepository::try_new(&self.conn)?.fetch_nodes(scope_id)
    }

    fn update_node_edges(&self, node_id: &str, prerequisite_ids: &[SkillId]) -> GatewayResult<()> {
        SqliteSkillRepository::try_new(&self.conn)?.update_node_edges(node_id, prerequisite_ids)
    }
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(&LoggingConfig::new(level, log_dir)) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Applies a JSON engine config (layout + optional logging section).
///
/// The layout section takes effect on the next `graph_load_scope`.
/// Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_configure(config_json: String) -> String {
    let config = match EngineConfig::from_json_str(&config_json) {
        Ok(config) => config,
        Err(err) => return err.to_string(),
    };
    if let Some(logging) = &config.logging {
        if let Err(err) = init_logging_inner(logging) {
            return err;
        }
    }
    match LAYOUT_CONFIG.lock() {
        Ok(mut slot) => {
            *slot = Some(config.layout);
            String::new()
        }
        Err(_) => "engine_configure failed: config lock poisoned".to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Optional id created or affected by the operation.
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl GraphActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Positioned node for canvas rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNodeItem {
    pub node_id: String,
    pub name: String,
    pub difficulty: Option<u32>,
    pub prerequisite_ids: Vec<String>,
    pub rank: u32,
    pub slot: u32,
    pub x: f64,
    pub y: f64,
    /// Whether this node has unsaved prerequisite changes.
    pub dirty: bool,
}

/// Snapshot of the loaded scope.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphViewResponse {
    pub ok: bool,
    pub scope_id: Option<String>,
    /// Nodes in load order.
    pub nodes: Vec<GraphNodeItem>,
    pub rank_count: u32,
    pub dirty_count: u32,
    pub message: String,
}

impl GraphViewResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            scope_id: None,
            nodes: Vec::new(),
            rank_count: 0,
            dirty_count: 0,
            message: message.into(),
        }
    }
}

/// Result of one edge gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeChangeResponse {
    pub ok: bool,
    /// Whether the graph changed; repeats of an applied change report `false`.
    pub changed: bool,
    /// `invalid_edge`, `cycle` or `no_scope` when rejected.
    pub rejection: Option<String>,
    pub dirty_count: u32,
    pub message: String,
}

/// Result of one save batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveResponse {
    pub ok: bool,
    pub saved_count: u32,
    pub failed_node_id: Option<String>,
    /// Nodes still awaiting persistence after this batch.
    pub dirty_count: u32,
    pub message: String,
}

/// Creates a scope in the entry database.
#[flutter_rust_bridge::frb(sync)]
pub fn skill_scope_create(scope_id: String, display_name: String) -> GraphActionResponse {
    let scope_id = scope_id.trim().to_string();
    if scope_id.is_empty() {
        return GraphActionResponse::failure("skill_scope_create failed: scope_id is empty");
    }
    let result = with_entry_repo(|repo| repo.create_scope(&scope_id, &display_name));
    match result {
        Ok(()) => GraphActionResponse::success("Scope ready.", Some(scope_id)),
        Err(err) => GraphActionResponse::failure(format!("skill_scope_create failed: {err}")),
    }
}

/// Creates a skill with a generated id and no prerequisites.
#[flutter_rust_bridge::frb(sync)]
pub fn skill_create(
    scope_id: String,
    name: String,
    difficulty: Option<u32>,
) -> GraphActionResponse {
    match with_entry_repo(|repo| repo.create_skill(scope_id.trim(), &name, difficulty)) {
        Ok(node) => GraphActionResponse::success("Skill created.", Some(node.id)),
        Err(err) => GraphActionResponse::failure(format!("skill_create failed: {err}")),
    }
}

/// Loads one scope into the process-wide editor.
///
/// # FFI contract
/// - Discards unsaved edits of any previously loaded scope.
/// - Picks up the layout settings last stored by `engine_configure`.
/// - On failure no scope stays loaded.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_load_scope(scope_id: String) -> GraphViewResponse {
    let mut slot = match lock_editor() {
        Ok(slot) => slot,
        Err(message) => return GraphViewResponse::failure(message),
    };
    if slot.is_none() {
        match new_editor() {
            Ok(editor) => *slot = Some(editor),
            Err(message) => return GraphViewResponse::failure(message),
        }
    }
    let Some(editor) = slot.as_mut() else {
        return GraphViewResponse::failure("graph_load_scope failed: editor unavailable");
    };
    editor.set_layout_config(configured_layout());
    match editor.load(scope_id.trim()) {
        Ok(()) => build_view(editor, "Scope loaded."),
        Err(err) => GraphViewResponse::failure(format!("graph_load_scope failed: {err}")),
    }
}

/// Returns the current graph with layout coordinates.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_view() -> GraphViewResponse {
    match lock_editor() {
        Ok(slot) => match slot.as_ref() {
            Some(editor) if editor.scope().is_some() => build_view(editor, "OK."),
            _ => GraphViewResponse::failure("No scope loaded."),
        },
        Err(message) => GraphViewResponse::failure(message),
    }
}

/// Makes `dependent_id` require `prerequisite_id`.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_add_edge(prerequisite_id: String, dependent_id: String) -> EdgeChangeResponse {
    edit_edge(|editor| editor.add_edge(&prerequisite_id, &dependent_id))
}

/// Drops `prerequisite_id` from `dependent_id`'s requirements.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_remove_edge(prerequisite_id: String, dependent_id: String) -> EdgeChangeResponse {
    edit_edge(|editor| editor.remove_edge(&prerequisite_id, &dependent_id))
}

/// Persists dirty nodes one by one; stops at the first failure.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_save() -> SaveResponse {
    let mut slot = match lock_editor() {
        Ok(slot) => slot,
        Err(message) => return save_failure(message),
    };
    let Some(editor) = slot.as_mut() else {
        return save_failure("No scope loaded.");
    };
    let result = editor.save();
    save_response(result, to_u32(editor.dirty_count()))
}

/// Discards unsaved edits.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_reset() -> GraphActionResponse {
    match lock_editor() {
        Ok(mut slot) => match slot.as_mut() {
            Some(editor) => {
                editor.reset();
                GraphActionResponse::success("Edits discarded.", editor.scope().map(str::to_string))
            }
            None => GraphActionResponse::failure("No scope loaded."),
        },
        Err(message) => GraphActionResponse::failure(message),
    }
}

/// Text dump of the loaded graph; empty when nothing is loaded.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_dump() -> String {
    match lock_editor() {
        Ok(slot) => slot
            .as_ref()
            .map(GraphEditor::dump_graph)
            .unwrap_or_default(),
        Err(message) => message,
    }
}

/// Invariant issues of the loaded graph, one message per issue.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_validate() -> Vec<String> {
    match lock_editor() {
        Ok(slot) => slot
            .as_ref()
            .map(|editor| {
                editor
                    .validate()
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Err(message) => vec![message],
    }
}

fn edit_edge(
    apply: impl FnOnce(&mut GraphEditor<ConnectionGateway>) -> Result<bool, EditError>,
) -> EdgeChangeResponse {
    let mut slot = match lock_editor() {
        Ok(slot) => slot,
        Err(message) => return edge_rejection(None, message, 0),
    };
    let Some(editor) = slot.as_mut() else {
        let err = EditError::NoScopeLoaded;
        return edge_rejection(Some(&err), err.to_string(), 0);
    };
    match apply(editor) {
        Ok(changed) => EdgeChangeResponse {
            ok: true,
            changed,
            rejection: None,
            dirty_count: to_u32(editor.dirty_count()),
            message: if changed { "Edge updated." } else { "No change." }.to_string(),
        },
        Err(err) => edge_rejection(Some(&err), err.to_string(), to_u32(editor.dirty_count())),
    }
}

fn edge_rejection(err: Option<&EditError>, message: String, dirty_count: u32) -> EdgeChangeResponse {
    EdgeChangeResponse {
        ok: false,
        changed: false,
        rejection: err.map(|err| rejection_label(err).to_string()),
        dirty_count,
        message,
    }
}

fn rejection_label(err: &EditError) -> &'static str {
    if err.is_cycle_rejection() {
        "cycle"
    } else if err.is_invalid_edge() {
        "invalid_edge"
    } else {
        "no_scope"
    }
}

fn save_response(result: SaveResult, dirty_count: u32) -> SaveResponse {
    let message = match (&result.failed_node_id, &result.error) {
        (Some(node_id), Some(err)) => format!("graph_save stopped at {node_id}: {err}"),
        _ if result.saved_count == 0 => "Nothing to save.".to_string(),
        _ => format!("Saved {} skill(s).", result.saved_count),
    };
    SaveResponse {
        ok: result.is_complete(),
        saved_count: to_u32(result.saved_count),
        failed_node_id: result.failed_node_id,
        dirty_count,
        message,
    }
}

fn save_failure(message: impl Into<String>) -> SaveResponse {
    SaveResponse {
        ok: false,
        saved_count: 0,
        failed_node_id: None,
        dirty_count: 0,
        message: message.into(),
    }
}

fn build_view(editor: &GraphEditor<ConnectionGateway>, message: &str) -> GraphViewResponse {
    let layout = editor.layout();
    let nodes = editor
        .nodes()
        .into_iter()
        .map(|node| {
            let entry = layout.entry(&node.id);
            GraphNodeItem {
                dirty: editor.is_dirty(&node.id),
                rank: entry.map_or(0, |entry| to_u32(entry.rank)),
                slot: entry.map_or(0, |entry| to_u32(entry.slot)),
                x: entry.map_or(0.0, |entry| entry.x),
                y: entry.map_or(0.0, |entry| entry.y),
                prerequisite_ids: node.prerequisite_ids.unwrap_or_default(),
                node_id: node.id,
                name: node.name,
                difficulty: node.difficulty,
            }
        })
        .collect();
    GraphViewResponse {
        ok: true,
        scope_id: editor.scope().map(str::to_string),
        nodes,
        rank_count: to_u32(layout.rank_count()),
        dirty_count: to_u32(editor.dirty_count()),
        message: message.to_string(),
    }
}

fn lock_editor() -> Result<MutexGuard<'static, Option<GraphEditor<ConnectionGateway>>>, String> {
    EDITOR.lock().map_err(|_| {
        error!("event=editor_lock module=ffi status=error reason=poisoned");
        "editor lock poisoned".to_string()
    })
}

fn new_editor() -> Result<GraphEditor<ConnectionGateway>, String> {
    let conn = open_db(resolve_entry_db_path())
        .map_err(|err| format!("entry DB open failed: {err}"))?;
    SqliteSkillRepository::try_new(&conn).map_err(|err| format!("entry repo init failed: {err}"))?;
    Ok(GraphEditor::with_layout_config(
        ConnectionGateway { conn },
        configured_layout(),
    ))
}

fn configured_layout() -> LayoutConfig {
    LAYOUT_CONFIG
        .lock()
        .map(|slot| slot.clone().unwrap_or_default())
        .unwrap_or_default()
}

fn with_entry_repo<T>(
    f: impl FnOnce(&SqliteSkillRepository<'_>) -> GatewayResult<T>,
) -> Result<T, String> {
    let conn = open_db(resolve_entry_db_path())
        .map_err(|err| format!("entry DB open failed: {err}"))?;
    let repo = SqliteSkillRepository::try_new(&conn)
        .map_err(|err| format!("entry repo init failed: {err}"))?;
    f(&repo).map_err(|err| err.to_string())
}

fn resolve_entry_db_path() -> PathBuf {
    ENTRY_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("SKILLTREE_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(ENTRY_DB_FILE_NAME)
        })
        .clone()
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
