//! Prerequisite graph editor use-case service.
//!
//! # Responsibility
//! - Load one scope through a gateway and keep an edit session over it.
//! - Forward edge gestures through the session gates and relayout after
//!   every structural change.
//! - Persist dirty nodes one at a time and report where a batch stopped.
//!
//! # Invariants
//! - A failed load leaves the editor without a scope; edits are refused.
//! - Switching scope or reloading discards unsaved edits without prompting.
//! - `save()` is sequential, not atomic: nodes saved before a failure stay
//!   saved, the failed node and the rest stay dirty.
//! - `save()` writes prerequisites before dependents, so a batch that stops
//!   early never leaves a cycle in the store or in the baseline.

use crate::graph::inspect::{dump_graph, validate, GraphIssue};
use crate::graph::layout::{compute_layout, Layout, LayoutConfig};
use crate::graph::model::{GraphBuildError, GraphModel};
use crate::model::skill::{ScopeId, SkillId, SkillNode};
use crate::repo::gateway::{GatewayError, SkillGateway};
use crate::session::edit_session::{EdgeOp, EditError, EditSession, NodeEdgesUpdate};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from loading a scope.
#[derive(Debug)]
pub enum LoadError {
    /// Gateway fetch failed.
    Gateway(GatewayError),
    /// Fetched batch violates graph invariants.
    Malformed(GraphBuildError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gateway(err) => write!(f, "failed to fetch skills: {err}"),
            Self::Malformed(err) => write!(f, "malformed skill data: {err}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Gateway(err) => Some(err),
            Self::Malformed(err) => Some(err),
        }
    }
}

impl From<GatewayError> for LoadError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl From<GraphBuildError> for LoadError {
    fn from(value: GraphBuildError) -> Self {
        Self::Malformed(value)
    }
}

/// Outcome of one `save()` batch.
#[derive(Debug, Default)]
pub struct SaveResult {
    /// Nodes confirmed persisted in this batch.
    pub saved_count: usize,
    /// Node whose persistence call failed, if any.
    pub failed_node_id: Option<SkillId>,
    /// Error of the failed call.
    pub error: Option<GatewayError>,
}

impl SaveResult {
    /// `true` when every dirty node was persisted.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Skill-tree prerequisite editor over one gateway.
pub struct GraphEditor<G: SkillGateway> {
    gateway: G,
    layout_config: LayoutConfig,
    scope_id: Option<ScopeId>,
    session: Option<EditSession>,
    layout: Layout,
}

impl<G: SkillGateway> GraphEditor<G> {
    /// Creates an editor with default layout settings.
    pub fn new(gateway: G) -> Self {
        Self::with_layout_config(gateway, LayoutConfig::default())
    }

    pub fn with_layout_config(gateway: G, layout_config: LayoutConfig) -> Self {
        Self {
            gateway,
            layout_config,
            scope_id: None,
            session: None,
            layout: Layout::default(),
        }
    }

    /// Replaces the layout settings and recomputes the current layout.
    pub fn set_layout_config(&mut self, layout_config: LayoutConfig) {
        self.layout_config = layout_config;
        self.relayout();
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    /// Loads one scope, replacing any previous graph and unsaved edits.
    ///
    /// # Errors
    /// - `LoadError::Gateway` when the fetch fails.
    /// - `LoadError::Malformed` when the batch has dangling, self or cyclic
    ///   references, or empty or duplicate ids.
    pub fn load(&mut self, scope_id: &str) -> Result<(), LoadError> {
        let started_at = Instant::now();
        let discarded = self.dirty_count();
        if discarded > 0 {
            warn!(
                "event=graph_load module=service status=discard scope_id={} dirty_count={}",
                self.scope_id.as_deref().unwrap_or(""),
                discarded
            );
        }
        self.unload();
        info!("event=graph_load module=service status=start scope_id={scope_id}");

        let model = match self.fetch_model(scope_id) {
            Ok(model) => model,
            Err(err) => {
                error!(
                    "event=graph_load module=service status=error scope_id={} duration_ms={} error={}",
                    scope_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        info!(
            "event=graph_load module=service status=ok scope_id={} node_count={} edge_count={} duration_ms={}",
            scope_id,
            model.len(),
            model.edge_count(),
            started_at.elapsed().as_millis()
        );
        self.session = Some(EditSession::begin(model));
        self.scope_id = Some(scope_id.to_string());
        self.relayout();
        Ok(())
    }

    /// Makes `dependent` require `prerequisite`.
    ///
    /// Returns whether the graph changed.
    pub fn add_edge(&mut self, prerequisite: &str, dependent: &str) -> Result<bool, EditError> {
        self.change_edge(prerequisite, dependent, EdgeOp::Add)
    }

    /// Drops `prerequisite` from `dependent`'s requirements.
    pub fn remove_edge(&mut self, prerequisite: &str, dependent: &str) -> Result<bool, EditError> {
        self.change_edge(prerequisite, dependent, EdgeOp::Remove)
    }

    /// Removes every edge touching `node_id`; returns nodes that changed.
    pub fn detach_node(&mut self, node_id: &str) -> Result<Vec<SkillId>, EditError> {
        let session = self.session.as_mut().ok_or(EditError::NoScopeLoaded)?;
        let changed = session.detach(node_id)?;
        if !changed.is_empty() {
            info!(
                "event=node_detach module=service status=ok node_id={} changed_count={}",
                node_id,
                changed.len()
            );
            self.relayout();
        }
        Ok(changed)
    }

    /// Current layout; empty when no scope is loaded.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn dirty_count(&self) -> usize {
        self.session.as_ref().map_or(0, EditSession::dirty_count)
    }

    pub fn is_dirty(&self, node_id: &str) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.is_dirty(node_id))
    }

    /// Dirty ids in load order.
    pub fn dirty_ids(&self) -> Vec<SkillId> {
        self.session
            .as_ref()
            .map(EditSession::dirty_ids)
            .unwrap_or_default()
    }

    /// Pending persistence calls, one per dirty node, in save order.
    pub fn diff(&self) -> Vec<NodeEdgesUpdate> {
        self.session
            .as_ref()
            .map(EditSession::diff)
            .unwrap_or_default()
    }

    /// Persists dirty nodes sequentially, stopping at the first failure.
    ///
    /// A retry only attempts nodes that are still dirty.
    pub fn save(&mut self) -> SaveResult {
        let Some(session) = self.session.as_mut() else {
            return SaveResult::default();
        };
        let started_at = Instant::now();
        let pending = session.diff();
        if pending.is_empty() {
            return SaveResult::default();
        }
        info!(
            "event=graph_save module=service status=start scope_id={} pending_count={}",
            self.scope_id.as_deref().unwrap_or(""),
            pending.len()
        );

        let mut result = SaveResult::default();
        for update in pending {
            match self
                .gateway
                .update_node_edges(&update.node_id, &update.prerequisite_ids)
            {
                Ok(()) => {
                    session.mark_persisted(&update.node_id);
                    result.saved_count += 1;
                }
                Err(err) => {
                    error!(
                        "event=graph_save module=service status=error node_id={} saved_count={} remaining_dirty={} error={}",
                        update.node_id,
                        result.saved_count,
                        session.dirty_count(),
                        err
                    );
                    result.failed_node_id = Some(update.node_id);
                    result.error = Some(err);
                    return result;
                }
            }
        }

        session.commit();
        info!(
            "event=graph_save module=service status=ok saved_count={} duration_ms={}",
            result.saved_count,
            started_at.elapsed().as_millis()
        );
        result
    }

    /// Discards unsaved edits and restores the last persisted graph.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.as_mut() {
            info!(
                "event=graph_reset module=service status=ok dirty_count={}",
                session.dirty_count()
            );
            session.reset();
            self.relayout();
        }
    }

    /// Currently loaded scope.
    pub fn scope(&self) -> Option<&str> {
        self.scope_id.as_deref()
    }

    /// Live graph, if a scope is loaded.
    pub fn graph(&self) -> Option<&GraphModel> {
        self.session.as_ref().map(EditSession::current)
    }

    /// Live nodes in load order.
    pub fn nodes(&self) -> Vec<SkillNode> {
        self.graph().map(GraphModel::snapshot).unwrap_or_default()
    }

    /// Text dump of the live graph.
    pub fn dump_graph(&self) -> String {
        self.graph().map(dump_graph).unwrap_or_default()
    }

    /// Invariant check of the live graph.
    pub fn validate(&self) -> Vec<GraphIssue> {
        self.graph().map(validate).unwrap_or_default()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn fetch_model(&self, scope_id: &str) -> Result<GraphModel, LoadError> {
        let nodes = self.gateway.fetch_nodes(scope_id)?;
        Ok(GraphModel::from_nodes(nodes)?)
    }

    fn change_edge(
        &mut self,
        prerequisite: &str,
        dependent: &str,
        op: EdgeOp,
    ) -> Result<bool, EditError> {
        let session = self.session.as_mut().ok_or(EditError::NoScopeLoaded)?;
        match session.apply_edge_change(prerequisite, dependent, op) {
            Ok(true) => {
                self.relayout();
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(err) => {
                info!(
                    "event=edge_change module=service status=rejected op={:?} prerequisite_id={} dependent_id={} reason={}",
                    op, prerequisite, dependent, err
                );
                Err(err)
            }
        }
    }

    fn unload(&mut self) {
        self.session = None;
        self.scope_id = None;
        self.layout = Layout::default();
    }

    fn relayout(&mut self) {
        self.layout = match &self.session {
            Some(session) => compute_layout(session.current(), &self.layout_config),
            None => Layout::default(),
        };
    }
}
