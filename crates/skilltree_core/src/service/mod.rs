//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate gateway, graph and session calls into the editor API.
//! - Keep UI/FFI layers decoupled from storage and graph internals.

pub mod graph_editor;
