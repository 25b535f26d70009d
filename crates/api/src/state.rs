use std::sync::Arc;

use crate::config::ServerConfig;
use crate::scripting::orchestrator::ScriptOrchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Upload, run, list and delete over the configured store and engine.
    pub orchestrator: Arc<ScriptOrchestrator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
