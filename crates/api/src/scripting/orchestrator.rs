//! Central script orchestrator service.
//!
//! Coordinates the store and the engine for every script operation. Held in
//! [`AppState`](crate::state::AppState) as an `Arc<ScriptOrchestrator>`.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use futures::stream::BoxStream;
use scriptbox_core::error::CoreError;
use scriptbox_core::script::{NewScript, ScriptRecord, ScriptRef, ScriptSummary};
use scriptbox_core::scripting::{resolve, serialize_result, EvalRequest, ScriptEngine};
use scriptbox_core::store::ScriptStore;
use scriptbox_core::types::ScriptId;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::AppResult;

/// Orchestrates uploads, runs, listings and deletions.
///
/// Running a script:
/// 1. Resolve the reference to one stored record (id before name).
/// 2. Evaluate its content in a fresh scope seeded with the caller bindings.
/// 3. Serialize the final value to compact JSON text.
pub struct ScriptOrchestrator {
    store: Arc<dyn ScriptStore>,
    engine: ScriptEngine,
}

impl ScriptOrchestrator {
    pub fn new(store: Arc<dyn ScriptStore>, engine: ScriptEngine) -> Self {
        Self { store, engine }
    }

    /// Store a new script under a fresh id.
    ///
    /// `created_at` is truncated to microseconds so the returned value is the
    /// one every store reports back.
    pub async fn upload(&self, input: NewScript) -> AppResult<ScriptRecord> {
        input
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let record = ScriptRecord {
            id: ScriptId::new_v4(),
            name: input.name,
            content: input.content,
            created_at: Utc::now().trunc_subsecs(6),
        };
        self.store.insert(&record).await?;

        tracing::info!(script_id = %record.id, name = %record.name, "Script uploaded");
        Ok(record)
    }

    /// Run a stored script and return its serialized result.
    pub async fn run(
        &self,
        reference: &ScriptRef,
        environment: Map<String, Value>,
    ) -> AppResult<String> {
        let record = resolve(self.store.as_ref(), reference).await?;
        tracing::debug!(script_id = %record.id, bindings = environment.len(), "Running script");

        let value = self
            .engine
            .evaluate(EvalRequest {
                label: record.source_label(),
                source: record.content,
                environment,
            })
            .await?;

        Ok(serialize_result(&value)?)
    }

    /// Lazily list every stored script, oldest first.
    pub fn list(&self) -> BoxStream<'static, Result<ScriptSummary, CoreError>> {
        self.store.list_all()
    }

    /// Delete by name when given, otherwise by id. Deleting something that
    /// does not exist succeeds. Returns the number of records removed.
    pub async fn delete(&self, reference: &ScriptRef) -> AppResult<u64> {
        let Some(lookup) = reference.preferring_name()? else {
            return Ok(0);
        };
        let removed = self.store.delete(&lookup).await?;

        tracing::info!(reference = %reference, removed, "Scripts deleted");
        Ok(removed)
    }

    /// Whether the backing store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.store.health_check().await.is_ok()
    }
}
