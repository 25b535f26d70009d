//! Handlers for uploading, running, listing and deleting scripts.

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, StreamExt};
use scriptbox_core::error::CoreError;
use scriptbox_core::script::{NewScript, ScriptRef, ScriptSummary};
use scriptbox_core::types::{ScriptId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Media type of the streamed script listing.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for uploading a script.
#[derive(Debug, Deserialize)]
pub struct UploadScriptRequest {
    pub name: String,
    /// Script source text.
    pub script: String,
}

/// Identity assigned to an uploaded script.
#[derive(Debug, Serialize)]
pub struct UploadedScript {
    pub id: ScriptId,
    pub created_at: Timestamp,
}

/// Request body for running a script. `id` wins over `name`.
#[derive(Debug, Deserialize)]
pub struct RunScriptRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Top-level bindings visible to the script.
    #[serde(default)]
    pub env: Map<String, Value>,
}

/// Serialized final value of a script run.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    /// Compact JSON text.
    pub output: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /scripts
pub async fn upload_script(
    State(state): State<AppState>,
    payload: Result<Json<UploadScriptRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<UploadedScript>>)> {
    let Json(input) = payload?;
    let record = state
        .orchestrator
        .upload(NewScript {
            name: input.name,
            content: input.script,
        })
        .await?;

    let data = UploadedScript {
        id: record.id,
        created_at: record.created_at,
    };
    Ok((StatusCode::CREATED, Json(DataResponse { data })))
}

/// POST /scripts/run
pub async fn run_script(
    State(state): State<AppState>,
    payload: Result<Json<RunScriptRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<RunOutput>>> {
    let Json(input) = payload?;
    let reference = ScriptRef {
        id: input.id,
        name: input.name,
    };
    let output = state.orchestrator.run(&reference, input.env).await?;
    Ok(Json(DataResponse {
        data: RunOutput { output },
    }))
}

/// GET /scripts
///
/// Streams one JSON summary per line. The first item is awaited before the
/// response starts so that a store failure up front still yields a regular
/// error response; a failure after that aborts the body.
pub async fn list_scripts(State(state): State<AppState>) -> AppResult<Response> {
    let mut scripts = state.orchestrator.list();
    let first = scripts.next().await.transpose()?;

    let lines = stream::iter(first.map(Ok::<_, CoreError>))
        .chain(scripts)
        .map(|item| item.and_then(|summary| ndjson_line(&summary)));

    Ok(([(CONTENT_TYPE, NDJSON_CONTENT_TYPE)], Body::from_stream(lines)).into_response())
}

/// DELETE /scripts?name=...&id=...
///
/// The name wins when both are given. Missing scripts are not an error.
pub async fn delete_script(
    State(state): State<AppState>,
    query: Result<Query<ScriptRef>, QueryRejection>,
) -> AppResult<StatusCode> {
    let Query(reference) = query?;
    state.orchestrator.delete(&reference).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn ndjson_line(summary: &ScriptSummary) -> Result<Vec<u8>, CoreError> {
    let mut line =
        serde_json::to_vec(summary).map_err(|e| CoreError::Serialization(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}
