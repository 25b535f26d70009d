//! Script entity rows and their conversion into core records.

use scriptbox_core::script::{ScriptRecord, ScriptSummary};
use scriptbox_core::types::{ScriptId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A full row of the `scripts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Script {
    pub id: ScriptId,
    pub name: String,
    pub content: String,
    pub created_at: Timestamp,
}

/// A `scripts` row without its content, as returned by listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScriptListing {
    pub id: ScriptId,
    pub name: String,
    pub created_at: Timestamp,
}

impl From<Script> for ScriptRecord {
    fn from(row: Script) -> Self {
        Self {
            id: row.id,
            name: row.name,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

impl From<ScriptListing> for ScriptSummary {
    fn from(row: ScriptListing) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}
