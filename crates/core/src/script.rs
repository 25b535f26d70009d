//! Script record model and the identifiers used to look records up.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{ScriptId, Timestamp};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A persisted script. Immutable once stored; there is no update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub id: ScriptId,
    pub name: String,
    pub content: String,
    pub created_at: Timestamp,
}

impl ScriptRecord {
    /// Label handed to the engine for diagnostics and stack traces.
    pub fn source_label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Listing entry: a record without its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSummary {
    pub id: ScriptId,
    pub name: String,
    pub created_at: Timestamp,
}

impl From<&ScriptRecord> for ScriptSummary {
    fn from(record: &ScriptRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            created_at: record.created_at,
        }
    }
}

/// DTO for uploading a new script.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewScript {
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    pub name: String,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Exact-match key understood by every [`ScriptStore`](crate::store::ScriptStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLookup {
    Id(ScriptId),
    Name(String),
}

/// Caller-supplied reference to a script: an opaque id, a name, or both.
///
/// Empty strings count as absent, matching how the fields arrive over the
/// wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ScriptRef {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Lookup used for execution: the id wins when both are present.
    ///
    /// Returns `Ok(None)` when the id is not a UUID, since such an id cannot
    /// name any stored record.
    pub fn preferring_id(&self) -> Result<Option<ScriptLookup>, CoreError> {
        match (self.id(), self.name()) {
            (Some(id), _) => Ok(parse_id(id).map(ScriptLookup::Id)),
            (None, Some(name)) => Ok(Some(ScriptLookup::Name(name.to_string()))),
            (None, None) => Err(missing_reference()),
        }
    }

    /// Lookup used for deletion: the name wins when both are present.
    pub fn preferring_name(&self) -> Result<Option<ScriptLookup>, CoreError> {
        match (self.name(), self.id()) {
            (Some(name), _) => Ok(Some(ScriptLookup::Name(name.to_string()))),
            (None, Some(id)) => Ok(parse_id(id).map(ScriptLookup::Id)),
            (None, None) => Err(missing_reference()),
        }
    }
}

impl fmt::Display for ScriptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.id(), self.name()) {
            (Some(id), _) => write!(f, "id '{id}'"),
            (None, Some(name)) => write!(f, "name '{name}'"),
            (None, None) => write!(f, "<empty reference>"),
        }
    }
}

fn parse_id(id: &str) -> Option<ScriptId> {
    ScriptId::parse_str(id).ok()
}

fn missing_reference() -> CoreError {
    CoreError::Validation("either id or name is required".to_string())
}
