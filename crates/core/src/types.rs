/// Script ids are random (v4) UUIDs, exposed to callers as opaque strings.
pub type ScriptId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
