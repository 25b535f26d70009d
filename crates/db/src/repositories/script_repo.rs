//! Repository for the `scripts` table.

use scriptbox_core::types::{ScriptId, Timestamp};
use sqlx::PgPool;

use crate::models::script::{Script, ScriptListing};

/// Column list for full-row SELECT queries.
const COLUMNS: &str = "id, name, content, created_at";

/// Provides insert, lookup, listing and delete operations for scripts.
pub struct ScriptRepo;

impl ScriptRepo {
    /// Insert a new script with a caller-assigned id and timestamp.
    pub async fn create(
        pool: &PgPool,
        id: ScriptId,
        name: &str,
        content: &str,
        created_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO scripts (id, name, content, created_at) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(name)
            .bind(content)
            .bind(created_at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Find a script by its id.
    pub async fn find_by_id(pool: &PgPool, id: ScriptId) -> Result<Option<Script>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scripts WHERE id = $1");
        sqlx::query_as::<_, Script>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the oldest script carrying `name`.
    pub async fn find_first_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<Script>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scripts WHERE name = $1 ORDER BY created_at, id LIMIT 1"
        );
        sqlx::query_as::<_, Script>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// One page of listings ordered by `(created_at, id)`, strictly after
    /// `after` when given.
    pub async fn list_page(
        pool: &PgPool,
        after: Option<(Timestamp, ScriptId)>,
        limit: i64,
    ) -> Result<Vec<ScriptListing>, sqlx::Error> {
        let (after_created_at, after_id) = after.unzip();
        sqlx::query_as::<_, ScriptListing>(
            "SELECT id, name, created_at FROM scripts \
             WHERE $1::timestamptz IS NULL OR (created_at, id) > ($1, $2::uuid) \
             ORDER BY created_at, id \
             LIMIT $3",
        )
        .bind(after_created_at)
        .bind(after_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Delete the script with `id`. Returns the number of rows removed.
    pub async fn delete_by_id(pool: &PgPool, id: ScriptId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scripts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every script named `name`. Returns the number of rows removed.
    pub async fn delete_by_name(pool: &PgPool, name: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scripts WHERE name = $1")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
