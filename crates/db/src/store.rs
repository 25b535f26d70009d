//! [`ScriptStore`] backed by PostgreSQL.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use scriptbox_core::error::CoreError;
use scriptbox_core::script::{ScriptLookup, ScriptRecord, ScriptSummary};
use scriptbox_core::store::ScriptStore;
use scriptbox_core::types::{ScriptId, Timestamp};

use crate::repositories::ScriptRepo;
use crate::DbPool;

/// Rows fetched per listing query.
pub const LIST_PAGE_SIZE: i64 = 256;

/// Script store over a shared connection pool.
#[derive(Clone)]
pub struct PgScriptStore {
    pool: DbPool,
}

impl PgScriptStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Every database failure surfaces as the store being unavailable.
fn store_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Script store query failed");
    CoreError::StoreUnavailable(err.to_string())
}

/// Listing cursor: `None` once the last page has been read.
type Cursor = Option<Option<(Timestamp, ScriptId)>>;

#[async_trait]
impl ScriptStore for PgScriptStore {
    async fn insert(&self, record: &ScriptRecord) -> Result<(), CoreError> {
        ScriptRepo::create(
            &self.pool,
            record.id,
            &record.name,
            &record.content,
            record.created_at,
        )
        .await
        .map_err(store_error)
    }

    async fn find_one(&self, lookup: &ScriptLookup) -> Result<Option<ScriptRecord>, CoreError> {
        let row = match lookup {
            ScriptLookup::Id(id) => ScriptRepo::find_by_id(&self.pool, *id).await,
            ScriptLookup::Name(name) => ScriptRepo::find_first_by_name(&self.pool, name).await,
        }
        .map_err(store_error)?;
        Ok(row.map(ScriptRecord::from))
    }

    /// Pages through the table with keyset pagination; each page is fetched
    /// only when the consumer reaches it.
    fn list_all(&self) -> BoxStream<'static, Result<ScriptSummary, CoreError>> {
        let pool = self.pool.clone();
        let start: Cursor = Some(None);

        stream::try_unfold(start, move |cursor| {
            let pool = pool.clone();
            async move {
                let Some(after) = cursor else {
                    return Ok::<_, CoreError>(None);
                };
                let page = ScriptRepo::list_page(&pool, after, LIST_PAGE_SIZE)
                    .await
                    .map_err(store_error)?;
                let next: Cursor = if (page.len() as i64) < LIST_PAGE_SIZE {
                    None
                } else {
                    page.last().map(|row| Some((row.created_at, row.id)))
                };
                Ok(Some((page, next)))
            }
        })
        .map_ok(|page| {
            stream::iter(
                page.into_iter()
                    .map(|row| Ok::<_, CoreError>(ScriptSummary::from(row))),
            )
        })
        .try_flatten()
        .boxed()
    }

    async fn delete(&self, lookup: &ScriptLookup) -> Result<u64, CoreError> {
        match lookup {
            ScriptLookup::Id(id) => ScriptRepo::delete_by_id(&self.pool, *id).await,
            ScriptLookup::Name(name) => ScriptRepo::delete_by_name(&self.pool, name).await,
        }
        .map_err(store_error)
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }
}
