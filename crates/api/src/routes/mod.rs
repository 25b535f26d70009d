pub mod health;
pub mod scripts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /scripts            upload (POST), list (GET), delete (DELETE)
/// /scripts/run        run (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/scripts", scripts::router())
}
