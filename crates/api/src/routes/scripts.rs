//! Route definitions for script endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::scripts;
use crate::state::AppState;

/// Routes mounted at `/scripts`.
///
/// ```text
/// POST   /        -> upload_script
/// GET    /        -> list_scripts
/// DELETE /        -> delete_script   (?id=...&name=...)
/// POST   /run     -> run_script
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(scripts::list_scripts)
                .post(scripts::upload_script)
                .delete(scripts::delete_script),
        )
        .route("/run", post(scripts::run_script))
}
