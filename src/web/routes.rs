use axum::{routing::get, Router};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// Both routes are anonymous and accept GET or POST
pub fn prompt_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/sqlprompt",
            get(handlers::api::sql_prompt).post(handlers::api::sql_prompt),
        )
        .route(
            "/langprompt",
            get(handlers::api::lang_prompt).post(handlers::api::lang_prompt),
        )
}
