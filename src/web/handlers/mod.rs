use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::AppContext;

pub mod tasks;

const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/upload", post(tasks::upload))
        .route("/status", get(tasks::status))
        .route("/result/:task_id", get(tasks::result))
        .route("/history", get(tasks::history))
        .route("/audio/:task_id", get(tasks::audio))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(ctx)
}
