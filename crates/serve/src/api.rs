//! API routes for the TextProof serve crate

use crate::handlers::{correct, meta, results, tasks};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Build the router over the shared state
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(correct::root))
        .route("/health", get(correct::health_check))
        .route("/api/correct", post(correct::correct_text))
        .route("/api/correct/file", post(correct::correct_file))
        .route("/api/diff", post(correct::get_diff))
        .route("/api/providers", get(meta::get_providers))
        .route("/api/models", get(meta::get_models))
        .route("/api/prompt", get(meta::get_prompt).post(meta::update_prompt))
        .route("/api/config", get(meta::get_config).post(meta::update_config))
        .route("/api/tasks", get(tasks::list_tasks))
        .route("/api/tasks/:task_id", get(tasks::get_task))
        .route("/api/results", get(results::list_results))
        .route("/api/results/manual", post(results::save_manual_result))
        .route(
            "/api/results/:result_id",
            get(results::get_result).delete(results::delete_result),
        )
        .route(
            "/api/results/:result_id/chapters/:chapter_index",
            get(results::get_chapter),
        )
        .route(
            "/api/results/:result_id/download",
            get(results::download_result),
        )
        .with_state(state)
}
