use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main router: health check plus the ledger API under `/api`
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Ledger contents
        .route("/movies", get(handlers::list_movies))
        .route("/movies/overwrite", post(handlers::overwrite_movies))
        .route("/movies/next", get(handlers::next_movie))
        // Votes
        .route("/movies/:id/vote", post(handlers::vote))
        .route("/movies/reset", patch(handlers::reset_votes))
        .route("/movies/decrement-downvotes", post(handlers::decrement_downvotes))
        // Matching
        .route("/movies/votes-above/:threshold", get(handlers::votes_above))
        .route("/movies/can-match", get(handlers::can_match))
        .route("/movies/match", get(handlers::match_verdict))
}
