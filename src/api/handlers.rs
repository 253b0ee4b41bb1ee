use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{InsertedMovie, MatchCapacity, MatchVerdict, MovieId, MovieRecord, NewMovie, VoteDirection},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Serialize, Deserialize)]
pub struct OverwriteRequest {
    pub movies: Vec<NewMovie>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OverwriteResponse {
    pub message: String,
    pub watchlist: Vec<InsertedMovie>,
}

#[derive(Debug, Deserialize)]
pub struct NextMovieQuery {
    #[serde(rename = "currentMovieId")]
    pub current_movie_id: Option<String>,
}

impl NextMovieQuery {
    /// Empty and zero cursors both mean "start from the beginning"
    fn cursor(&self) -> AppResult<Option<MovieId>> {
        let raw = match self.current_movie_id.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(raw) => raw,
        };

        let id = raw.parse::<i64>().map_err(|_| {
            AppError::InvalidInput(format!("currentMovieId must be an integer, got '{}'", raw))
        })?;

        Ok((id != 0).then_some(MovieId(id)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default)]
    pub movie_id: Option<MovieId>,
    pub vote_type: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub shift: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VotesAboveResponse {
    pub data: Vec<MovieRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecrementResponse {
    pub message: String,
    pub corrected: bool,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// All ledger records in insertion order
pub async fn list_movies(State(state): State<AppState>) -> AppResult<Json<Vec<MovieRecord>>> {
    let movies = state.ledger.list_all().await?;
    Ok(Json(movies))
}

/// Replace the whole ledger with a new watchlist
pub async fn overwrite_movies(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<OverwriteRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<OverwriteResponse>)> {
    let Json(request) = payload.map_err(|e| {
        AppError::InvalidInput(format!(
            "Invalid request. Expecting an array of movies. {}",
            e.body_text()
        ))
    })?;

    tracing::info!(
        request_id = %request_id,
        movie_count = request.movies.len(),
        "Overwriting watchlist"
    );

    let records = state.ledger.replace_all(&request.movies).await?;

    Ok((
        StatusCode::CREATED,
        Json(OverwriteResponse {
            message: "Movies inserted successfully.".to_string(),
            watchlist: records.iter().map(InsertedMovie::from).collect(),
        }),
    ))
}

/// The movie after `currentMovieId`, or 204 once the sequence is exhausted
pub async fn next_movie(
    State(state): State<AppState>,
    Query(query): Query<NextMovieQuery>,
) -> AppResult<Response> {
    let cursor = query.cursor()?;

    match state.ledger.next_after(cursor).await? {
        Some(movie) => Ok(Json(movie).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Zero every counter and shift ids past any a client may still hold
pub async fn reset_votes(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<ResetResponse>> {
    let shift = state.ledger.reset_all_votes_with_id_reindex().await?;

    tracing::info!(request_id = %request_id, shift, "Votes reset");

    Ok(Json(ResetResponse { shift }))
}

/// Record one vote; the path id is authoritative
pub async fn vote(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<i64>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let movie_id = MovieId(id);

    if let Some(body_id) = request.movie_id {
        if body_id != movie_id {
            return Err(AppError::InvalidInput(format!(
                "movieId {} does not match path id {}",
                body_id, movie_id
            )));
        }
    }

    let direction = VoteDirection::try_from(request.vote_type)?;
    state.ledger.cast_vote(movie_id, direction).await?;

    tracing::info!(
        request_id = %request_id,
        movie_id = %movie_id,
        vote_type = request.vote_type,
        "Vote recorded"
    );

    Ok(Json(MessageResponse {
        message: "Vote done successfully.".to_string(),
    }))
}

/// Movies whose upvotes strictly exceed `threshold`, lowest id first
pub async fn votes_above(
    State(state): State<AppState>,
    Path(threshold): Path<i64>,
) -> AppResult<Json<VotesAboveResponse>> {
    let data = state.ledger.records_with_upvotes_above(threshold).await?;
    Ok(Json(VotesAboveResponse { data }))
}

/// Whether unfilled vote slots remain, with the numbers behind it
pub async fn can_match(State(state): State<AppState>) -> AppResult<Json<MatchCapacity>> {
    let capacity = state.evaluator.capacity().await?;
    Ok(Json(capacity))
}

/// Matched, still waiting, or no match possible
pub async fn match_verdict(State(state): State<AppState>) -> AppResult<Json<MatchVerdict>> {
    let verdict = state.evaluator.verdict().await?;
    Ok(Json(verdict))
}

/// Undo one downvote for a participant restarting their own round
pub async fn decrement_downvotes(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<DecrementResponse>> {
    let corrected = state.ledger.decrement_one_downvote().await?;

    tracing::info!(request_id = %request_id, corrected, "Downvote decremented");

    Ok(Json(DecrementResponse {
        message: "Downvotes decremented".to_string(),
        corrected,
    }))
}
