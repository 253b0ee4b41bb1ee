use reqwest::{Client as HttpClient, Response, StatusCode};
use serde_json::json;

use crate::{
    api::handlers::{
        DecrementResponse, OverwriteRequest, OverwriteResponse, VoteRequest, VotesAboveResponse,
    },
    error::{AppError, AppResult},
    models::{InsertedMovie, MatchCapacity, MovieId, MovieRecord, NewMovie, VoteDirection},
    services::{ledger_api::LedgerApi, matching::MATCH_UPVOTE_BAR},
};

/// Talks to a running ledger server over HTTP
#[derive(Clone)]
pub struct HttpLedgerClient {
    http_client: HttpClient,
    movies_url: String,
}

impl HttpLedgerClient {
    /// `server_url` is the server root, e.g. `http://localhost:3000`
    pub fn new(server_url: &str) -> Self {
        Self {
            http_client: HttpClient::new(),
            movies_url: format!("{}/api/movies", server_url.trim_end_matches('/')),
        }
    }

    /// Turns non-success statuses into the matching error kind
    async fn check(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or(body);

        tracing::error!(status = %status, error = %message, "Ledger request failed");

        Err(match status {
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::BAD_REQUEST => AppError::InvalidInput(message),
            _ => AppError::ExternalApi(format!("Ledger returned status {}: {}", status, message)),
        })
    }
}

#[async_trait::async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn list_movies(&self) -> AppResult<Vec<MovieRecord>> {
        let response = self.http_client.get(&self.movies_url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn overwrite(&self, movies: &[NewMovie]) -> AppResult<Vec<InsertedMovie>> {
        let request = OverwriteRequest {
            movies: movies.to_vec(),
        };
        let response = self
            .http_client
            .post(format!("{}/overwrite", self.movies_url))
            .json(&request)
            .send()
            .await?;

        let body: OverwriteResponse = Self::check(response).await?.json().await?;
        Ok(body.watchlist)
    }

    async fn next_movie(&self, current: Option<MovieId>) -> AppResult<Option<MovieRecord>> {
        let mut request = self.http_client.get(format!("{}/next", self.movies_url));
        if let Some(id) = current {
            request = request.query(&[("currentMovieId", id.0)]);
        }

        let response = Self::check(request.send().await?).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }

    async fn reset_votes(&self) -> AppResult<()> {
        let response = self
            .http_client
            .patch(format!("{}/reset", self.movies_url))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn vote(&self, id: MovieId, direction: VoteDirection) -> AppResult<()> {
        let request = VoteRequest {
            movie_id: Some(id),
            vote_type: direction.vote_type(),
        };
        let response = self
            .http_client
            .post(format!("{}/{}/vote", self.movies_url, id))
            .json(&request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn matching_movies(&self) -> AppResult<Vec<MovieRecord>> {
        let response = self
            .http_client
            .get(format!("{}/votes-above/{}", self.movies_url, MATCH_UPVOTE_BAR))
            .send()
            .await?;
        let body: VotesAboveResponse = Self::check(response).await?.json().await?;
        Ok(body.data)
    }

    async fn can_match(&self) -> AppResult<MatchCapacity> {
        let response = self
            .http_client
            .get(format!("{}/can-match", self.movies_url))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn decrement_downvote(&self) -> AppResult<bool> {
        let response = self
            .http_client
            .post(format!("{}/decrement-downvotes", self.movies_url))
            .json(&json!({}))
            .send()
            .await?;
        let body: DecrementResponse = Self::check(response).await?.json().await?;
        Ok(body.corrected)
    }
}
