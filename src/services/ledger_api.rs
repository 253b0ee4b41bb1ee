use crate::{
    db::Ledger,
    error::AppResult,
    models::{InsertedMovie, MatchCapacity, MovieId, MovieRecord, NewMovie, VoteDirection},
    services::matching::{MatchEvaluator, MATCH_UPVOTE_BAR},
};

/// What a participant's client can ask of the shared ledger
///
/// Mirrors the HTTP surface one method per route, so session logic runs the
/// same against a remote server or an in-process ledger.
#[async_trait::async_trait]
pub trait LedgerApi: Send + Sync {
    async fn list_movies(&self) -> AppResult<Vec<MovieRecord>>;

    async fn overwrite(&self, movies: &[NewMovie]) -> AppResult<Vec<InsertedMovie>>;

    /// `Ok(None)` once there is nothing after `current`
    async fn next_movie(&self, current: Option<MovieId>) -> AppResult<Option<MovieRecord>>;

    async fn reset_votes(&self) -> AppResult<()>;

    async fn vote(&self, id: MovieId, direction: VoteDirection) -> AppResult<()>;

    /// Movies over the match bar, lowest id first
    async fn matching_movies(&self) -> AppResult<Vec<MovieRecord>>;

    async fn can_match(&self) -> AppResult<MatchCapacity>;

    async fn decrement_downvote(&self) -> AppResult<bool>;
}

/// Ledger access without going through HTTP
#[derive(Clone)]
pub struct InProcessLedger {
    evaluator: MatchEvaluator,
}

impl InProcessLedger {
    pub fn new(ledger: Ledger, participant_count: u32) -> Self {
        Self {
            evaluator: MatchEvaluator::new(ledger, participant_count),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        self.evaluator.ledger()
    }
}

#[async_trait::async_trait]
impl LedgerApi for InProcessLedger {
    async fn list_movies(&self) -> AppResult<Vec<MovieRecord>> {
        self.ledger().list_all().await
    }

    async fn overwrite(&self, movies: &[NewMovie]) -> AppResult<Vec<InsertedMovie>> {
        let records = self.ledger().replace_all(movies).await?;
        Ok(records.iter().map(InsertedMovie::from).collect())
    }

    async fn next_movie(&self, current: Option<MovieId>) -> AppResult<Option<MovieRecord>> {
        self.ledger().next_after(current).await
    }

    async fn reset_votes(&self) -> AppResult<()> {
        self.ledger().reset_all_votes_with_id_reindex().await?;
        Ok(())
    }

    async fn vote(&self, id: MovieId, direction: VoteDirection) -> AppResult<()> {
        self.ledger().cast_vote(id, direction).await
    }

    async fn matching_movies(&self) -> AppResult<Vec<MovieRecord>> {
        self.ledger()
            .records_with_upvotes_above(MATCH_UPVOTE_BAR)
            .await
    }

    async fn can_match(&self) -> AppResult<MatchCapacity> {
        self.evaluator.capacity().await
    }

    async fn decrement_downvote(&self) -> AppResult<bool> {
        self.ledger().decrement_one_downvote().await
    }
}
