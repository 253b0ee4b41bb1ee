use std::sync::Arc;

use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::{DurationRange, Genre, GenreKey, MovieDetails, MovieId, MovieRecord, VoteDirection},
    services::{CatalogProvider, LedgerApi, SyncRequest, WatchlistSynchronizer},
};

use super::{
    outcome::EndOfVotes,
    store::{SessionStore, CURRENT_MOVIE_ID, HAS_COMPLETED_VOTING, HAS_UPVOTE},
};

/// Where the participant is in a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    LoadingGenres,
    /// Genres and ledger loaded, no activity started
    Ready,
    Voting,
    Randomizing,
    Ended(EndOfVotes),
}

/// The movie on screen, with the ledger id it is voted under
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentMovie {
    pub id: MovieId,
    pub details: MovieDetails,
}

/// One participant's view of a shared voting session
///
/// Operations run one at a time; persisted keys go through the injected
/// store so a session resumes across restarts of the client.
pub struct SessionController<S: SessionStore> {
    ledger: Arc<dyn LedgerApi>,
    provider: Arc<dyn CatalogProvider>,
    store: S,
    phase: SessionPhase,
    genres: Vec<Genre>,
    selected_genre: GenreKey,
    selected_duration: DurationRange,
    watchlist: Vec<MovieRecord>,
    current_movie: Option<CurrentMovie>,
    random_pool: Vec<MovieRecord>,
}

impl<S: SessionStore> SessionController<S> {
    pub fn new(ledger: Arc<dyn LedgerApi>, provider: Arc<dyn CatalogProvider>, store: S) -> Self {
        Self {
            ledger,
            provider,
            store,
            phase: SessionPhase::Idle,
            genres: Vec::new(),
            selected_genre: GenreKey::Any,
            selected_duration: DurationRange::ANY,
            watchlist: Vec::new(),
            current_movie: None,
            random_pool: Vec::new(),
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn end_of_votes(&self) -> Option<&EndOfVotes> {
        match &self.phase {
            SessionPhase::Ended(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn current_movie(&self) -> Option<&CurrentMovie> {
        self.current_movie.as_ref()
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn watchlist(&self) -> &[MovieRecord] {
        &self.watchlist
    }

    pub fn ledger(&self) -> &dyn LedgerApi {
        self.ledger.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn select_genre(&mut self, genre: GenreKey) {
        self.selected_genre = genre;
    }

    pub fn select_duration(&mut self, duration: DurationRange) {
        self.selected_duration = duration;
    }

    /// Loads the genre list, prefixed with "Any Genre", and the current ledger
    pub async fn init(&mut self) -> AppResult<()> {
        self.phase = SessionPhase::LoadingGenres;

        let genres = self.provider.fetch_genres().await?;
        self.genres = std::iter::once(Genre::any()).chain(genres).collect();
        self.selected_genre = GenreKey::Any;
        self.selected_duration = DurationRange::ANY;
        self.watchlist = self.ledger.list_movies().await?;

        self.phase = SessionPhase::Ready;
        Ok(())
    }

    /// Replaces the shared ledger with the watchlist under the current filters
    pub async fn load_watchlist(&mut self, shuffle: bool) -> AppResult<usize> {
        let request = SyncRequest {
            genre: self.selected_genre.clone(),
            duration: self.selected_duration,
            shuffle,
        };

        let synchronizer = WatchlistSynchronizer::new(self.provider.clone(), self.ledger.clone());
        let inserted = synchronizer.synchronize(&request).await?;
        self.watchlist = self.ledger.list_movies().await?;

        Ok(inserted.len())
    }

    /// Zeroes every vote without touching this participant's keys
    pub async fn reset_votes(&mut self) -> AppResult<()> {
        self.ledger.reset_votes().await?;
        self.watchlist = self.ledger.list_movies().await?;
        Ok(())
    }

    /// Enters voting, picking up where the persisted cursor left off
    pub async fn initiate_or_resume_voting(&mut self) -> AppResult<()> {
        self.phase = SessionPhase::Voting;

        if let Some(matched) = self.first_match().await? {
            return self.show_match(&matched).await;
        }

        self.watchlist = self.ledger.list_movies().await?;

        let cursor = self.stored_cursor();
        let resumed = cursor.and_then(|id| self.watchlist.iter().find(|m| m.id == id).cloned());

        match resumed {
            Some(_) if self.has_completed_voting() => self.show_end_of_votes().await,
            Some(movie) => self.show_movie(&movie).await,
            None => {
                // A cursor into a replaced ledger invalidates the whole session
                let to_clear: &[&str] = if cursor.is_some() {
                    &[CURRENT_MOVIE_ID, HAS_COMPLETED_VOTING, HAS_UPVOTE]
                } else {
                    &[CURRENT_MOVIE_ID, HAS_COMPLETED_VOTING]
                };
                tracing::debug!(stale_cursor = cursor.is_some(), "Starting from the first movie");
                for key in to_clear {
                    self.store.remove(key)?;
                }

                let first = self.watchlist.first().cloned().ok_or_else(|| {
                    AppError::InvalidInput(
                        "No movies available. Load a watchlist first.".to_string(),
                    )
                })?;
                self.show_movie(&first).await?;
                self.store.set(CURRENT_MOVIE_ID, &first.id.to_string())
            }
        }
    }

    /// Records a vote on the movie on screen, then moves on
    pub async fn vote(&mut self, direction: VoteDirection) -> AppResult<()> {
        let movie_id = match (&self.phase, &self.current_movie) {
            (SessionPhase::Voting, Some(movie)) => movie.id,
            _ => {
                return Err(AppError::InvalidInput(
                    "No movie is currently up for a vote".to_string(),
                ))
            }
        };

        self.ledger.vote(movie_id, direction).await?;
        if direction == VoteDirection::Up {
            self.store.set(HAS_UPVOTE, "true")?;
        }
        tracing::debug!(movie_id = %movie_id, vote_type = direction.vote_type(), "Voted");

        self.get_next_movie().await
    }

    /// Shows a match if one appeared, otherwise the movie after the cursor
    pub async fn get_next_movie(&mut self) -> AppResult<()> {
        if let Some(matched) = self.first_match().await? {
            return self.show_match(&matched).await;
        }

        self.watchlist = self.ledger.list_movies().await?;
        let cursor = self
            .stored_cursor()
            .filter(|id| self.watchlist.iter().any(|m| m.id == *id));

        match self.ledger.next_movie(cursor).await? {
            Some(movie) => {
                self.show_movie(&movie).await?;
                self.store.set(CURRENT_MOVIE_ID, &movie.id.to_string())
            }
            None => {
                self.store.set(HAS_COMPLETED_VOTING, "1")?;
                self.current_movie = None;
                self.show_end_of_votes().await
            }
        }
    }

    /// Starts a new round for everyone: all votes are zeroed
    pub async fn restart_voting(&mut self) -> AppResult<()> {
        for key in [CURRENT_MOVIE_ID, HAS_COMPLETED_VOTING, HAS_UPVOTE] {
            self.store.remove(key)?;
        }
        self.reset_votes().await?;
        self.initiate_or_resume_voting().await
    }

    /// Starts over for this participant only
    ///
    /// Best effort: one downvote is taken back from the lowest-id movie that
    /// has any, which may not be one this participant cast.
    pub async fn restart_user_voting(&mut self) -> AppResult<()> {
        for key in [CURRENT_MOVIE_ID, HAS_COMPLETED_VOTING] {
            self.store.remove(key)?;
        }

        let corrected = self.ledger.decrement_downvote().await?;
        tracing::debug!(corrected, "Restarting participant voting");

        self.initiate_or_resume_voting().await
    }

    /// Browses the ledger's movies at random, without voting
    pub async fn start_randomizing(&mut self) -> AppResult<&CurrentMovie> {
        self.watchlist = self.ledger.list_movies().await?;
        self.random_pool = self.watchlist.clone();
        self.next_random_movie().await
    }

    /// Draws without replacement, refilling from the watchlist once exhausted
    pub async fn next_random_movie(&mut self) -> AppResult<&CurrentMovie> {
        self.phase = SessionPhase::Randomizing;

        if self.random_pool.is_empty() {
            self.random_pool = self.watchlist.clone();
        }
        if self.random_pool.is_empty() {
            return Err(AppError::InvalidInput(
                "No movies available to select.".to_string(),
            ));
        }

        let index = rand::thread_rng().gen_range(0..self.random_pool.len());
        let movie = self.random_pool.swap_remove(index);

        let details = self.provider.fetch_movie_details(&movie.guid).await?;
        Ok(&*self.current_movie.insert(CurrentMovie {
            id: movie.id,
            details,
        }))
    }

    /// Movies left in the current random draw
    pub fn random_pool_len(&self) -> usize {
        self.random_pool.len()
    }

    async fn first_match(&self) -> AppResult<Option<MovieRecord>> {
        Ok(self.ledger.matching_movies().await?.into_iter().next())
    }

    async fn show_movie(&mut self, movie: &MovieRecord) -> AppResult<()> {
        let details = self.provider.fetch_movie_details(&movie.guid).await?;
        self.current_movie = Some(CurrentMovie {
            id: movie.id,
            details,
        });
        self.phase = SessionPhase::Voting;
        Ok(())
    }

    async fn show_match(&mut self, movie: &MovieRecord) -> AppResult<()> {
        let details = self.provider.fetch_movie_details(&movie.guid).await?;
        tracing::info!(movie_id = %movie.id, title = %details.title, "Match found");

        self.current_movie = None;
        self.phase = SessionPhase::Ended(EndOfVotes::matched(&details));
        Ok(())
    }

    /// Terminal state once this participant has nothing left to vote on
    async fn show_end_of_votes(&mut self) -> AppResult<()> {
        let outcome = if !self.has_upvote() {
            EndOfVotes::no_upvotes()
        } else if self.ledger.can_match().await?.match_possible {
            EndOfVotes::waiting()
        } else {
            EndOfVotes::no_match()
        };

        self.current_movie = None;
        self.phase = SessionPhase::Ended(outcome);
        Ok(())
    }

    fn stored_cursor(&self) -> Option<MovieId> {
        self.store
            .get(CURRENT_MOVIE_ID)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(MovieId)
    }

    fn has_completed_voting(&self) -> bool {
        self.store
            .get(HAS_COMPLETED_VOTING)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .is_some_and(|flag| flag != 0)
    }

    fn has_upvote(&self) -> bool {
        self.store
            .get(HAS_UPVOTE)
            .is_some_and(|raw| !raw.is_empty())
    }
}
