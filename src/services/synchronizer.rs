use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::{
    error::{AppError, AppResult},
    models::{DurationRange, GenreKey, InsertedMovie, NewMovie, WatchlistItem},
    services::{ledger_api::LedgerApi, providers::CatalogProvider},
};

/// Upper bound on pages fetched in one synchronization
const MAX_PAGES: usize = 500;

/// Filters applied while pulling the watchlist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRequest {
    pub genre: GenreKey,
    pub duration: DurationRange,
    /// Shuffle the accumulated list before writing it
    pub shuffle: bool,
}

/// Replaces the ledger's movie set with a freshly paginated watchlist
#[derive(Clone)]
pub struct WatchlistSynchronizer {
    provider: Arc<dyn CatalogProvider>,
    ledger: Arc<dyn LedgerApi>,
}

impl WatchlistSynchronizer {
    pub fn new(provider: Arc<dyn CatalogProvider>, ledger: Arc<dyn LedgerApi>) -> Self {
        Self { provider, ledger }
    }

    /// Accumulates every page matching `request`, in page order
    ///
    /// A page that lists fewer items than the page size (including zero) is
    /// the last one.
    pub async fn fetch_watchlist(&self, request: &SyncRequest) -> AppResult<Vec<WatchlistItem>> {
        let page_size = self.provider.page_size();
        let mut items = Vec::new();
        let mut start = 0;

        for _ in 0..MAX_PAGES {
            let page = self
                .provider
                .fetch_watchlist_page(&request.genre, start)
                .await?;

            tracing::debug!(
                provider = self.provider.name(),
                start,
                size = page.size,
                "Fetched watchlist page"
            );

            let page_len = page.size;
            items.extend(
                page.items
                    .into_iter()
                    .filter(|item| request.duration.contains(item.duration_secs)),
            );

            if page_len == 0 || page_len < page_size {
                return Ok(items);
            }
            start += page_len;
        }

        Err(AppError::ExternalApi(format!(
            "{} watchlist did not end after {} pages",
            self.provider.name(),
            MAX_PAGES
        )))
    }

    /// Pulls the watchlist and overwrites the ledger with it
    ///
    /// Nothing is written unless every page was fetched.
    pub async fn synchronize(&self, request: &SyncRequest) -> AppResult<Vec<InsertedMovie>> {
        let items = self.fetch_watchlist(request).await?;
        let mut movies: Vec<NewMovie> = items.into_iter().map(NewMovie::from).collect();

        if request.shuffle {
            movies.shuffle(&mut rand::thread_rng());
        }

        let inserted = self.ledger.overwrite(&movies).await?;

        tracing::info!(
            genre = %request.genre,
            inserted = inserted.len(),
            "Watchlist synchronized"
        );

        Ok(inserted)
    }
}
