/// Catalog data provider abstraction
///
/// The vote ledger only ever sees `{guid, title}` pairs; everything else about
/// a movie (artwork, ratings, genres, the watchlist itself) comes from an
/// external catalog behind this trait.
use crate::{
    error::AppResult,
    models::{Genre, GenreKey, MovieDetails, WatchlistPage},
};

pub mod plex;

pub use plex::PlexProvider;

/// Trait for external media catalogs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch one page of the watchlist starting at item offset `start`
    ///
    /// `WatchlistPage::size` is the number of items the catalog listed on the
    /// page; a page smaller than `page_size()` is the last one.
    async fn fetch_watchlist_page(&self, genre: &GenreKey, start: usize)
        -> AppResult<WatchlistPage>;

    /// Genres available for filtering the watchlist
    async fn fetch_genres(&self) -> AppResult<Vec<Genre>>;

    /// Full metadata for one movie
    async fn fetch_movie_details(&self, guid: &str) -> AppResult<MovieDetails>;

    /// Fixed number of items per watchlist page
    fn page_size(&self) -> usize;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
