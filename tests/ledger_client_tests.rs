use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_test::assert_err;

use reelmatch_api::{
    api::{create_router, AppState},
    db::create_pool,
    error::{AppError, AppResult},
    models::{
        Genre, GenreKey, MatchCapacity, MovieDetails, MovieId, NewMovie, VoteDirection,
        WatchlistPage,
    },
    services::{CatalogProvider, HttpLedgerClient, LedgerApi},
    session::{store::HAS_UPVOTE, MemoryStore, OutcomeKind, SessionController, SessionStore},
};

/// Catalog that knows every guid but lists no watchlist
struct TitlesOnly;

#[async_trait::async_trait]
impl CatalogProvider for TitlesOnly {
    async fn fetch_watchlist_page(
        &self,
        _genre: &GenreKey,
        _start: usize,
    ) -> AppResult<WatchlistPage> {
        Ok(WatchlistPage {
            size: 0,
            items: vec![],
        })
    }

    async fn fetch_genres(&self) -> AppResult<Vec<Genre>> {
        Ok(vec![])
    }

    async fn fetch_movie_details(&self, guid: &str) -> AppResult<MovieDetails> {
        Ok(MovieDetails::untitled(guid, guid.to_uppercase()))
    }

    fn page_size(&self) -> usize {
        50
    }

    fn name(&self) -> &'static str {
        "titles-only"
    }
}

/// Serves the ledger API on an ephemeral port and returns its root URL
async fn spawn_server() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let pool = create_pool("sqlite::memory:").await.unwrap();
    let app = create_router(AppState::new(pool, 2));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/", addr)
}

fn movies(guids: &[&str]) -> Vec<NewMovie> {
    guids
        .iter()
        .map(|g| NewMovie::new(*g, g.to_uppercase()))
        .collect()
}

fn participant(client: &HttpLedgerClient) -> SessionController<MemoryStore> {
    SessionController::new(
        Arc::new(client.clone()),
        Arc::new(TitlesOnly),
        MemoryStore::new(),
    )
}

#[tokio::test]
async fn test_overwrite_returns_assigned_ids() {
    let client = HttpLedgerClient::new(&spawn_server().await);

    let inserted = client.overwrite(&movies(&["a", "b", "c"])).await.unwrap();

    let ids: Vec<_> = inserted.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![MovieId(1), MovieId(2), MovieId(3)]);
    assert_eq!(inserted[2].guid, "c");

    let listed = client.list_movies().await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].title, "A");
}

#[tokio::test]
async fn test_next_movie_past_the_end_is_none() {
    let client = HttpLedgerClient::new(&spawn_server().await);
    assert_eq!(client.next_movie(None).await.unwrap(), None);

    client.overwrite(&movies(&["a", "b"])).await.unwrap();

    let first = client.next_movie(None).await.unwrap().unwrap();
    assert_eq!(first.id, MovieId(1));
    let second = client.next_movie(Some(first.id)).await.unwrap().unwrap();
    assert_eq!(second.guid, "b");
    assert_eq!(client.next_movie(Some(second.id)).await.unwrap(), None);
}

#[tokio::test]
async fn test_error_statuses_map_to_error_kinds() {
    let client = HttpLedgerClient::new(&spawn_server().await);
    client.overwrite(&movies(&["a"])).await.unwrap();

    let err = assert_err!(client.vote(MovieId(42), VoteDirection::Up).await);
    assert!(matches!(err, AppError::NotFound(_)));

    let err = assert_err!(client.overwrite(&[NewMovie::new(" ", "Blank")]).await);
    assert!(matches!(err, AppError::InvalidInput(_)));

    // Neither failure touched the ledger
    let listed = client.list_movies().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].upvotes, 0);
}

#[tokio::test]
async fn test_capacity_and_decrement_decode() {
    let client = HttpLedgerClient::new(&spawn_server().await);
    client.overwrite(&movies(&["a", "b"])).await.unwrap();

    client.vote(MovieId(1), VoteDirection::Up).await.unwrap();
    client.vote(MovieId(2), VoteDirection::Down).await.unwrap();

    assert_eq!(
        client.can_match().await.unwrap(),
        MatchCapacity {
            match_possible: true,
            votes_sum: 2,
            threshold: 4,
        }
    );
    assert!(client.matching_movies().await.unwrap().is_empty());

    assert!(client.decrement_downvote().await.unwrap());
    assert!(!client.decrement_downvote().await.unwrap());
    assert_eq!(client.can_match().await.unwrap().votes_sum, 1);
}

#[tokio::test]
async fn test_reset_over_http_shifts_ids() {
    let client = HttpLedgerClient::new(&spawn_server().await);
    client.overwrite(&movies(&["a", "b"])).await.unwrap();
    client.vote(MovieId(1), VoteDirection::Up).await.unwrap();

    client.reset_votes().await.unwrap();

    let listed = client.list_movies().await.unwrap();
    let ids: Vec<_> = listed.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![MovieId(3), MovieId(4)]);
    assert!(listed.iter().all(|m| m.upvotes == 0 && m.downvotes == 0));

    let err = assert_err!(client.vote(MovieId(1), VoteDirection::Up).await);
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_session_votes_to_a_match_over_http() {
    let client = HttpLedgerClient::new(&spawn_server().await);
    client.overwrite(&movies(&["a", "b"])).await.unwrap();

    let mut alice = participant(&client);
    let mut bob = participant(&client);

    alice.initiate_or_resume_voting().await.unwrap();
    assert_eq!(alice.current_movie().unwrap().id, MovieId(1));
    alice.vote(VoteDirection::Down).await.unwrap();
    assert_eq!(alice.current_movie().unwrap().id, MovieId(2));
    alice.vote(VoteDirection::Up).await.unwrap();

    // Alice ran out of movies with one slot per movie still open
    assert_eq!(alice.end_of_votes().unwrap().kind, OutcomeKind::Waiting);
    assert_eq!(alice.store().get(HAS_UPVOTE).as_deref(), Some("true"));

    bob.initiate_or_resume_voting().await.unwrap();
    bob.vote(VoteDirection::Down).await.unwrap();
    bob.vote(VoteDirection::Up).await.unwrap();

    let end = bob.end_of_votes().unwrap();
    assert_eq!(end.kind, OutcomeKind::Match);
    assert_eq!(end.title.as_deref(), Some("B"));

    alice.initiate_or_resume_voting().await.unwrap();
    assert_eq!(alice.end_of_votes().unwrap().kind, OutcomeKind::Match);
}

#[tokio::test]
async fn test_session_exhausts_ledger_without_upvotes_over_http() {
    let client = HttpLedgerClient::new(&spawn_server().await);
    client.overwrite(&movies(&["a", "b"])).await.unwrap();

    let mut alice = participant(&client);
    alice.initiate_or_resume_voting().await.unwrap();
    alice.vote(VoteDirection::Down).await.unwrap();
    alice.vote(VoteDirection::Down).await.unwrap();

    assert_eq!(alice.end_of_votes().unwrap().kind, OutcomeKind::NoUpvotes);
    assert!(alice.current_movie().is_none());
}
