pub mod ledger_api;
pub mod ledger_client;
pub mod matching;
pub mod providers;
pub mod synchronizer;

pub use ledger_api::{InProcessLedger, LedgerApi};
pub use ledger_client::HttpLedgerClient;
pub use matching::{MatchEvaluator, MATCH_UPVOTE_BAR};
pub use providers::{CatalogProvider, PlexProvider};
pub use synchronizer::{SyncRequest, WatchlistSynchronizer};
