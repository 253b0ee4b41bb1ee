use sqlx::SqlitePool;

use crate::db::Ledger;
use crate::services::MatchEvaluator;

/// Shared application state
///
/// The ledger is the only shared mutable resource; its pool serializes
/// access per statement or transaction, so no lock is held here.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub evaluator: MatchEvaluator,
}

impl AppState {
    pub fn new(pool: SqlitePool, participant_count: u32) -> Self {
        let ledger = Ledger::new(pool);
        let evaluator = MatchEvaluator::new(ledger.clone(), participant_count);
        Self { ledger, evaluator }
    }
}
