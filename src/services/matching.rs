use crate::{
    db::Ledger,
    error::AppResult,
    models::{MatchCapacity, MatchVerdict, MovieRecord},
};

/// Upvotes a movie must strictly exceed to count as a match
pub const MATCH_UPVOTE_BAR: i64 = 1;

/// Decides whether the ledger holds a match or can still produce one
///
/// Evaluated fresh on every call; nothing is cached between queries.
#[derive(Clone)]
pub struct MatchEvaluator {
    ledger: Ledger,
    participant_count: u32,
}

impl MatchEvaluator {
    pub fn new(ledger: Ledger, participant_count: u32) -> Self {
        Self {
            ledger,
            participant_count,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn participant_count(&self) -> u32 {
        self.participant_count
    }

    /// Lowest-id movie over the bar
    ///
    /// First match wins: a later movie with more upvotes is never preferred.
    pub async fn first_match(&self) -> AppResult<Option<MovieRecord>> {
        let matches = self
            .ledger
            .records_with_upvotes_above(MATCH_UPVOTE_BAR)
            .await?;
        Ok(matches.into_iter().next())
    }

    /// Whether every vote slot has been filled yet
    pub async fn capacity(&self) -> AppResult<MatchCapacity> {
        let (movie_count, votes_sum) = self.ledger.tally().await?;
        let threshold = movie_count * i64::from(self.participant_count);

        Ok(MatchCapacity {
            match_possible: votes_sum < threshold,
            votes_sum,
            threshold,
        })
    }

    pub async fn verdict(&self) -> AppResult<MatchVerdict> {
        if let Some(record) = self.first_match().await? {
            return Ok(MatchVerdict::Matched(record));
        }

        let capacity = self.capacity().await?;
        tracing::debug!(
            votes_sum = capacity.votes_sum,
            threshold = capacity.threshold,
            "No match yet"
        );

        if capacity.match_possible {
            Ok(MatchVerdict::Waiting)
        } else {
            Ok(MatchVerdict::NoMatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::models::{MovieId, NewMovie, VoteDirection};

    async fn evaluator(movies: usize) -> MatchEvaluator {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let ledger = Ledger::new(pool);
        let movies: Vec<NewMovie> = (1..=movies)
            .map(|i| NewMovie::new(format!("guid-{}", i), format!("Movie {}", i)))
            .collect();
        ledger.replace_all(&movies).await.unwrap();
        MatchEvaluator::new(ledger, 2)
    }

    async fn vote(evaluator: &MatchEvaluator, id: i64, direction: VoteDirection) {
        evaluator
            .ledger()
            .cast_vote(MovieId(id), direction)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fresh_ledger_can_match() {
        let evaluator = evaluator(3).await;
        let capacity = evaluator.capacity().await.unwrap();

        assert_eq!(
            capacity,
            MatchCapacity {
                match_possible: true,
                votes_sum: 0,
                threshold: 6,
            }
        );
        assert_eq!(evaluator.verdict().await.unwrap(), MatchVerdict::Waiting);
    }

    #[tokio::test]
    async fn test_two_upvotes_make_a_match() {
        let evaluator = evaluator(3).await;
        vote(&evaluator, 2, VoteDirection::Up).await;
        assert_eq!(evaluator.first_match().await.unwrap(), None);

        vote(&evaluator, 2, VoteDirection::Up).await;
        let verdict = evaluator.verdict().await.unwrap();

        match verdict {
            MatchVerdict::Matched(record) => {
                assert_eq!(record.id, MovieId(2));
                assert_eq!(record.guid, "guid-2");
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_match_wins_over_larger_match() {
        let evaluator = evaluator(3).await;
        for _ in 0..4 {
            vote(&evaluator, 3, VoteDirection::Up).await;
        }
        for _ in 0..2 {
            vote(&evaluator, 1, VoteDirection::Up).await;
        }

        let first = evaluator.first_match().await.unwrap().unwrap();
        assert_eq!(first.id, MovieId(1));
    }

    #[tokio::test]
    async fn test_all_slots_filled_without_match() {
        let evaluator = evaluator(2).await;
        vote(&evaluator, 1, VoteDirection::Up).await;
        vote(&evaluator, 1, VoteDirection::Down).await;
        vote(&evaluator, 2, VoteDirection::Down).await;
        assert_eq!(evaluator.verdict().await.unwrap(), MatchVerdict::Waiting);

        vote(&evaluator, 2, VoteDirection::Down).await;
        let capacity = evaluator.capacity().await.unwrap();

        assert!(!capacity.match_possible);
        assert_eq!(capacity.votes_sum, 4);
        assert_eq!(capacity.threshold, 4);
        assert_eq!(evaluator.verdict().await.unwrap(), MatchVerdict::NoMatch);
    }

    #[tokio::test]
    async fn test_empty_ledger_cannot_match() {
        let evaluator = evaluator(0).await;
        assert_eq!(evaluator.verdict().await.unwrap(), MatchVerdict::NoMatch);
    }

    #[tokio::test]
    async fn test_threshold_scales_with_participants() {
        let base = evaluator(4).await;
        let evaluator = MatchEvaluator::new(base.ledger().clone(), 3);
        assert_eq!(evaluator.capacity().await.unwrap().threshold, 12);
    }
}
