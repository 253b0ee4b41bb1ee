use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::AppError;

pub mod catalog;

pub use catalog::{
    DurationRange, Genre, GenreKey, MovieDetails, MovieImages, Rating, RatingSource,
    WatchlistItem, WatchlistPage,
};

/// Locally assigned, insertion-ordered identifier of a ledger record
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct MovieId(pub i64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A movie in the vote ledger with its counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MovieRecord {
    pub id: MovieId,
    pub guid: String,
    pub title: String,
    pub upvotes: i64,
    pub downvotes: i64,
}

impl MovieRecord {
    pub fn vote_total(&self) -> i64 {
        self.upvotes + self.downvotes
    }
}

/// A watchlist entry to be inserted into the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovie {
    pub guid: String,
    pub title: String,
}

impl NewMovie {
    pub fn new(guid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            title: title.into(),
        }
    }
}

impl From<WatchlistItem> for NewMovie {
    fn from(item: WatchlistItem) -> Self {
        Self {
            guid: item.guid,
            title: item.title,
        }
    }
}

/// Id/guid pair returned after a watchlist overwrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertedMovie {
    pub id: MovieId,
    pub guid: String,
}

impl From<&MovieRecord> for InsertedMovie {
    fn from(record: &MovieRecord) -> Self {
        Self {
            id: record.id,
            guid: record.guid.clone(),
        }
    }
}

/// Direction of a single vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Wire value used by the vote route (`1` or `-1`)
    pub fn vote_type(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            _ => Err(AppError::InvalidInput(
                "Invalid vote type. Must be 1 (upvote) or -1 (downvote).".to_string(),
            )),
        }
    }
}

/// Inputs of the "can a match still appear" check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCapacity {
    pub match_possible: bool,
    pub votes_sum: i64,
    pub threshold: i64,
}

/// Aggregate verdict over the whole ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "movie", rename_all = "kebab-case")]
pub enum MatchVerdict {
    Matched(MovieRecord),
    Waiting,
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_direction_from_wire() {
        assert_eq!(VoteDirection::try_from(1).unwrap(), VoteDirection::Up);
        assert_eq!(VoteDirection::try_from(-1).unwrap(), VoteDirection::Down);
    }

    #[test]
    fn test_vote_direction_rejects_other_values() {
        for value in [0, 2, -2, 42] {
            let err = VoteDirection::try_from(value).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_movie_record_serializes_flat_id() {
        let record = MovieRecord {
            id: MovieId(3),
            guid: "5d776b59ad5437001f79c6f8".to_string(),
            title: "Arrival".to_string(),
            upvotes: 1,
            downvotes: 0,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["guid"], "5d776b59ad5437001f79c6f8");
        assert_eq!(record.vote_total(), 1);
    }

    #[test]
    fn test_match_capacity_uses_camel_case() {
        let capacity = MatchCapacity {
            match_possible: true,
            votes_sum: 0,
            threshold: 6,
        };
        let json = serde_json::to_value(capacity).unwrap();
        assert_eq!(json["matchPossible"], true);
        assert_eq!(json["votesSum"], 0);
        assert_eq!(json["threshold"], 6);
    }

    #[test]
    fn test_match_verdict_wire_shape() {
        let json = serde_json::to_value(MatchVerdict::NoMatch).unwrap();
        assert_eq!(json["status"], "no-match");

        let json = serde_json::to_value(MatchVerdict::Waiting).unwrap();
        assert_eq!(json["status"], "waiting");
    }
}
