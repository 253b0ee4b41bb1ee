use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, MovieRecord, NewMovie, VoteDirection},
};

const SELECT_MOVIES: &str = "SELECT id, guid, title, upvotes, downvotes FROM movies";

/// Durable per-movie vote counters
///
/// Every mutation is a single statement or a single transaction, so
/// concurrent readers never observe a half-replaced or half-reset ledger.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Discards every record and inserts `movies` in order with fresh ids
    ///
    /// Nothing is written unless every insert succeeds.
    pub async fn replace_all(&self, movies: &[NewMovie]) -> AppResult<Vec<MovieRecord>> {
        if let Some(position) = movies.iter().position(|m| m.guid.trim().is_empty()) {
            return Err(AppError::InvalidInput(format!(
                "Movie at position {} has an empty guid",
                position
            )));
        }

        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM movies")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut records = Vec::with_capacity(movies.len());
        for movie in movies {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO movies (guid, title, upvotes, downvotes)
                 VALUES (?, ?, 0, 0)
                 RETURNING id",
            )
            .bind(&movie.guid)
            .bind(&movie.title)
            .fetch_one(&mut *tx)
            .await?;

            records.push(MovieRecord {
                id: MovieId(id),
                guid: movie.guid.clone(),
                title: movie.title.clone(),
                upvotes: 0,
                downvotes: 0,
            });
        }

        tx.commit().await?;

        tracing::info!(removed, inserted = records.len(), "Ledger replaced");

        Ok(records)
    }

    /// All records in insertion order
    pub async fn list_all(&self) -> AppResult<Vec<MovieRecord>> {
        let records = sqlx::query_as::<_, MovieRecord>(&format!("{SELECT_MOVIES} ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    pub async fn get(&self, id: MovieId) -> AppResult<Option<MovieRecord>> {
        let record = sqlx::query_as::<_, MovieRecord>(&format!("{SELECT_MOVIES} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Record with the smallest id strictly greater than `current`
    ///
    /// `None` for `current` starts from the beginning; `Ok(None)` means the
    /// sequence is exhausted.
    pub async fn next_after(&self, current: Option<MovieId>) -> AppResult<Option<MovieRecord>> {
        let record = match current {
            Some(id) => {
                sqlx::query_as::<_, MovieRecord>(&format!(
                    "{SELECT_MOVIES} WHERE id > ? ORDER BY id ASC LIMIT 1"
                ))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, MovieRecord>(&format!(
                    "{SELECT_MOVIES} ORDER BY id ASC LIMIT 1"
                ))
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(record)
    }

    /// Adds one vote to a movie's counter
    pub async fn cast_vote(&self, id: MovieId, direction: VoteDirection) -> AppResult<()> {
        let sql = match direction {
            VoteDirection::Up => "UPDATE movies SET upvotes = upvotes + 1 WHERE id = ?",
            VoteDirection::Down => "UPDATE movies SET downvotes = downvotes + 1 WHERE id = ?",
        };

        let result = sqlx::query(sql).bind(id.0).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Movie {} not found", id)));
        }

        tracing::debug!(movie_id = %id, direction = ?direction, "Vote recorded");

        Ok(())
    }

    /// Records whose upvotes strictly exceed `threshold`, lowest id first
    pub async fn records_with_upvotes_above(&self, threshold: i64) -> AppResult<Vec<MovieRecord>> {
        let records = sqlx::query_as::<_, MovieRecord>(&format!(
            "{SELECT_MOVIES} WHERE upvotes > ? ORDER BY id ASC"
        ))
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of every upvote and downvote in the ledger
    pub async fn vote_total(&self) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(upvotes + downvotes), 0) FROM movies")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Record count and vote total, read together
    pub async fn tally(&self) -> AppResult<(i64, i64)> {
        let tally: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(upvotes + downvotes), 0) FROM movies",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(tally)
    }

    /// Removes one downvote from the lowest-id record that has any
    ///
    /// Returns whether a record was corrected.
    pub async fn decrement_one_downvote(&self) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE movies SET downvotes = downvotes - 1
             WHERE id = (SELECT id FROM movies WHERE downvotes > 0 ORDER BY id ASC LIMIT 1)",
        )
        .execute(&self.pool)
        .await?;

        let corrected = result.rows_affected() > 0;
        tracing::info!(corrected, "Downvote correction applied");

        Ok(corrected)
    }

    /// Zeroes every counter and shifts every id up by the record count
    ///
    /// Ids held by clients from before the reset never resolve to a record
    /// afterwards. Returns the shift applied.
    pub async fn reset_all_votes_with_id_reindex(&self) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;

        let shift: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&mut *tx)
            .await?;

        // Park ids on the negative side first so no intermediate row collides.
        sqlx::query("UPDATE movies SET id = -(id + ?), upvotes = 0, downvotes = 0")
            .bind(shift)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE movies SET id = -id")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(shift, "Votes reset and ids reindexed");

        Ok(shift)
    }
}
