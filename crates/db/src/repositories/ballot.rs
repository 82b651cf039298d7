//! Ballot store.
//!
//! The store's insert is the only arbiter of the one-ballot-per-voter rule:
//! the `(cycle_id, voter_id)` unique index rejects a second ballot even when
//! two cast requests both passed the "not already voted" pre-check.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use tracing::debug;
use voting_common::{AppError, AppResult};

use crate::entities::{Ballot, ballot, encode_ids};

/// A ballot about to be stored.
#[derive(Debug, Clone)]
pub struct NewBallot {
    pub id: String,
    pub cycle_id: String,
    pub voter_id: String,
    pub nominee_ids: Vec<String>,
    pub cast_at: DateTime<FixedOffset>,
}

/// Result of [`BallotStore::insert_ballot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ballot::Model),
    /// A ballot for this `(cycle, voter)` pair already exists. Nothing was written.
    AlreadyExists,
}

/// Persistence of ballots, keyed by `(cycle, voter)`.
#[async_trait]
pub trait BallotStore: Send + Sync {
    /// Insert a ballot unless the voter already has one for the cycle.
    async fn insert_ballot(&self, ballot: NewBallot) -> AppResult<InsertOutcome>;

    async fn find_ballot(&self, cycle_id: &str, voter_id: &str)
    -> AppResult<Option<ballot::Model>>;

    /// All ballots of a cycle, oldest first.
    async fn list_ballots(&self, cycle_id: &str) -> AppResult<Vec<ballot::Model>>;

    async fn count_ballots(&self, cycle_id: &str) -> AppResult<u64>;

    /// Returns the number of deleted ballots.
    ///
    /// Cycle deletion does not go through here: `VotingCycleRepository::delete`
    /// removes ballots on its own transaction together with invites and winners.
    async fn delete_all_ballots(&self, cycle_id: &str) -> AppResult<u64>;
}

/// Shared handle to a ballot store.
pub type SharedBallotStore = Arc<dyn BallotStore>;

/// Ballot repository backed by the `ballot` table.
#[derive(Clone)]
pub struct BallotRepository {
    db: Arc<DatabaseConnection>,
}

impl BallotRepository {
    /// Create a new ballot repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BallotStore for BallotRepository {
    async fn insert_ballot(&self, ballot: NewBallot) -> AppResult<InsertOutcome> {
        let model = ballot::ActiveModel {
            id: Set(ballot.id),
            cycle_id: Set(ballot.cycle_id.clone()),
            voter_id: Set(ballot.voter_id.clone()),
            nominee_ids: Set(encode_ids(&ballot.nominee_ids)),
            created_at: Set(ballot.cast_at),
        };

        match model.insert(self.db.as_ref()).await {
            Ok(inserted) => Ok(InsertOutcome::Inserted(inserted)),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    debug!(
                        cycle_id = %ballot.cycle_id,
                        voter_id = %ballot.voter_id,
                        "Ballot rejected by unique index"
                    );
                    Ok(InsertOutcome::AlreadyExists)
                }
                _ => Err(AppError::Database(e.to_string())),
            },
        }
    }

    async fn find_ballot(
        &self,
        cycle_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<ballot::Model>> {
        Ballot::find()
            .filter(ballot::Column::CycleId.eq(cycle_id))
            .filter(ballot::Column::VoterId.eq(voter_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_ballots(&self, cycle_id: &str) -> AppResult<Vec<ballot::Model>> {
        Ballot::find()
            .filter(ballot::Column::CycleId.eq(cycle_id))
            .order_by_asc(ballot::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn count_ballots(&self, cycle_id: &str) -> AppResult<u64> {
        Ballot::find()
            .filter(ballot::Column::CycleId.eq(cycle_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_all_ballots(&self, cycle_id: &str) -> AppResult<u64> {
        let result = Ballot::delete_many()
            .filter(ballot::Column::CycleId.eq(cycle_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
