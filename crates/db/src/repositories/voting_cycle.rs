//! Voting cycle repository.
//!
//! Also owns the cycle's winner records, which only exist for tie-breaks.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use voting_common::{AppError, AppResult};

use crate::entities::{
    Ballot, CycleWinner, VoteInvite, VotingCycle, ballot, cycle_winner, vote_invite, voting_cycle,
};

/// Voting cycle repository for database operations.
#[derive(Clone)]
pub struct VotingCycleRepository {
    db: Arc<DatabaseConnection>,
}

impl VotingCycleRepository {
    /// Create a new voting cycle repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a cycle by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<voting_cycle::Model>> {
        VotingCycle::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a cycle by ID, failing with [`AppError::CycleNotFound`].
    pub async fn get_by_id(&self, id: &str) -> AppResult<voting_cycle::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CycleNotFound(id.to_string()))
    }

    /// List all cycles, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<voting_cycle::Model>> {
        VotingCycle::find()
            .order_by_desc(voting_cycle::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Cycles whose window closed before `now`, most recently ended first.
    pub async fn find_ended_before(
        &self,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Vec<voting_cycle::Model>> {
        VotingCycle::find()
            .filter(voting_cycle::Column::EndAt.lt(now))
            .order_by_desc(voting_cycle::Column::EndAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new cycle.
    pub async fn create(&self, model: voting_cycle::ActiveModel) -> AppResult<voting_cycle::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a cycle.
    pub async fn update(&self, model: voting_cycle::ActiveModel) -> AppResult<voting_cycle::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a cycle together with its ballots, invites and winner records.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ballot::delete_many()
            .filter(ballot::Column::CycleId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        VoteInvite::delete_many()
            .filter(vote_invite::Column::CycleId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        CycleWinner::delete_many()
            .filter(cycle_winner::Column::CycleId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        VotingCycle::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record that the cycle-wide winner summary went out.
    pub async fn mark_results_notified(
        &self,
        id: &str,
        at: DateTime<FixedOffset>,
    ) -> AppResult<()> {
        VotingCycle::update_many()
            .col_expr(voting_cycle::Column::ResultsNotifiedAt, Expr::value(at))
            .filter(voting_cycle::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Winner records of one cycle.
    pub async fn find_winners(&self, cycle_id: &str) -> AppResult<Vec<cycle_winner::Model>> {
        CycleWinner::find()
            .filter(cycle_winner::Column::CycleId.eq(cycle_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert or replace the winner record of `(cycle_id, location_id)`.
    ///
    /// Concurrent calls for the same location are last-write-wins.
    pub async fn upsert_winner(
        &self,
        cycle_id: &str,
        location_id: &str,
        employee_id: &str,
        announced_at: DateTime<FixedOffset>,
    ) -> AppResult<()> {
        let model = cycle_winner::ActiveModel {
            cycle_id: Set(cycle_id.to_string()),
            location_id: Set(location_id.to_string()),
            employee_id: Set(employee_id.to_string()),
            announced_at: Set(announced_at),
        };

        CycleWinner::insert(model)
            .on_conflict(
                OnConflict::columns([
                    cycle_winner::Column::CycleId,
                    cycle_winner::Column::LocationId,
                ])
                .update_columns([
                    cycle_winner::Column::EmployeeId,
                    cycle_winner::Column::AnnouncedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
