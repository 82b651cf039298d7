//! Vote invite repository.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};
use voting_common::{AppError, AppResult};

use crate::entities::{VoteInvite, vote_invite};

/// Vote invite repository for database operations.
#[derive(Clone)]
pub struct VoteInviteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteInviteRepository {
    /// Create a new vote invite repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an invite by its token within a cycle.
    pub async fn find_by_token(
        &self,
        cycle_id: &str,
        token: &str,
    ) -> AppResult<Option<vote_invite::Model>> {
        VoteInvite::find()
            .filter(vote_invite::Column::CycleId.eq(cycle_id))
            .filter(vote_invite::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Issue a fresh token for `(cycle_id, employee_id)`.
    ///
    /// An existing invite keeps its ID but gets the new token and is reset to unused.
    pub async fn upsert_for_employee(
        &self,
        id: &str,
        cycle_id: &str,
        employee_id: &str,
        token: &str,
        now: DateTime<FixedOffset>,
    ) -> AppResult<vote_invite::Model> {
        let model = vote_invite::ActiveModel {
            id: Set(id.to_string()),
            cycle_id: Set(cycle_id.to_string()),
            employee_id: Set(employee_id.to_string()),
            token: Set(token.to_string()),
            used: Set(false),
            used_at: Set(None),
            created_at: Set(now),
        };

        VoteInvite::insert(model)
            .on_conflict(
                OnConflict::columns([
                    vote_invite::Column::CycleId,
                    vote_invite::Column::EmployeeId,
                ])
                .update_columns([
                    vote_invite::Column::Token,
                    vote_invite::Column::Used,
                    vote_invite::Column::UsedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark an invite as used. Already-used invites keep their original timestamp.
    pub async fn mark_used(&self, id: &str, at: DateTime<FixedOffset>) -> AppResult<()> {
        VoteInvite::update_many()
            .col_expr(vote_invite::Column::Used, Expr::value(true))
            .col_expr(vote_invite::Column::UsedAt, Expr::value(at))
            .filter(vote_invite::Column::Id.eq(id))
            .filter(vote_invite::Column::Used.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_invite(id: &str, token: &str, used: bool) -> vote_invite::Model {
        vote_invite::Model {
            id: id.to_string(),
            cycle_id: "c1".to_string(),
            employee_id: "v1".to_string(),
            token: token.to_string(),
            used,
            used_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_token_found() {
        let invite = create_test_invite("i1", "abc", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[invite.clone()]])
                .into_connection(),
        );

        let repo = VoteInviteRepository::new(db);
        let found = repo.find_by_token("c1", "abc").await.unwrap().unwrap();

        assert_eq!(found.employee_id, "v1");
        assert!(!found.used);
    }

    #[tokio::test]
    async fn test_find_by_token_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<vote_invite::Model>::new()])
                .into_connection(),
        );

        let repo = VoteInviteRepository::new(db);
        assert!(repo.find_by_token("c1", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_for_employee_returns_reset_invite() {
        let invite = create_test_invite("i1", "fresh", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[invite]])
                .into_connection(),
        );

        let repo = VoteInviteRepository::new(db);
        let result = repo
            .upsert_for_employee("i2", "c1", "v1", "fresh", Utc::now().into())
            .await
            .unwrap();

        assert_eq!(result.token, "fresh");
        assert!(!result.used);
    }

    #[tokio::test]
    async fn test_mark_used() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = VoteInviteRepository::new(db);
        assert!(repo.mark_used("i1", Utc::now().into()).await.is_ok());
    }
}
