//! Location repository.

use std::sync::Arc;

use crate::entities::{Location, location};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use voting_common::{AppError, AppResult};

/// Location repository for database operations.
#[derive(Clone)]
pub struct LocationRepository {
    db: Arc<DatabaseConnection>,
}

impl LocationRepository {
    /// Create a new location repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a location by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<location::Model>> {
        Location::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find locations by IDs. Order of the result is unspecified.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<location::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Location::find()
            .filter(location::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all locations ordered by name.
    pub async fn find_all(&self) -> AppResult<Vec<location::Model>> {
        Location::find()
            .order_by_asc(location::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new location.
    pub async fn create(&self, model: location::ActiveModel) -> AppResult<location::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| match e.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::Conflict("Location name or code already exists".to_string())
                }
                _ => AppError::Database(e.to_string()),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_location(id: &str, name: &str, code: &str) -> location::Model {
        location::Model {
            id: id.to_string(),
            name: name.to_string(),
            code: code.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let loc = create_test_location("l1", "Downtown", "DT");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[loc.clone()]])
                .into_connection(),
        );

        let repo = LocationRepository::new(db);
        let found = repo.find_by_id("l1").await.unwrap().unwrap();

        assert_eq!(found.name, "Downtown");
        assert_eq!(found.code, "DT");
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        // No query results appended: a query would fail.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = LocationRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_ids() {
        let l1 = create_test_location("l1", "Downtown", "DT");
        let l2 = create_test_location("l2", "Airport", "AP");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[l1, l2]])
                .into_connection(),
        );

        let repo = LocationRepository::new(db);
        let result = repo
            .find_by_ids(&["l1".to_string(), "l2".to_string()])
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
    }
}
