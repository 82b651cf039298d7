//! Employee repository.

use std::sync::Arc;

use crate::entities::{Employee, employee};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use voting_common::{AppError, AppResult};

/// Employee repository for database operations.
#[derive(Clone)]
pub struct EmployeeRepository {
    db: Arc<DatabaseConnection>,
}

impl EmployeeRepository {
    /// Create a new employee repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an employee by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<employee::Model>> {
        Employee::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find employees by IDs, sorted by first then last name.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<employee::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Employee::find()
            .filter(employee::Column::Id.is_in(ids.iter().cloned()))
            .order_by_asc(employee::Column::FirstName)
            .order_by_asc(employee::Column::LastName)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an employee by employee code (badge number).
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<employee::Model>> {
        Employee::find()
            .filter(employee::Column::EmployeeCode.eq(code.trim()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new employee.
    pub async fn create(&self, model: employee::ActiveModel) -> AppResult<employee::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| match e.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::Conflict("Employee code or email already exists".to_string())
                }
                _ => AppError::Database(e.to_string()),
            })
    }
}
