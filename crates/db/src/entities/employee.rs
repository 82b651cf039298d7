//! Employee entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use voting_common::AppResult;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub first_name: String,

    pub last_name: String,

    /// Badge number typed in on the public voting page
    #[sea_orm(unique)]
    pub employee_code: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Assigned locations (JSON array of location IDs)
    #[sea_orm(column_type = "Json")]
    pub location_ids: JsonValue,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Locations this employee is assigned to.
    pub fn location_ids(&self) -> AppResult<Vec<String>> {
        super::decode_ids(&self.location_ids, "employee.location_ids")
    }

    /// "First Last", trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
