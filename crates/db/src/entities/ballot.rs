//! Ballot entity: one voter's submission for one voting cycle.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use voting_common::AppResult;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ballot")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique together with `voter_id`
    #[sea_orm(indexed)]
    pub cycle_id: String,

    pub voter_id: String,

    /// Selected nominees (JSON array of employee IDs)
    #[sea_orm(column_type = "Json")]
    pub nominee_ids: JsonValue,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn nominee_ids(&self) -> AppResult<Vec<String>> {
        super::decode_ids(&self.nominee_ids, "ballot.nominee_ids")
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::voting_cycle::Entity",
        from = "Column::CycleId",
        to = "super::voting_cycle::Column::Id",
        on_delete = "Cascade"
    )]
    VotingCycle,
}

impl Related<super::voting_cycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VotingCycle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
