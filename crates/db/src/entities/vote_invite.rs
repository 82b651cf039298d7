//! Invite entity for tokenized voting links.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote_invite")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique together with `employee_id`
    #[sea_orm(indexed)]
    pub cycle_id: String,

    pub employee_id: String,

    #[sea_orm(unique)]
    pub token: String,

    pub used: bool,

    #[sea_orm(nullable)]
    pub used_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
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
