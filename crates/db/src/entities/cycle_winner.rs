//! Manually announced winner for one location of a voting cycle.
//!
//! Only tie-breaks are stored. Single-leader winners are derived on read.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cycle_winner")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cycle_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub location_id: String,

    pub employee_id: String,

    pub announced_at: DateTimeWithTimeZone,
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
