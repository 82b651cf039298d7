//! Voting cycle entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use voting_common::AppResult;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "voting_cycle")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    /// Participating locations in display order (JSON array of IDs)
    #[sea_orm(column_type = "Json")]
    pub location_ids: JsonValue,

    /// Eligible voters (JSON array of employee IDs)
    #[sea_orm(column_type = "Json")]
    pub voter_ids: JsonValue,

    /// Nominees (JSON array of employee IDs)
    #[sea_orm(column_type = "Json")]
    pub nominee_ids: JsonValue,

    pub start_at: DateTimeWithTimeZone,

    pub end_at: DateTimeWithTimeZone,

    /// Points awarded per selection
    pub vote_points: i32,

    pub max_votes_per_voter: i32,

    /// Set once the cycle-wide winner summary has gone out
    #[sea_orm(nullable)]
    pub results_notified_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    pub fn location_ids(&self) -> AppResult<Vec<String>> {
        super::decode_ids(&self.location_ids, "voting_cycle.location_ids")
    }

    pub fn voter_ids(&self) -> AppResult<Vec<String>> {
        super::decode_ids(&self.voter_ids, "voting_cycle.voter_ids")
    }

    pub fn nominee_ids(&self) -> AppResult<Vec<String>> {
        super::decode_ids(&self.nominee_ids, "voting_cycle.nominee_ids")
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ballot::Entity")]
    Ballot,

    #[sea_orm(has_many = "super::cycle_winner::Entity")]
    CycleWinner,

    #[sea_orm(has_many = "super::vote_invite::Entity")]
    VoteInvite,
}

impl Related<super::ballot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ballot.def()
    }
}

impl Related<super::cycle_winner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CycleWinner.def()
    }
}

impl Related<super::vote_invite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoteInvite.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
