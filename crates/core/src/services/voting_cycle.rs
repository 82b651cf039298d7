//! Voting cycle administration.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use futures::future::try_join_all;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;
use voting_common::{AppResult, IdGenerator};
use voting_db::{
    entities::{employee, encode_ids, voting_cycle},
    repositories::{
        EmployeeRepository, LocationRepository, SharedBallotStore, VotingCycleRepository,
    },
};

use crate::services::ballot::VoterView;
use crate::services::results::ResultsService;
use crate::tally::{Assignment, CycleDefinition, CyclePhase, normalize_ids};

const fn default_one() -> i32 {
    1
}

/// Input for creating or replacing a cycle.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CycleInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub location_ids: Vec<String>,
    #[serde(default)]
    pub voter_ids: Vec<String>,
    #[serde(default)]
    pub nominee_ids: Vec<String>,
    pub start_at: DateTime<FixedOffset>,
    pub end_at: DateTime<FixedOffset>,
    #[serde(default = "default_one")]
    pub vote_points: i32,
    #[serde(default = "default_one")]
    pub max_votes_per_voter: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleView {
    pub id: String,
    pub name: String,
    pub location_ids: Vec<String>,
    pub voter_ids: Vec<String>,
    pub nominee_ids: Vec<String>,
    pub start_at: DateTime<FixedOffset>,
    pub end_at: DateTime<FixedOffset>,
    pub vote_points: i32,
    pub max_votes_per_voter: i32,
    pub results_notified_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl TryFrom<&voting_cycle::Model> for CycleView {
    type Error = voting_common::AppError;

    fn try_from(c: &voting_cycle::Model) -> AppResult<Self> {
        Ok(Self {
            id: c.id.clone(),
            name: c.name.clone(),
            location_ids: c.location_ids()?,
            voter_ids: c.voter_ids()?,
            nominee_ids: c.nominee_ids()?,
            start_at: c.start_at,
            end_at: c.end_at,
            vote_points: c.vote_points,
            max_votes_per_voter: c.max_votes_per_voter,
            results_notified_at: c.results_notified_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    #[serde(flatten)]
    pub cycle: CycleView,
    pub total_voters: u64,
    pub total_votes_cast: u64,
    pub remaining_voters: u64,
    pub has_started: bool,
    pub has_ended: bool,
    pub is_active: bool,
    pub has_unresolved_tie: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterStatus {
    #[serde(flatten)]
    pub voter: VoterView,
    pub has_voted: bool,
    pub voted_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterRoster {
    pub vote_id: String,
    pub total_voters: u64,
    pub total_voted: u64,
    pub voters: Vec<VoterStatus>,
}

/// Voting cycle service.
#[derive(Clone)]
pub struct VotingCycleService {
    cycle_repo: VotingCycleRepository,
    location_repo: LocationRepository,
    employee_repo: EmployeeRepository,
    ballot_store: SharedBallotStore,
    results: ResultsService,
    id_gen: IdGenerator,
}

impl VotingCycleService {
    #[must_use]
    pub const fn new(
        cycle_repo: VotingCycleRepository,
        location_repo: LocationRepository,
        employee_repo: EmployeeRepository,
        ballot_store: SharedBallotStore,
        results: ResultsService,
    ) -> Self {
        Self {
            cycle_repo,
            location_repo,
            employee_repo,
            ballot_store,
            results,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a cycle.
    pub async fn create(&self, input: CycleInput) -> AppResult<CycleView> {
        let def = self.definition(input).await?;
        let now = Utc::now().fixed_offset();

        let model = voting_cycle::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(def.name),
            location_ids: Set(encode_ids(&def.location_ids)),
            voter_ids: Set(encode_ids(&def.voter_ids)),
            nominee_ids: Set(encode_ids(&def.nominee_ids)),
            start_at: Set(def.start_at),
            end_at: Set(def.end_at),
            vote_points: Set(def.vote_points),
            max_votes_per_voter: Set(def.max_votes_per_voter),
            results_notified_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let created = self.cycle_repo.create(model).await?;
        tracing::info!(cycle_id = %created.id, name = %created.name, "Voting cycle created");
        CycleView::try_from(&created)
    }

    /// Replace a cycle's definition. Ballots and winner records are kept.
    pub async fn update(&self, id: &str, input: CycleInput) -> AppResult<CycleView> {
        let existing = self.cycle_repo.get_by_id(id).await?;
        let def = self.definition(input).await?;

        let mut model: voting_cycle::ActiveModel = existing.into();
        model.name = Set(def.name);
        model.location_ids = Set(encode_ids(&def.location_ids));
        model.voter_ids = Set(encode_ids(&def.voter_ids));
        model.nominee_ids = Set(encode_ids(&def.nominee_ids));
        model.start_at = Set(def.start_at);
        model.end_at = Set(def.end_at);
        model.vote_points = Set(def.vote_points);
        model.max_votes_per_voter = Set(def.max_votes_per_voter);
        model.updated_at = Set(Some(Utc::now().fixed_offset()));

        let updated = self.cycle_repo.update(model).await?;
        tracing::info!(cycle_id = %updated.id, "Voting cycle updated");
        CycleView::try_from(&updated)
    }

    /// Delete a cycle and everything recorded for it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.cycle_repo.get_by_id(id).await?;
        self.cycle_repo.delete(id).await?;
        tracing::info!(cycle_id = %id, "Voting cycle deleted");
        Ok(())
    }

    /// All cycles, newest first, with participation counters.
    pub async fn list(&self) -> AppResult<Vec<CycleSummary>> {
        let cycles = self.cycle_repo.find_all().await?;
        try_join_all(cycles.into_iter().map(|c| self.summarize(c))).await
    }

    async fn summarize(&self, cycle: voting_cycle::Model) -> AppResult<CycleSummary> {
        let phase = CyclePhase::at(cycle.start_at, cycle.end_at, Utc::now().fixed_offset());
        let total_voters = cycle.voter_ids()?.len() as u64;
        let total_votes_cast = self.ballot_store.count_ballots(&cycle.id).await?;
        let view = CycleView::try_from(&cycle)?;

        let has_unresolved_tie = if phase.has_ended() {
            self.results.resolve_cycle(cycle).await?.has_unresolved_tie()
        } else {
            false
        };

        Ok(CycleSummary {
            cycle: view,
            total_voters,
            total_votes_cast,
            remaining_voters: total_voters.saturating_sub(total_votes_cast),
            has_started: phase.has_started(),
            has_ended: phase.has_ended(),
            is_active: phase.is_active(),
            has_unresolved_tie,
        })
    }

    /// The cycle's voters with their voting status, by first then last name.
    pub async fn voters(&self, id: &str) -> AppResult<VoterRoster> {
        let cycle = self.cycle_repo.get_by_id(id).await?;
        let voter_ids = cycle.voter_ids()?;

        let voted_at: HashMap<String, DateTime<FixedOffset>> = self
            .ballot_store
            .list_ballots(&cycle.id)
            .await?
            .into_iter()
            .map(|b| (b.voter_id, b.created_at))
            .collect();

        let voters: Vec<VoterStatus> = self
            .employee_repo
            .find_by_ids(&voter_ids)
            .await?
            .iter()
            .map(|e| {
                let at = voted_at.get(&e.id).copied();
                VoterStatus {
                    voter: VoterView::from(e),
                    has_voted: at.is_some(),
                    voted_at: at,
                }
            })
            .collect();

        Ok(VoterRoster {
            vote_id: cycle.id,
            total_voters: voters.len() as u64,
            total_voted: voters.iter().filter(|v| v.has_voted).count() as u64,
            voters,
        })
    }

    /// Normalize the input and check it against the directory.
    async fn definition(&self, input: CycleInput) -> AppResult<CycleDefinition> {
        input.validate()?;

        let def = CycleDefinition {
            name: input.name.trim().to_string(),
            location_ids: normalize_ids(&input.location_ids),
            voter_ids: normalize_ids(&input.voter_ids),
            nominee_ids: normalize_ids(&input.nominee_ids),
            start_at: input.start_at,
            end_at: input.end_at,
            vote_points: input.vote_points,
            max_votes_per_voter: input.max_votes_per_voter,
        };
        def.check_shape()?;

        let locations = self.location_repo.find_by_ids(&def.location_ids).await?;
        let voters = assignments(&self.employee_repo.find_by_ids(&def.voter_ids).await?)?;
        let nominees = assignments(&self.employee_repo.find_by_ids(&def.nominee_ids).await?)?;

        if let Err(violation) = def.check_references(locations.len(), &voters, &nominees) {
            tracing::debug!(%violation, "Cycle definition refused");
            return Err(violation.into());
        }
        Ok(def)
    }
}

fn assignments(employees: &[employee::Model]) -> AppResult<Vec<Assignment>> {
    employees
        .iter()
        .map(|e| {
            Ok(Assignment {
                employee_id: e.id.clone(),
                location_ids: e.location_ids()?,
            })
        })
        .collect()
}
