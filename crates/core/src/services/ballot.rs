//! Eligibility checks and ballot casting.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use voting_common::{AppError, AppResult, IdGenerator};
use voting_db::{
    entities::{employee, voting_cycle},
    repositories::{
        EmployeeRepository, InsertOutcome, LocationRepository, NewBallot, SharedBallotStore,
        VotingCycleRepository,
    },
};

use crate::services::snapshot::{in_order, location_ref, nominee_ref};
use crate::tally::{
    CyclePhase, Ineligible, LocationRef, NomineeRef, check_selection, check_voter, normalize_ids,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckEmployeeInput {
    #[validate(length(min = 1, max = 64))]
    pub employee_code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CastBallotInput {
    #[validate(length(min = 1, max = 64))]
    pub employee_code: String,
    #[serde(default)]
    pub nominee_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_code: String,
    pub email: String,
}

impl From<&employee::Model> for VoterView {
    fn from(e: &employee::Model) -> Self {
        Self {
            id: e.id.clone(),
            first_name: e.first_name.clone(),
            last_name: e.last_name.clone(),
            employee_code: e.employee_code.clone(),
            email: e.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeCard {
    #[serde(flatten)]
    pub nominee: NomineeRef,
    pub locations: Vec<LocationRef>,
}

/// What a voter needs to fill in a ballot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotPaper {
    pub id: String,
    pub name: String,
    pub end_at: DateTime<FixedOffset>,
    pub max_votes_per_voter: i32,
    pub vote_points: i32,
    pub nominees: Vec<NomineeCard>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub employee: VoterView,
    pub vote: BallotPaper,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastReceipt {
    pub ballot_id: String,
    pub cycle_id: String,
    pub voter_id: String,
    pub nominee_ids: Vec<String>,
    pub cast_at: DateTime<FixedOffset>,
}

/// Ballot service.
#[derive(Clone)]
pub struct BallotService {
    cycle_repo: VotingCycleRepository,
    employee_repo: EmployeeRepository,
    location_repo: LocationRepository,
    ballot_store: SharedBallotStore,
    id_gen: IdGenerator,
}

impl BallotService {
    #[must_use]
    pub const fn new(
        cycle_repo: VotingCycleRepository,
        employee_repo: EmployeeRepository,
        location_repo: LocationRepository,
        ballot_store: SharedBallotStore,
    ) -> Self {
        Self {
            cycle_repo,
            employee_repo,
            location_repo,
            ballot_store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Resolve an employee code to the employee, and check that the employee
    /// may vote in the cycle right now.
    pub async fn check_employee(
        &self,
        cycle_id: &str,
        input: CheckEmployeeInput,
    ) -> AppResult<Eligibility> {
        input.validate()?;

        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        let voter = self.voter_by_code(&input.employee_code).await?;
        self.check_eligible(&cycle, &voter).await?;

        self.eligibility(&cycle, &voter).await
    }

    /// Cast a ballot for the employee with the given code.
    pub async fn cast(&self, cycle_id: &str, input: CastBallotInput) -> AppResult<CastReceipt> {
        input.validate()?;

        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        let voter = self.voter_by_code(&input.employee_code).await?;

        self.cast_for(&cycle, &voter, &input.nominee_ids).await
    }

    /// Cast a ballot for an already resolved voter.
    ///
    /// The store's `(cycle, voter)` uniqueness decides between concurrent
    /// casts; the lookup before it only short-circuits the common case.
    pub async fn cast_for(
        &self,
        cycle: &voting_cycle::Model,
        voter: &employee::Model,
        nominee_ids: &[String],
    ) -> AppResult<CastReceipt> {
        self.check_eligible(cycle, voter).await?;

        let selection = normalize_ids(nominee_ids);
        let max = u32::try_from(cycle.max_votes_per_voter).unwrap_or(1);
        if let Err(reason) = check_selection(&cycle.nominee_ids()?, max, &selection) {
            tracing::debug!(cycle_id = %cycle.id, voter_id = %voter.id, %reason, "Selection refused");
            return Err(reason.into());
        }

        let outcome = self
            .ballot_store
            .insert_ballot(NewBallot {
                id: self.id_gen.generate(),
                cycle_id: cycle.id.clone(),
                voter_id: voter.id.clone(),
                nominee_ids: selection,
                cast_at: Utc::now().fixed_offset(),
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted(ballot) => {
                tracing::info!(cycle_id = %cycle.id, voter_id = %voter.id, "Ballot cast");
                Ok(CastReceipt {
                    nominee_ids: ballot.nominee_ids()?,
                    ballot_id: ballot.id,
                    cycle_id: ballot.cycle_id,
                    voter_id: ballot.voter_id,
                    cast_at: ballot.created_at,
                })
            }
            InsertOutcome::AlreadyExists => {
                tracing::debug!(cycle_id = %cycle.id, voter_id = %voter.id, "Lost concurrent cast");
                Err(Ineligible::AlreadyVoted.into())
            }
        }
    }

    /// Whether the voter already has a ballot in the cycle.
    pub async fn has_voted(&self, cycle_id: &str, voter_id: &str) -> AppResult<bool> {
        Ok(self
            .ballot_store
            .find_ballot(cycle_id, voter_id)
            .await?
            .is_some())
    }

    /// Phase, voter membership and prior ballot.
    pub async fn check_eligible(
        &self,
        cycle: &voting_cycle::Model,
        voter: &employee::Model,
    ) -> AppResult<()> {
        let phase = CyclePhase::at(cycle.start_at, cycle.end_at, Utc::now().fixed_offset());
        let has_ballot = self.has_voted(&cycle.id, &voter.id).await?;

        check_voter(phase, &cycle.voter_ids()?, &voter.id, has_ballot).map_err(|reason| {
            tracing::debug!(cycle_id = %cycle.id, voter_id = %voter.id, %reason, "Voter refused");
            AppError::from(reason)
        })
    }

    /// The voter together with the cycle's ballot paper.
    pub async fn eligibility(
        &self,
        cycle: &voting_cycle::Model,
        voter: &employee::Model,
    ) -> AppResult<Eligibility> {
        Ok(Eligibility {
            employee: VoterView::from(voter),
            vote: self.paper(cycle).await?,
        })
    }

    async fn paper(&self, cycle: &voting_cycle::Model) -> AppResult<BallotPaper> {
        let location_ids = cycle.location_ids()?;
        let nominee_ids = cycle.nominee_ids()?;

        let locations = self.location_repo.find_by_ids(&location_ids).await?;
        let locations: Vec<LocationRef> = in_order(&location_ids, locations, |l| l.id.as_str())
            .iter()
            .map(location_ref)
            .collect();

        let nominees = self.employee_repo.find_by_ids(&nominee_ids).await?;
        let nominees = in_order(&nominee_ids, nominees, |e| e.id.as_str())
            .iter()
            .map(|e| {
                let nominee = nominee_ref(e)?;
                let locations = locations
                    .iter()
                    .filter(|l| nominee.location_ids.contains(&l.id))
                    .cloned()
                    .collect();
                Ok(NomineeCard { nominee, locations })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(BallotPaper {
            id: cycle.id.clone(),
            name: cycle.name.clone(),
            end_at: cycle.end_at,
            max_votes_per_voter: cycle.max_votes_per_voter,
            vote_points: cycle.vote_points,
            nominees,
        })
    }

    async fn voter_by_code(&self, code: &str) -> AppResult<employee::Model> {
        self.employee_repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::BadRequest("Employee ID not found".to_string()))
    }
}
