//! Loading a cycle together with everything the tally engine needs.

use std::collections::HashMap;

use voting_common::AppResult;
use voting_db::{
    entities::{employee, location, voting_cycle},
    repositories::{EmployeeRepository, LocationRepository, SharedBallotStore},
};

use crate::tally::{BallotRef, CycleSnapshot, LocationRef, NomineeRef, Tally, tally};

/// A cycle with its locations, nominees and ballots resolved.
#[derive(Debug, Clone)]
pub struct LoadedCycle {
    pub cycle: voting_cycle::Model,
    pub snapshot: CycleSnapshot,
    pub ballots: Vec<BallotRef>,
}

impl LoadedCycle {
    /// Run the tally engine on this snapshot.
    #[must_use]
    pub fn tally(&self) -> Tally {
        tally(&self.snapshot, &self.ballots)
    }

    #[must_use]
    pub fn location(&self, location_id: &str) -> Option<&LocationRef> {
        self.snapshot.locations.iter().find(|l| l.id == location_id)
    }

    #[must_use]
    pub fn nominee(&self, nominee_id: &str) -> Option<&NomineeRef> {
        self.snapshot.nominees.iter().find(|n| n.id == nominee_id)
    }
}

pub fn location_ref(model: &location::Model) -> LocationRef {
    LocationRef {
        id: model.id.clone(),
        name: model.name.clone(),
        code: model.code.clone(),
    }
}

pub fn nominee_ref(model: &employee::Model) -> AppResult<NomineeRef> {
    Ok(NomineeRef {
        id: model.id.clone(),
        first_name: model.first_name.clone(),
        last_name: model.last_name.clone(),
        employee_code: model.employee_code.clone(),
        location_ids: model.location_ids()?,
    })
}

/// Keep the order of `ids`, dropping IDs that were not found.
pub fn in_order<T, F>(ids: &[String], items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut by_id: HashMap<String, T> = items
        .into_iter()
        .map(|item| (key(&item).to_string(), item))
        .collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// Builds [`LoadedCycle`]s from storage.
#[derive(Clone)]
pub struct SnapshotLoader {
    location_repo: LocationRepository,
    employee_repo: EmployeeRepository,
    ballot_store: SharedBallotStore,
}

impl SnapshotLoader {
    #[must_use]
    pub const fn new(
        location_repo: LocationRepository,
        employee_repo: EmployeeRepository,
        ballot_store: SharedBallotStore,
    ) -> Self {
        Self {
            location_repo,
            employee_repo,
            ballot_store,
        }
    }

    /// Resolve a cycle's locations and nominees, and fetch its ballots.
    ///
    /// Locations and nominees that no longer exist are left out.
    pub async fn load(&self, cycle: voting_cycle::Model) -> AppResult<LoadedCycle> {
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
            .map(nominee_ref)
            .collect::<AppResult<Vec<_>>>()?;

        let ballots = self
            .ballot_store
            .list_ballots(&cycle.id)
            .await?
            .iter()
            .map(|b| {
                Ok(BallotRef {
                    voter_id: b.voter_id.clone(),
                    nominee_ids: b.nominee_ids()?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let snapshot = CycleSnapshot {
            locations,
            voter_ids: cycle.voter_ids()?,
            nominees,
            vote_points: u32::try_from(cycle.vote_points).unwrap_or(1),
        };

        Ok(LoadedCycle {
            cycle,
            snapshot,
            ballots,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset, Utc};
    use serde_json::json;
    use std::sync::Arc;
    use voting_db::repositories::{BallotStore, NewBallot};
    use voting_db::test_utils::MemoryBallotStore;

    pub(crate) fn now() -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }

    pub(crate) fn test_location(id: &str) -> location::Model {
        location::Model {
            id: id.to_string(),
            name: format!("Store {id}"),
            code: id.to_uppercase(),
            created_at: now(),
        }
    }

    pub(crate) fn test_employee(id: &str, locations: &[&str]) -> employee::Model {
        employee::Model {
            id: id.to_string(),
            first_name: id.to_uppercase(),
            last_name: "Test".to_string(),
            employee_code: format!("E-{id}"),
            email: format!("{id}@example.com"),
            location_ids: json!(locations),
            created_at: now(),
        }
    }

    /// L1/L2 cycle: voters V1..V4, N1 and N2 at L1, N3 at L2, 2 points per vote.
    /// `ended` puts the whole window in the past, otherwise the cycle is active.
    pub(crate) fn test_cycle(id: &str, ended: bool) -> voting_cycle::Model {
        let (start, end) = if ended {
            (now() - Duration::days(2), now() - Duration::days(1))
        } else {
            (now() - Duration::days(1), now() + Duration::days(1))
        };
        voting_cycle::Model {
            id: id.to_string(),
            name: "Employee of the Month".to_string(),
            location_ids: json!(["l1", "l2"]),
            voter_ids: json!(["v1", "v2", "v3", "v4"]),
            nominee_ids: json!(["n1", "n2", "n3"]),
            start_at: start,
            end_at: end,
            vote_points: 2,
            max_votes_per_voter: 1,
            results_notified_at: None,
            created_at: now(),
            updated_at: None,
        }
    }

    pub(crate) fn test_nominees() -> Vec<employee::Model> {
        vec![
            test_employee("n1", &["l1"]),
            test_employee("n2", &["l1"]),
            test_employee("n3", &["l2"]),
        ]
    }

    pub(crate) async fn store_with(
        cycle_id: &str,
        votes: &[(&str, &str)],
    ) -> Arc<MemoryBallotStore> {
        let store = Arc::new(MemoryBallotStore::new());
        for (i, (voter, nominee)) in votes.iter().enumerate() {
            store
                .insert_ballot(NewBallot {
                    id: format!("b{i}"),
                    cycle_id: cycle_id.to_string(),
                    voter_id: (*voter).to_string(),
                    nominee_ids: vec![(*nominee).to_string()],
                    cast_at: now() + Duration::seconds(i64::try_from(i).unwrap()),
                })
                .await
                .unwrap();
        }
        store
    }

    #[test]
    fn test_in_order_keeps_requested_order_and_drops_missing() {
        let found = vec![test_location("b"), test_location("a")];
        let ordered = in_order(
            &["a".to_string(), "zz".to_string(), "b".to_string()],
            found,
            |l| l.id.as_str(),
        );
        let ids: Vec<_> = ordered.iter().map(|l| l.id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b"]);
    }
}
