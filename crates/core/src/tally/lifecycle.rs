//! Cycle phases and the rules that depend on them.
//!
//! A cycle has no stored status. Its phase follows from the clock and the
//! cycle window: upcoming before `start_at`, active through `end_at`
//! inclusive, ended afterwards.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;

/// Time-derived state of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CyclePhase {
    Upcoming,
    Active,
    Ended,
}

impl CyclePhase {
    /// Phase of the window `[start_at, end_at]` at `now`.
    #[must_use]
    pub fn at(
        start_at: DateTime<FixedOffset>,
        end_at: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> Self {
        if now < start_at {
            Self::Upcoming
        } else if now > end_at {
            Self::Ended
        } else {
            Self::Active
        }
    }

    #[must_use]
    pub const fn has_started(self) -> bool {
        !matches!(self, Self::Upcoming)
    }

    #[must_use]
    pub const fn has_ended(self) -> bool {
        matches!(self, Self::Ended)
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Why a ballot may not be cast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("Voting has not started yet")]
    NotStarted,
    #[error("Voting has ended")]
    Ended,
    #[error("You are not allowed to vote in this poll")]
    NotAVoter,
    #[error("You have already voted in this poll")]
    AlreadyVoted,
    #[error("Please select at least one nominee")]
    NoSelection,
    #[error("You can select up to {max} nominees")]
    TooManySelections { max: u32 },
    #[error("Invalid nominee selected")]
    UnknownNominee(String),
}

/// Steps 1 to 3 of the eligibility check: phase, voter membership, no prior ballot.
pub fn check_voter(
    phase: CyclePhase,
    voter_ids: &[String],
    voter_id: &str,
    has_ballot: bool,
) -> Result<(), Ineligible> {
    match phase {
        CyclePhase::Upcoming => return Err(Ineligible::NotStarted),
        CyclePhase::Ended => return Err(Ineligible::Ended),
        CyclePhase::Active => {}
    }
    if !voter_ids.iter().any(|id| id == voter_id) {
        return Err(Ineligible::NotAVoter);
    }
    if has_ballot {
        return Err(Ineligible::AlreadyVoted);
    }
    Ok(())
}

/// Steps 4 and 5: selection size and nominee membership.
///
/// `selection` is expected to be normalized (see [`normalize_ids`]).
pub fn check_selection(
    nominee_ids: &[String],
    max_votes_per_voter: u32,
    selection: &[String],
) -> Result<(), Ineligible> {
    if selection.is_empty() {
        return Err(Ineligible::NoSelection);
    }
    if selection.len() > max_votes_per_voter as usize {
        return Err(Ineligible::TooManySelections {
            max: max_votes_per_voter,
        });
    }
    if let Some(unknown) = selection.iter().find(|id| !nominee_ids.contains(id)) {
        return Err(Ineligible::UnknownNominee(unknown.clone()));
    }
    Ok(())
}

/// Trim IDs, drop empty ones and duplicates, keep first-seen order.
#[must_use]
pub fn normalize_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Why a cycle definition was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleRuleViolation {
    #[error("Vote name cannot be empty")]
    EmptyName,
    #[error("At least one location, one voter and one nominee must be selected")]
    EmptySelection,
    #[error("End time must be after start time")]
    InvalidWindow,
    #[error("Vote points must be a positive number")]
    VotePoints,
    #[error("Max votes per voter must be at least 1")]
    MaxVotesPerVoter,
    #[error("One or more selected locations do not exist")]
    UnknownLocation,
    #[error("One or more selected voters do not exist")]
    UnknownVoter,
    #[error("One or more selected nominees do not exist")]
    UnknownNominee,
    #[error("One or more voters are not assigned to the selected locations")]
    VoterOutsideLocations,
    #[error("One or more nominees are not assigned to the selected locations")]
    NomineeOutsideLocations,
}

/// An employee and the locations it is assigned to.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub employee_id: String,
    pub location_ids: Vec<String>,
}

/// A normalized cycle definition, as submitted for create or update.
#[derive(Debug, Clone)]
pub struct CycleDefinition {
    pub name: String,
    pub location_ids: Vec<String>,
    pub voter_ids: Vec<String>,
    pub nominee_ids: Vec<String>,
    pub start_at: DateTime<FixedOffset>,
    pub end_at: DateTime<FixedOffset>,
    pub vote_points: i32,
    pub max_votes_per_voter: i32,
}

impl CycleDefinition {
    /// Rules that need no lookups.
    pub fn check_shape(&self) -> Result<(), CycleRuleViolation> {
        if self.name.trim().is_empty() {
            return Err(CycleRuleViolation::EmptyName);
        }
        if self.location_ids.is_empty() || self.voter_ids.is_empty() || self.nominee_ids.is_empty()
        {
            return Err(CycleRuleViolation::EmptySelection);
        }
        if self.vote_points < 1 {
            return Err(CycleRuleViolation::VotePoints);
        }
        if self.max_votes_per_voter < 1 {
            return Err(CycleRuleViolation::MaxVotesPerVoter);
        }
        if self.end_at <= self.start_at {
            return Err(CycleRuleViolation::InvalidWindow);
        }
        Ok(())
    }

    /// Every reference resolved, and every voter and nominee assigned to at
    /// least one selected location.
    ///
    /// `found_locations` is the number of selected locations that exist;
    /// `voters` and `nominees` are the employees found for the selected IDs.
    pub fn check_references(
        &self,
        found_locations: usize,
        voters: &[Assignment],
        nominees: &[Assignment],
    ) -> Result<(), CycleRuleViolation> {
        if found_locations != self.location_ids.len() {
            return Err(CycleRuleViolation::UnknownLocation);
        }
        if voters.len() != self.voter_ids.len() {
            return Err(CycleRuleViolation::UnknownVoter);
        }
        if nominees.len() != self.nominee_ids.len() {
            return Err(CycleRuleViolation::UnknownNominee);
        }

        let selected: HashSet<&str> = self.location_ids.iter().map(String::as_str).collect();
        let assigned_here =
            |a: &Assignment| a.location_ids.iter().any(|l| selected.contains(l.as_str()));

        if !voters.iter().all(assigned_here) {
            return Err(CycleRuleViolation::VoterOutsideLocations);
        }
        if !nominees.iter().all(assigned_here) {
            return Err(CycleRuleViolation::NomineeOutsideLocations);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    fn definition() -> CycleDefinition {
        let now = Utc::now().fixed_offset();
        CycleDefinition {
            name: "Employee of the Month".to_string(),
            location_ids: ids(&["l1", "l2"]),
            voter_ids: ids(&["v1"]),
            nominee_ids: ids(&["n1"]),
            start_at: now,
            end_at: now + Duration::days(7),
            vote_points: 1,
            max_votes_per_voter: 1,
        }
    }

    fn assignment(id: &str, locations: &[&str]) -> Assignment {
        Assignment {
            employee_id: id.to_string(),
            location_ids: ids(locations),
        }
    }

    #[test]
    fn test_phase_boundaries() {
        let start = Utc::now().fixed_offset();
        let end = start + Duration::hours(1);

        assert_eq!(
            CyclePhase::at(start, end, start - Duration::seconds(1)),
            CyclePhase::Upcoming
        );
        assert_eq!(CyclePhase::at(start, end, start), CyclePhase::Active);
        assert_eq!(CyclePhase::at(start, end, end), CyclePhase::Active);
        assert_eq!(
            CyclePhase::at(start, end, end + Duration::seconds(1)),
            CyclePhase::Ended
        );
    }

    #[test]
    fn test_phase_flags() {
        assert!(!CyclePhase::Upcoming.has_started());
        assert!(CyclePhase::Active.is_active());
        assert!(CyclePhase::Ended.has_started());
        assert!(CyclePhase::Ended.has_ended());
        assert!(!CyclePhase::Ended.is_active());
    }

    #[test]
    fn test_check_voter_order() {
        let voters = ids(&["v1"]);

        assert_eq!(
            check_voter(CyclePhase::Upcoming, &voters, "v1", false),
            Err(Ineligible::NotStarted)
        );
        assert_eq!(
            check_voter(CyclePhase::Ended, &voters, "v1", false),
            Err(Ineligible::Ended)
        );
        assert_eq!(
            check_voter(CyclePhase::Active, &voters, "v9", false),
            Err(Ineligible::NotAVoter)
        );
        assert_eq!(
            check_voter(CyclePhase::Active, &voters, "v1", true),
            Err(Ineligible::AlreadyVoted)
        );
        assert_eq!(check_voter(CyclePhase::Active, &voters, "v1", false), Ok(()));
    }

    #[test]
    fn test_check_selection() {
        let nominees = ids(&["n1", "n2", "n3"]);

        assert_eq!(
            check_selection(&nominees, 2, &[]),
            Err(Ineligible::NoSelection)
        );
        assert_eq!(
            check_selection(&nominees, 2, &ids(&["n1", "n2", "n3"])),
            Err(Ineligible::TooManySelections { max: 2 })
        );
        assert_eq!(
            check_selection(&nominees, 2, &ids(&["n1", "x"])),
            Err(Ineligible::UnknownNominee("x".to_string()))
        );
        assert_eq!(check_selection(&nominees, 2, &ids(&["n1", "n3"])), Ok(()));
    }

    #[test]
    fn test_too_many_message() {
        let err = Ineligible::TooManySelections { max: 3 };
        assert_eq!(err.to_string(), "You can select up to 3 nominees");
    }

    #[test]
    fn test_normalize_ids() {
        let normalized = normalize_ids([" a ", "", "b", "a", "  ", "c"]);
        assert_eq!(normalized, ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_check_shape() {
        assert_eq!(definition().check_shape(), Ok(()));

        let mut d = definition();
        d.name = "   ".to_string();
        assert_eq!(d.check_shape(), Err(CycleRuleViolation::EmptyName));

        let mut d = definition();
        d.nominee_ids.clear();
        assert_eq!(d.check_shape(), Err(CycleRuleViolation::EmptySelection));

        let mut d = definition();
        d.vote_points = 0;
        assert_eq!(d.check_shape(), Err(CycleRuleViolation::VotePoints));

        let mut d = definition();
        d.max_votes_per_voter = 0;
        assert_eq!(d.check_shape(), Err(CycleRuleViolation::MaxVotesPerVoter));

        let mut d = definition();
        d.end_at = d.start_at;
        assert_eq!(d.check_shape(), Err(CycleRuleViolation::InvalidWindow));
    }

    #[test]
    fn test_check_references() {
        let d = definition();
        let voters = [assignment("v1", &["l2"])];
        let nominees = [assignment("n1", &["l1", "elsewhere"])];

        assert_eq!(d.check_references(2, &voters, &nominees), Ok(()));
        assert_eq!(
            d.check_references(1, &voters, &nominees),
            Err(CycleRuleViolation::UnknownLocation)
        );
        assert_eq!(
            d.check_references(2, &[], &nominees),
            Err(CycleRuleViolation::UnknownVoter)
        );
        assert_eq!(
            d.check_references(2, &[assignment("v1", &["elsewhere"])], &nominees),
            Err(CycleRuleViolation::VoterOutsideLocations)
        );
        assert_eq!(
            d.check_references(2, &voters, &[assignment("n1", &[])]),
            Err(CycleRuleViolation::NomineeOutsideLocations)
        );
    }
}
