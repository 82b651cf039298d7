//! Tie detection and winner resolution.
//!
//! Per location, the nominees with the most location votes form the top
//! group. The official winner is, in order of priority:
//!
//! 1. the nominee of a stored winner record (a manual tie-break),
//! 2. the single top nominee once the cycle has ended (computed on every read),
//! 3. nobody.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;

use super::engine::Tally;
use super::lifecycle::CyclePhase;

/// A stored manual announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerRecordRef {
    pub location_id: String,
    pub employee_id: String,
    pub announced_at: DateTime<FixedOffset>,
}

/// One nominee's standing at a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub nominee_id: String,
    pub location_votes: u64,
    pub location_points: u64,
    pub location_percentage: f64,
    pub is_top: bool,
}

/// The authoritative winner of a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialWinner {
    pub nominee_id: String,
    /// `true` when derived from a single leader, `false` for a manual announcement.
    pub is_auto: bool,
    pub announced_at: Option<DateTime<FixedOffset>>,
}

/// Resolved result of one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationOutcome {
    pub location_id: String,
    pub total_votes: u64,
    pub max_votes: u64,
    /// Nominees assigned to the location, most votes first.
    pub standings: Vec<Standing>,
    pub top_nominees: Vec<String>,
    pub is_tie: bool,
    pub official_winner: Option<OfficialWinner>,
}

impl LocationOutcome {
    /// An ended cycle's tie that nobody has broken yet.
    #[must_use]
    pub const fn needs_tie_break(&self, phase: CyclePhase) -> bool {
        self.is_tie && self.official_winner.is_none() && phase.has_ended()
    }

    #[must_use]
    pub fn standing(&self, nominee_id: &str) -> Option<&Standing> {
        self.standings.iter().find(|s| s.nominee_id == nominee_id)
    }
}

/// Why a manual announcement was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnouncementRejection {
    #[error("Winner can only be announced after the voting cycle has ended")]
    NotEnded,
    #[error("Location is not part of this vote")]
    UnknownLocation,
    #[error("Nominee is not part of this vote")]
    UnknownNominee,
    #[error("No votes have been cast in this store")]
    NoVotes,
    #[error("Manual winner selection is only allowed when there is a tie in this store")]
    NoTie,
    #[error("Nominee is not assigned to this store")]
    NotAssociated,
    #[error("Only nominees with the highest votes in this store can be announced as winner")]
    NotInTopGroup,
}

/// Resolve one location. Returns `None` if the location is not part of the tally.
#[must_use]
pub fn resolve_location(
    tally: &Tally,
    location_id: &str,
    record: Option<&WinnerRecordRef>,
    phase: CyclePhase,
) -> Option<LocationOutcome> {
    let location = tally.location(location_id)?;

    let mut standings: Vec<Standing> = tally
        .nominees
        .iter()
        .filter_map(|n| {
            n.at_location(location_id).map(|s| Standing {
                nominee_id: n.nominee_id.clone(),
                location_votes: s.votes,
                location_points: s.points,
                location_percentage: s.percentage,
                is_top: false,
            })
        })
        .collect();

    let max_votes = standings.iter().map(|s| s.location_votes).max().unwrap_or(0);
    for s in &mut standings {
        s.is_top = max_votes > 0 && s.location_votes == max_votes;
    }
    // Stable: equal counts keep cycle nominee order.
    standings.sort_by(|a, b| b.location_votes.cmp(&a.location_votes));

    let top_nominees: Vec<String> = standings
        .iter()
        .filter(|s| s.is_top)
        .map(|s| s.nominee_id.clone())
        .collect();
    let is_tie = max_votes > 0 && top_nominees.len() > 1;

    let official_winner = match record {
        // A record whose nominee no longer stands here is ignored.
        Some(r) => standings
            .iter()
            .any(|s| s.nominee_id == r.employee_id)
            .then(|| OfficialWinner {
                nominee_id: r.employee_id.clone(),
                is_auto: false,
                announced_at: Some(r.announced_at),
            }),
        None if phase.has_ended() && top_nominees.len() == 1 => {
            top_nominees.first().map(|id| OfficialWinner {
                nominee_id: id.clone(),
                is_auto: true,
                announced_at: None,
            })
        }
        None => None,
    };

    Some(LocationOutcome {
        location_id: location_id.to_string(),
        total_votes: location.total_nominee_votes,
        max_votes,
        standings,
        top_nominees,
        is_tie,
        official_winner,
    })
}

/// Resolve every location of the tally, in cycle order.
#[must_use]
pub fn resolve_all(
    tally: &Tally,
    records: &[WinnerRecordRef],
    phase: CyclePhase,
) -> Vec<LocationOutcome> {
    tally
        .locations
        .iter()
        .filter_map(|l| {
            let record = records.iter().find(|r| r.location_id == l.location_id);
            resolve_location(tally, &l.location_id, record, phase)
        })
        .collect()
}

/// Check a manual announcement of `nominee_id` as winner of `location_id`.
///
/// Manual announcements only break genuine ties: a single leader, a location
/// without votes, or a nominee outside the top group are all refused.
pub fn validate_announcement(
    tally: &Tally,
    phase: CyclePhase,
    location_id: &str,
    nominee_id: &str,
) -> Result<(), AnnouncementRejection> {
    if !phase.has_ended() {
        return Err(AnnouncementRejection::NotEnded);
    }
    if tally.location(location_id).is_none() {
        return Err(AnnouncementRejection::UnknownLocation);
    }
    if tally.nominee(nominee_id).is_none() {
        return Err(AnnouncementRejection::UnknownNominee);
    }
    // Existing records do not influence the top group.
    let outcome = resolve_location(tally, location_id, None, phase)
        .ok_or(AnnouncementRejection::UnknownLocation)?;

    if outcome.max_votes == 0 {
        return Err(AnnouncementRejection::NoVotes);
    }
    if !outcome.is_tie {
        return Err(AnnouncementRejection::NoTie);
    }
    let standing = outcome
        .standing(nominee_id)
        .ok_or(AnnouncementRejection::NotAssociated)?;
    if !standing.is_top {
        return Err(AnnouncementRejection::NotInTopGroup);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tally::engine::tally;
    use crate::tally::engine::tests::{ballot, location, nominee, two_store_cycle};
    use crate::tally::engine::{BallotRef, CycleSnapshot};
    use chrono::Utc;

    fn one_store(counts: &[(&str, usize)]) -> Tally {
        let cycle = CycleSnapshot {
            locations: vec![location("l1")],
            voter_ids: vec![],
            nominees: counts.iter().map(|(id, _)| nominee(id, &["l1"])).collect(),
            vote_points: 1,
        };
        let mut ballots = Vec::new();
        for &(id, count) in counts {
            for i in 0..count {
                ballots.push(ballot(&format!("{id}-{i}"), &[id]));
            }
        }
        tally(&cycle, &ballots)
    }

    fn record(location_id: &str, employee_id: &str) -> WinnerRecordRef {
        WinnerRecordRef {
            location_id: location_id.to_string(),
            employee_id: employee_id.to_string(),
            announced_at: Utc::now().into(),
        }
    }

    /// N1 leads L1 with 2 of 3 votes. The tie variant has V2 pick N2 and
    /// V3 abstain, leaving N1 and N2 level at 1 each.
    fn end_to_end_ballots(tie: bool) -> Vec<BallotRef> {
        if tie {
            vec![
                ballot("v1", &["n1"]),
                ballot("v2", &["n2"]),
                ballot("v4", &["n3"]),
            ]
        } else {
            vec![
                ballot("v1", &["n1"]),
                ballot("v2", &["n1"]),
                ballot("v3", &["n2"]),
                ballot("v4", &["n3"]),
            ]
        }
    }

    #[test]
    fn test_tie_detected() {
        let t = one_store(&[("a", 3), ("b", 3), ("c", 1)]);
        let outcome = resolve_location(&t, "l1", None, CyclePhase::Ended).unwrap();

        assert_eq!(outcome.max_votes, 3);
        assert!(outcome.is_tie);
        assert_eq!(outcome.top_nominees, vec!["a", "b"]);
        assert!(outcome.official_winner.is_none());
        assert!(outcome.needs_tie_break(CyclePhase::Ended));
    }

    #[test]
    fn test_single_leader_auto_winner_once_ended() {
        let t = one_store(&[("a", 5), ("b", 2)]);

        let ended = resolve_location(&t, "l1", None, CyclePhase::Ended).unwrap();
        assert!(!ended.is_tie);
        assert_eq!(
            ended.official_winner,
            Some(OfficialWinner {
                nominee_id: "a".to_string(),
                is_auto: true,
                announced_at: None,
            })
        );

        let active = resolve_location(&t, "l1", None, CyclePhase::Active).unwrap();
        assert_eq!(active.top_nominees, vec!["a"]);
        assert!(active.official_winner.is_none());
    }

    #[test]
    fn test_no_votes_no_top_group() {
        let t = one_store(&[("a", 0), ("b", 0)]);
        let outcome = resolve_location(&t, "l1", None, CyclePhase::Ended).unwrap();

        assert_eq!(outcome.max_votes, 0);
        assert!(outcome.top_nominees.is_empty());
        assert!(!outcome.is_tie);
        assert!(outcome.official_winner.is_none());
        assert!(outcome.standings.iter().all(|s| !s.is_top));
    }

    #[test]
    fn test_stored_record_wins_over_auto() {
        let t = one_store(&[("a", 3), ("b", 3)]);
        let r = record("l1", "b");
        let outcome = resolve_location(&t, "l1", Some(&r), CyclePhase::Ended).unwrap();

        let winner = outcome.official_winner.unwrap();
        assert_eq!(winner.nominee_id, "b");
        assert!(!winner.is_auto);
        assert_eq!(winner.announced_at, Some(r.announced_at));
    }

    #[test]
    fn test_record_for_nominee_not_standing_here_is_ignored() {
        let t = one_store(&[("a", 3), ("b", 1)]);
        let outcome =
            resolve_location(&t, "l1", Some(&record("l1", "ghost")), CyclePhase::Ended).unwrap();

        assert!(!outcome.is_tie);
        assert!(outcome.official_winner.is_none());
    }

    #[test]
    fn test_standings_sorted_by_votes() {
        let t = one_store(&[("a", 1), ("b", 4), ("c", 2)]);
        let outcome = resolve_location(&t, "l1", None, CyclePhase::Active).unwrap();
        let order: Vec<_> = outcome.standings.iter().map(|s| s.nominee_id.as_str()).collect();

        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_end_to_end_winners() {
        let t = tally(&two_store_cycle(), &end_to_end_ballots(false));
        let outcomes = resolve_all(&t, &[], CyclePhase::Ended);

        assert_eq!(outcomes.len(), 2);
        let l1 = &outcomes[0];
        assert!(!l1.is_tie);
        assert_eq!(l1.total_votes, 3);
        assert_eq!(l1.official_winner.as_ref().unwrap().nominee_id, "n1");
        assert!(l1.official_winner.as_ref().unwrap().is_auto);

        let l2 = &outcomes[1];
        assert_eq!(l2.total_votes, 1);
        assert_eq!(l2.official_winner.as_ref().unwrap().nominee_id, "n3");
    }

    #[test]
    fn test_tie_scenario_announcements() {
        let t = tally(&two_store_cycle(), &end_to_end_ballots(true));
        let l1 = resolve_location(&t, "l1", None, CyclePhase::Ended).unwrap();

        assert_eq!(l1.max_votes, 1);
        assert_eq!(l1.total_votes, 2);
        assert_eq!(l1.top_nominees, vec!["n1", "n2"]);
        assert!(l1.is_tie);
        assert!(l1.official_winner.is_none());

        assert_eq!(validate_announcement(&t, CyclePhase::Ended, "l1", "n1"), Ok(()));
        assert_eq!(
            validate_announcement(&t, CyclePhase::Ended, "l1", "n3"),
            Err(AnnouncementRejection::NotAssociated)
        );
    }

    #[test]
    fn test_announcement_refused_for_single_leader() {
        let t = one_store(&[("a", 5), ("b", 2)]);
        assert_eq!(
            validate_announcement(&t, CyclePhase::Ended, "l1", "a"),
            Err(AnnouncementRejection::NoTie)
        );
    }

    #[test]
    fn test_announcement_refused_without_votes() {
        let t = one_store(&[("a", 0), ("b", 0)]);
        assert_eq!(
            validate_announcement(&t, CyclePhase::Ended, "l1", "a"),
            Err(AnnouncementRejection::NoVotes)
        );
    }

    #[test]
    fn test_announcement_refused_outside_top_group() {
        let t = one_store(&[("a", 3), ("b", 3), ("c", 1)]);
        assert_eq!(
            validate_announcement(&t, CyclePhase::Ended, "l1", "c"),
            Err(AnnouncementRejection::NotInTopGroup)
        );
    }

    #[test]
    fn test_announcement_refused_before_end_and_for_unknown_ids() {
        let t = one_store(&[("a", 3), ("b", 3)]);

        assert_eq!(
            validate_announcement(&t, CyclePhase::Active, "l1", "a"),
            Err(AnnouncementRejection::NotEnded)
        );
        assert_eq!(
            validate_announcement(&t, CyclePhase::Ended, "l9", "a"),
            Err(AnnouncementRejection::UnknownLocation)
        );
        assert_eq!(
            validate_announcement(&t, CyclePhase::Ended, "l1", "zz"),
            Err(AnnouncementRejection::UnknownNominee)
        );
    }
}
