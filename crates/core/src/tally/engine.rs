//! Vote counting.
//!
//! [`tally`] turns a cycle snapshot and its ballots into per-nominee and
//! per-location statistics. It does no I/O and never fails: an empty ballot
//! list yields all-zero statistics.
//!
//! A nominee's votes count toward every cycle location the *nominee* is
//! assigned to, regardless of where the voter works.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// A participating location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRef {
    pub id: String,
    pub name: String,
    pub code: String,
}

/// A nominee with the locations it is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeRef {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_code: String,
    /// All assigned locations, including ones outside the cycle.
    #[serde(skip)]
    pub location_ids: Vec<String>,
}

/// The selections of one ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotRef {
    pub voter_id: String,
    pub nominee_ids: Vec<String>,
}

/// Everything the engine needs to know about a cycle.
#[derive(Debug, Clone)]
pub struct CycleSnapshot {
    /// Cycle locations in display order.
    pub locations: Vec<LocationRef>,
    pub voter_ids: Vec<String>,
    pub nominees: Vec<NomineeRef>,
    pub vote_points: u32,
}

/// One nominee's result at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeLocationStat {
    pub location_id: String,
    pub votes: u64,
    pub points: u64,
    pub percentage: f64,
}

/// One nominee's result across the cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeStat {
    pub nominee_id: String,
    pub total_votes: u64,
    pub total_points: u64,
    pub overall_percentage: f64,
    /// One entry per cycle location the nominee is assigned to, in cycle order.
    pub by_location: Vec<NomineeLocationStat>,
}

impl NomineeStat {
    /// Result at `location_id`, if the nominee is assigned there.
    #[must_use]
    pub fn at_location(&self, location_id: &str) -> Option<&NomineeLocationStat> {
        self.by_location.iter().find(|s| s.location_id == location_id)
    }
}

/// Totals for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStat {
    pub location_id: String,
    /// Sum of the location votes of every nominee assigned here.
    pub total_nominee_votes: u64,
}

/// Output of [`tally`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub total_voters: u64,
    pub total_ballots: u64,
    pub total_selections: u64,
    pub vote_points: u32,
    /// Every cycle nominee, in cycle order.
    pub nominees: Vec<NomineeStat>,
    /// Every cycle location, in cycle order.
    pub locations: Vec<LocationStat>,
}

impl Tally {
    #[must_use]
    pub fn nominee(&self, nominee_id: &str) -> Option<&NomineeStat> {
        self.nominees.iter().find(|n| n.nominee_id == nominee_id)
    }

    #[must_use]
    pub fn location(&self, location_id: &str) -> Option<&LocationStat> {
        self.locations.iter().find(|l| l.location_id == location_id)
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0.
#[allow(clippy::cast_precision_loss)]
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Count the ballots of a cycle.
///
/// A nominee listed twice on one ballot still gets a single vote from it, and
/// `total_selections` counts that ballot's distinct selections. Selections of
/// IDs that are not cycle nominees add to `total_selections` only.
#[must_use]
pub fn tally(cycle: &CycleSnapshot, ballots: &[BallotRef]) -> Tally {
    let points = u64::from(cycle.vote_points);
    let cycle_locations: HashSet<&str> = cycle.locations.iter().map(|l| l.id.as_str()).collect();

    let index: HashMap<&str, usize> = cycle
        .nominees
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut votes = vec![0_u64; cycle.nominees.len()];
    let mut total_selections = 0_u64;

    for ballot in ballots {
        let mut seen = HashSet::new();
        for nominee_id in &ballot.nominee_ids {
            if !seen.insert(nominee_id.as_str()) {
                continue;
            }
            total_selections += 1;
            if let Some(&i) = index.get(nominee_id.as_str()) {
                votes[i] += 1;
            }
        }
    }

    // Location totals: each nominee's votes count at each cycle location it is assigned to.
    let mut location_totals: HashMap<&str, u64> =
        cycle.locations.iter().map(|l| (l.id.as_str(), 0)).collect();
    for (nominee, &count) in cycle.nominees.iter().zip(&votes) {
        for location_id in assigned_cycle_locations(nominee, &cycle_locations) {
            if let Some(total) = location_totals.get_mut(location_id) {
                *total += count;
            }
        }
    }

    let nominees = cycle
        .nominees
        .iter()
        .zip(&votes)
        .map(|(nominee, &count)| {
            let assigned: HashSet<&str> = assigned_cycle_locations(nominee, &cycle_locations)
                .into_iter()
                .collect();
            let by_location = cycle
                .locations
                .iter()
                .filter(|l| assigned.contains(l.id.as_str()))
                .map(|l| {
                    let total = location_totals.get(l.id.as_str()).copied().unwrap_or(0);
                    NomineeLocationStat {
                        location_id: l.id.clone(),
                        votes: count,
                        points: count * points,
                        percentage: percentage(count, total),
                    }
                })
                .collect();

            NomineeStat {
                nominee_id: nominee.id.clone(),
                total_votes: count,
                total_points: count * points,
                overall_percentage: percentage(count, total_selections),
                by_location,
            }
        })
        .collect();

    let locations = cycle
        .locations
        .iter()
        .map(|l| LocationStat {
            location_id: l.id.clone(),
            total_nominee_votes: location_totals.get(l.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    Tally {
        total_voters: cycle.voter_ids.len() as u64,
        total_ballots: ballots.len() as u64,
        total_selections,
        vote_points: cycle.vote_points,
        nominees,
        locations,
    }
}

/// The nominee's assigned locations that belong to the cycle, de-duplicated.
fn assigned_cycle_locations<'a>(
    nominee: &'a NomineeRef,
    cycle_locations: &HashSet<&str>,
) -> Vec<&'a str> {
    let mut assigned: Vec<&str> = Vec::new();
    for id in &nominee.location_ids {
        if cycle_locations.contains(id.as_str()) && !assigned.contains(&id.as_str()) {
            assigned.push(id.as_str());
        }
    }
    assigned
}
