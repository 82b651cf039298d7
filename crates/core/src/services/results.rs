//! Results, winners and manual tie-break announcements.

use chrono::{DateTime, FixedOffset, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use voting_common::{AppError, AppResult};
use voting_db::{entities::voting_cycle, repositories::VotingCycleRepository};

use crate::services::snapshot::{LoadedCycle, SnapshotLoader};
use crate::tally::{
    CyclePhase, LocationOutcome, LocationRef, NomineeRef, NomineeStat, OfficialWinner, Standing,
    Tally, WinnerRecordRef, resolve_all, validate_announcement,
};

/// Cycle header shared by every results view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleMeta {
    pub id: String,
    pub name: String,
    pub start_at: DateTime<FixedOffset>,
    pub end_at: DateTime<FixedOffset>,
    pub locations: Vec<LocationRef>,
    pub vote_points: i32,
    pub max_votes_per_voter: i32,
    pub total_voters: u64,
    pub total_ballots: u64,
    pub total_selections: u64,
    pub has_started: bool,
    pub has_ended: bool,
    pub is_active: bool,
    pub results_notified_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationVotes {
    pub location_id: String,
    pub name: String,
    pub code: String,
    pub votes: u64,
    pub points: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeReport {
    #[serde(flatten)]
    pub nominee: NomineeRef,
    pub locations: Vec<LocationRef>,
    pub total_votes: u64,
    pub total_points: u64,
    pub percentage: f64,
    pub votes_by_location: Vec<LocationVotes>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub location_id: String,
    pub name: String,
    pub code: String,
    pub total_nominee_votes: u64,
}

/// Full report of one cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub vote: CycleMeta,
    pub nominees: Vec<NomineeReport>,
    pub location_summary: Vec<LocationSummary>,
}

/// A nominee's standing at one location.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeStanding {
    #[serde(flatten)]
    pub nominee: NomineeRef,
    pub total_votes: u64,
    pub total_points: u64,
    pub overall_percentage: f64,
    pub location_votes: u64,
    pub location_points: u64,
    pub location_percentage: f64,
    pub is_top: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerView {
    #[serde(flatten)]
    pub standing: NomineeStanding,
    pub is_auto: bool,
    pub announced_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResult {
    pub location_id: String,
    pub name: String,
    pub code: String,
    pub total_votes: u64,
    pub top_nominees: Vec<NomineeStanding>,
    pub nominees: Vec<NomineeStanding>,
    pub official_winner: Option<WinnerView>,
    pub is_tie: bool,
    pub needs_tie_break: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleWinners {
    pub vote: CycleMeta,
    pub locations: Vec<LocationResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialLocationWinner {
    pub location_id: String,
    pub name: String,
    pub code: String,
    pub total_votes: u64,
    pub winner: Option<WinnerView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialWinners {
    pub vote: CycleMeta,
    pub locations: Vec<OfficialLocationWinner>,
}

/// Winner and ranking of one location, as used by history and result emails.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationWinnerSummary {
    pub location_id: String,
    pub name: String,
    pub code: String,
    pub total_votes: u64,
    pub winner: Option<WinnerView>,
    pub nominees: Vec<NomineeStanding>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub vote: CycleMeta,
    pub locations: Vec<LocationWinnerSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncedWinner {
    pub location_id: String,
    pub winner: WinnerView,
}

/// A loaded cycle with its tally and per-location outcomes.
#[derive(Debug, Clone)]
pub struct ResolvedCycle {
    pub loaded: LoadedCycle,
    pub tally: Tally,
    pub phase: CyclePhase,
    pub outcomes: Vec<LocationOutcome>,
}

impl ResolvedCycle {
    #[must_use]
    pub fn meta(&self) -> CycleMeta {
        let cycle = &self.loaded.cycle;
        CycleMeta {
            id: cycle.id.clone(),
            name: cycle.name.clone(),
            start_at: cycle.start_at,
            end_at: cycle.end_at,
            locations: self.loaded.snapshot.locations.clone(),
            vote_points: cycle.vote_points,
            max_votes_per_voter: cycle.max_votes_per_voter,
            total_voters: self.tally.total_voters,
            total_ballots: self.tally.total_ballots,
            total_selections: self.tally.total_selections,
            has_started: self.phase.has_started(),
            has_ended: self.phase.has_ended(),
            is_active: self.phase.is_active(),
            results_notified_at: cycle.results_notified_at,
        }
    }

    /// An ended location with a tie and no announced winner.
    #[must_use]
    pub fn has_unresolved_tie(&self) -> bool {
        self.outcomes.iter().any(|o| o.needs_tie_break(self.phase))
    }

    fn standing_view(&self, standing: &Standing) -> Option<NomineeStanding> {
        let nominee = self.loaded.nominee(&standing.nominee_id)?;
        let stat = self.tally.nominee(&standing.nominee_id)?;
        Some(NomineeStanding {
            nominee: nominee.clone(),
            total_votes: stat.total_votes,
            total_points: stat.total_points,
            overall_percentage: stat.overall_percentage,
            location_votes: standing.location_votes,
            location_points: standing.location_points,
            location_percentage: standing.location_percentage,
            is_top: standing.is_top,
        })
    }

    fn standings(&self, outcome: &LocationOutcome) -> Vec<NomineeStanding> {
        outcome
            .standings
            .iter()
            .filter_map(|s| self.standing_view(s))
            .collect()
    }

    fn winner_view(&self, outcome: &LocationOutcome) -> Option<WinnerView> {
        let official: &OfficialWinner = outcome.official_winner.as_ref()?;
        let standing = outcome.standing(&official.nominee_id)?;
        Some(WinnerView {
            standing: self.standing_view(standing)?,
            is_auto: official.is_auto,
            announced_at: official.announced_at,
        })
    }

    fn location_header(&self, outcome: &LocationOutcome) -> (String, String) {
        self.loaded
            .location(&outcome.location_id)
            .map(|l| (l.name.clone(), l.code.clone()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn outcome(&self, location_id: &str) -> Option<&LocationOutcome> {
        self.outcomes.iter().find(|o| o.location_id == location_id)
    }

    /// Per-location winner and ranking, in cycle order.
    #[must_use]
    pub fn summaries(&self) -> Vec<LocationWinnerSummary> {
        self.outcomes
            .iter()
            .map(|o| {
                let (name, code) = self.location_header(o);
                LocationWinnerSummary {
                    location_id: o.location_id.clone(),
                    name,
                    code,
                    total_votes: o.total_votes,
                    winner: self.winner_view(o),
                    nominees: self.standings(o),
                }
            })
            .collect()
    }

    fn report(&self) -> CycleReport {
        let nominees = self
            .loaded
            .snapshot
            .nominees
            .iter()
            .filter_map(|n| self.tally.nominee(&n.id).map(|stat| self.nominee_report(n, stat)))
            .collect();

        let location_summary = self
            .tally
            .locations
            .iter()
            .filter_map(|stat| {
                let location = self.loaded.location(&stat.location_id)?;
                Some(LocationSummary {
                    location_id: location.id.clone(),
                    name: location.name.clone(),
                    code: location.code.clone(),
                    total_nominee_votes: stat.total_nominee_votes,
                })
            })
            .collect();

        CycleReport {
            vote: self.meta(),
            nominees,
            location_summary,
        }
    }

    fn nominee_report(&self, nominee: &NomineeRef, stat: &NomineeStat) -> NomineeReport {
        let votes_by_location: Vec<LocationVotes> = stat
            .by_location
            .iter()
            .filter_map(|s| {
                let location = self.loaded.location(&s.location_id)?;
                Some(LocationVotes {
                    location_id: location.id.clone(),
                    name: location.name.clone(),
                    code: location.code.clone(),
                    votes: s.votes,
                    points: s.points,
                    percentage: s.percentage,
                })
            })
            .collect();
        let locations = votes_by_location
            .iter()
            .map(|v| LocationRef {
                id: v.location_id.clone(),
                name: v.name.clone(),
                code: v.code.clone(),
            })
            .collect();

        NomineeReport {
            nominee: nominee.clone(),
            locations,
            total_votes: stat.total_votes,
            total_points: stat.total_points,
            percentage: stat.overall_percentage,
            votes_by_location,
        }
    }

    fn winners(&self) -> CycleWinners {
        let locations = self
            .outcomes
            .iter()
            .map(|o| {
                let (name, code) = self.location_header(o);
                let nominees = self.standings(o);
                LocationResult {
                    location_id: o.location_id.clone(),
                    name,
                    code,
                    total_votes: o.total_votes,
                    top_nominees: nominees.iter().filter(|s| s.is_top).cloned().collect(),
                    nominees,
                    official_winner: self.winner_view(o),
                    is_tie: o.is_tie,
                    needs_tie_break: o.needs_tie_break(self.phase),
                }
            })
            .collect();

        CycleWinners {
            vote: self.meta(),
            locations,
        }
    }

    fn official_winners(&self) -> OfficialWinners {
        let locations = self
            .outcomes
            .iter()
            .map(|o| {
                let (name, code) = self.location_header(o);
                OfficialLocationWinner {
                    location_id: o.location_id.clone(),
                    name,
                    code,
                    total_votes: o.total_votes,
                    winner: self.winner_view(o),
                }
            })
            .collect();

        OfficialWinners {
            vote: self.meta(),
            locations,
        }
    }
}

/// Results service.
#[derive(Clone)]
pub struct ResultsService {
    cycle_repo: VotingCycleRepository,
    loader: SnapshotLoader,
}

impl ResultsService {
    #[must_use]
    pub const fn new(cycle_repo: VotingCycleRepository, loader: SnapshotLoader) -> Self {
        Self { cycle_repo, loader }
    }

    /// Load, tally and resolve a cycle as of now.
    pub async fn resolve(&self, cycle_id: &str) -> AppResult<ResolvedCycle> {
        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        self.resolve_cycle(cycle).await
    }

    /// Tally and resolve an already fetched cycle as of now.
    pub async fn resolve_cycle(&self, cycle: voting_cycle::Model) -> AppResult<ResolvedCycle> {
        self.resolve_at(cycle, Utc::now().fixed_offset()).await
    }

    async fn resolve_at(
        &self,
        cycle: voting_cycle::Model,
        now: DateTime<FixedOffset>,
    ) -> AppResult<ResolvedCycle> {
        let phase = CyclePhase::at(cycle.start_at, cycle.end_at, now);
        let records: Vec<WinnerRecordRef> = self
            .cycle_repo
            .find_winners(&cycle.id)
            .await?
            .into_iter()
            .map(|w| WinnerRecordRef {
                location_id: w.location_id,
                employee_id: w.employee_id,
                announced_at: w.announced_at,
            })
            .collect();

        let loaded = self.loader.load(cycle).await?;
        let tally = loaded.tally();
        let outcomes = resolve_all(&tally, &records, phase);

        Ok(ResolvedCycle {
            loaded,
            tally,
            phase,
            outcomes,
        })
    }

    /// Totals per nominee and per location.
    pub async fn report(&self, cycle_id: &str) -> AppResult<CycleReport> {
        Ok(self.resolve(cycle_id).await?.report())
    }

    /// Rankings, ties and winners per location.
    pub async fn winners(&self, cycle_id: &str) -> AppResult<CycleWinners> {
        Ok(self.resolve(cycle_id).await?.winners())
    }

    /// Only the winner of each location.
    pub async fn official_winners(&self, cycle_id: &str) -> AppResult<OfficialWinners> {
        Ok(self.resolve(cycle_id).await?.official_winners())
    }

    /// Winners of every ended cycle, most recently ended first.
    pub async fn history(&self) -> AppResult<Vec<HistoryEntry>> {
        let now = Utc::now().fixed_offset();
        let cycles = self.cycle_repo.find_ended_before(now).await?;

        let resolved = try_join_all(cycles.into_iter().map(|c| self.resolve_at(c, now))).await?;

        Ok(resolved
            .iter()
            .map(|r| HistoryEntry {
                vote: r.meta(),
                locations: r.summaries(),
            })
            .collect())
    }

    /// Announce the winner of a tied location.
    ///
    /// Replaces any earlier announcement for the same location.
    pub async fn announce(
        &self,
        cycle_id: &str,
        location_id: &str,
        nominee_id: &str,
    ) -> AppResult<AnnouncedWinner> {
        let resolved = self.resolve(cycle_id).await?;
        validate_announcement(&resolved.tally, resolved.phase, location_id, nominee_id)?;

        let announced_at = Utc::now().fixed_offset();
        self.cycle_repo
            .upsert_winner(cycle_id, location_id, nominee_id, announced_at)
            .await?;

        tracing::info!(
            cycle_id = %cycle_id,
            location_id = %location_id,
            nominee_id = %nominee_id,
            "Winner announced"
        );

        let standing = resolved
            .outcome(location_id)
            .and_then(|o| o.standing(nominee_id))
            .and_then(|s| resolved.standing_view(s))
            .ok_or_else(|| AppError::Internal("Announced nominee has no standing".to_string()))?;

        Ok(AnnouncedWinner {
            location_id: location_id.to_string(),
            winner: WinnerView {
                standing,
                is_auto: false,
                announced_at: Some(announced_at),
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::snapshot::tests::{store_with, test_cycle, test_location, test_nominees};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use voting_db::entities::cycle_winner;
    use voting_db::repositories::{EmployeeRepository, LocationRepository, SharedBallotStore};

    fn service(db: sea_orm::DatabaseConnection, ballots: SharedBallotStore) -> ResultsService {
        let db = Arc::new(db);
        ResultsService::new(
            VotingCycleRepository::new(Arc::clone(&db)),
            SnapshotLoader::new(
                LocationRepository::new(Arc::clone(&db)),
                EmployeeRepository::new(Arc::clone(&db)),
                ballots,
            ),
        )
    }

    fn mock(
        cycle: voting_cycle::Model,
        winners: Vec<cycle_winner::Model>,
    ) -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![cycle]])
            .append_query_results([winners])
            .append_query_results([vec![test_location("l1"), test_location("l2")]])
            .append_query_results([test_nominees()])
    }

    fn winner_record(location_id: &str, employee_id: &str) -> cycle_winner::Model {
        cycle_winner::Model {
            cycle_id: "c1".to_string(),
            location_id: location_id.to_string(),
            employee_id: employee_id.to_string(),
            announced_at: Utc::now().fixed_offset(),
        }
    }

    const TIED: [(&str, &str); 4] = [("v1", "n1"), ("v2", "n2"), ("v3", "n3"), ("v4", "n1")];

    #[tokio::test]
    async fn test_report_totals() {
        let store = store_with("c1", &[("v1", "n1"), ("v2", "n1"), ("v3", "n2"), ("v4", "n3")]).await;
        let db = mock(test_cycle("c1", false), vec![]).into_connection();

        let report = service(db, store).report("c1").await.unwrap();

        assert_eq!(report.vote.total_ballots, 4);
        assert_eq!(report.vote.total_selections, 4);
        assert!(report.vote.is_active);
        let n1 = &report.nominees[0];
        assert_eq!(n1.nominee.id, "n1");
        assert_eq!(n1.total_votes, 2);
        assert_eq!(n1.total_points, 4);
        assert_eq!(n1.percentage, 50.0);
        assert_eq!(n1.votes_by_location.len(), 1);
        assert!((n1.votes_by_location[0].percentage - 66.67).abs() < 0.01);
        assert_eq!(report.location_summary[0].total_nominee_votes, 3);
        assert_eq!(report.location_summary[1].total_nominee_votes, 1);
    }

    #[tokio::test]
    async fn test_winners_auto_after_end() {
        let store = store_with("c1", &[("v1", "n1"), ("v2", "n1"), ("v3", "n2"), ("v4", "n3")]).await;
        let db = mock(test_cycle("c1", true), vec![]).into_connection();

        let winners = service(db, store).winners("c1").await.unwrap();

        let l1 = &winners.locations[0];
        assert!(!l1.is_tie);
        let winner = l1.official_winner.as_ref().unwrap();
        assert_eq!(winner.standing.nominee.id, "n1");
        assert!(winner.is_auto);
        assert_eq!(winners.locations[1].official_winner.as_ref().unwrap().standing.nominee.id, "n3");
    }

    #[tokio::test]
    async fn test_winners_no_auto_winner_while_active() {
        let store = store_with("c1", &[("v1", "n1")]).await;
        let db = mock(test_cycle("c1", false), vec![]).into_connection();

        let winners = service(db, store).winners("c1").await.unwrap();

        assert!(winners.locations[0].official_winner.is_none());
        assert_eq!(winners.locations[0].top_nominees.len(), 1);
    }

    #[tokio::test]
    async fn test_tie_needs_tie_break_then_manual_winner() {
        let store = store_with("c1", &TIED[..3]).await;
        let db = mock(test_cycle("c1", true), vec![]).into_connection();
        let winners = service(db, store.clone()).winners("c1").await.unwrap();

        let l1 = &winners.locations[0];
        assert!(l1.is_tie);
        assert!(l1.needs_tie_break);
        assert!(l1.official_winner.is_none());

        let db = mock(test_cycle("c1", true), vec![winner_record("l1", "n2")]).into_connection();
        let winners = service(db, store).winners("c1").await.unwrap();
        let l1 = &winners.locations[0];
        let winner = l1.official_winner.as_ref().unwrap();
        assert_eq!(winner.standing.nominee.id, "n2");
        assert!(!winner.is_auto);
        assert!(winner.announced_at.is_some());
        assert!(!l1.needs_tie_break);
    }

    #[tokio::test]
    async fn test_announce_tie() {
        let store = store_with("c1", &TIED[..3]).await;
        let db = mock(test_cycle("c1", true), vec![])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let announced = service(db, store).announce("c1", "l1", "n2").await.unwrap();

        assert_eq!(announced.location_id, "l1");
        assert_eq!(announced.winner.standing.nominee.id, "n2");
        assert!(!announced.winner.is_auto);
    }

    #[tokio::test]
    async fn test_announce_rejected_without_tie() {
        let store = store_with("c1", &TIED).await;
        let db = mock(test_cycle("c1", true), vec![]).into_connection();

        let result = service(db, store).announce("c1", "l1", "n1").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_announce_rejected_before_end() {
        let store = store_with("c1", &TIED[..3]).await;
        let db = mock(test_cycle("c1", false), vec![]).into_connection();

        let result = service(db, store).announce("c1", "l1", "n1").await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("ended")));
    }

    #[tokio::test]
    async fn test_unknown_cycle() {
        let store = store_with("c1", &[]).await;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<voting_cycle::Model>::new()])
            .into_connection();

        let result = service(db, store).report("missing").await;

        assert!(matches!(result, Err(AppError::CycleNotFound(_))));
    }

    #[tokio::test]
    async fn test_history_lists_ended_cycles() {
        let store = store_with("c1", &[("v1", "n1")]).await;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_cycle("c1", true)]])
            .append_query_results([Vec::<cycle_winner::Model>::new()])
            .append_query_results([vec![test_location("l1"), test_location("l2")]])
            .append_query_results([test_nominees()])
            .into_connection();

        let history = service(db, store).history().await.unwrap();

        assert_eq!(history.len(), 1);
        assert!(history[0].vote.has_ended);
        let l1 = &history[0].locations[0];
        assert_eq!(l1.winner.as_ref().unwrap().standing.nominee.id, "n1");
        assert!(history[0].locations[1].winner.is_none());
    }
}
