//! Shared application state.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use voting_core::{
    BallotService, InviteService, NotificationService, ResultsService, SharedMailer,
    SnapshotLoader, VotingCycleService,
};
use voting_db::repositories::{
    EmployeeRepository, LocationRepository, SharedBallotStore, VoteInviteRepository,
    VotingCycleRepository,
};

/// Services available to every handler.
#[derive(Clone)]
pub struct AppState {
    pub cycle_service: VotingCycleService,
    pub ballot_service: BallotService,
    pub results_service: ResultsService,
    pub invite_service: InviteService,
    pub notification_service: NotificationService,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    ///
    /// The ballot store is passed separately so tests can substitute an
    /// in-memory store.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        ballot_store: SharedBallotStore,
        mailer: SharedMailer,
        client_url: &str,
    ) -> Self {
        let cycle_repo = VotingCycleRepository::new(Arc::clone(&db));
        let location_repo = LocationRepository::new(Arc::clone(&db));
        let employee_repo = EmployeeRepository::new(Arc::clone(&db));
        let invite_repo = VoteInviteRepository::new(db);

        let loader = SnapshotLoader::new(
            location_repo.clone(),
            employee_repo.clone(),
            ballot_store.clone(),
        );
        let results_service = ResultsService::new(cycle_repo.clone(), loader);

        let cycle_service = VotingCycleService::new(
            cycle_repo.clone(),
            location_repo.clone(),
            employee_repo.clone(),
            ballot_store.clone(),
            results_service.clone(),
        );
        let ballot_service = BallotService::new(
            cycle_repo.clone(),
            employee_repo.clone(),
            location_repo,
            ballot_store,
        );
        let invite_service = InviteService::new(
            cycle_repo.clone(),
            employee_repo.clone(),
            invite_repo,
            ballot_service.clone(),
            mailer.clone(),
            client_url,
        );
        let notification_service =
            NotificationService::new(cycle_repo, employee_repo, results_service.clone(), mailer);

        Self {
            cycle_service,
            ballot_service,
            results_service,
            invite_service,
            notification_service,
        }
    }
}
