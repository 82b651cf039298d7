//! Business logic services.

#![allow(missing_docs)]

pub mod ballot;
pub mod email;
pub mod invite;
pub mod notification;
pub mod results;
pub mod snapshot;
pub mod voting_cycle;

pub use ballot::{
    BallotPaper, BallotService, CastBallotInput, CastReceipt, CheckEmployeeInput, Eligibility,
    NomineeCard, VoterView,
};
pub use email::{DisabledMailer, EmailMessage, Mailer, RecordingMailer, SharedMailer, SmtpMailer};
pub use invite::{
    Deliveries, DeliveryFailure, InviteCastInput, InviteReport, InviteService, SendInvitesInput,
    SendMode,
};
pub use notification::{NotificationReport, NotificationService, NotifyLocationInput};
pub use results::{
    AnnouncedWinner, CycleMeta, CycleReport, CycleWinners, HistoryEntry, LocationResult,
    LocationWinnerSummary, NomineeStanding, OfficialWinners, ResolvedCycle, ResultsService,
    WinnerView,
};
pub use snapshot::{LoadedCycle, SnapshotLoader};
pub use voting_cycle::{
    CycleInput, CycleSummary, CycleView, VoterRoster, VoterStatus, VotingCycleService,
};
