//! Vote tallying and winner resolution.
//!
//! Pure functions over a cycle snapshot and its ballots; the services load
//! the inputs and turn rejections into [`voting_common::AppError`]s.

pub mod engine;
pub mod lifecycle;
pub mod resolver;

pub use engine::{
    BallotRef, CycleSnapshot, LocationRef, LocationStat, NomineeLocationStat, NomineeRef,
    NomineeStat, Tally, tally,
};
pub use lifecycle::{
    Assignment, CycleDefinition, CyclePhase, CycleRuleViolation, Ineligible, check_selection,
    check_voter, normalize_ids,
};
pub use resolver::{
    AnnouncementRejection, LocationOutcome, OfficialWinner, Standing, WinnerRecordRef,
    resolve_all, resolve_location, validate_announcement,
};

use voting_common::AppError;

impl From<Ineligible> for AppError {
    fn from(reason: Ineligible) -> Self {
        match reason {
            Ineligible::NotAVoter => Self::Forbidden(reason.to_string()),
            Ineligible::AlreadyVoted => Self::Conflict(reason.to_string()),
            _ => Self::BadRequest(reason.to_string()),
        }
    }
}

impl From<AnnouncementRejection> for AppError {
    fn from(reason: AnnouncementRejection) -> Self {
        Self::Validation(reason.to_string())
    }
}

impl From<CycleRuleViolation> for AppError {
    fn from(reason: CycleRuleViolation) -> Self {
        Self::Validation(reason.to_string())
    }
}
