//! Repositories for database operations.

pub mod ballot;
pub mod employee;
pub mod location;
pub mod vote_invite;
pub mod voting_cycle;

pub use ballot::{BallotRepository, BallotStore, InsertOutcome, NewBallot, SharedBallotStore};
pub use employee::EmployeeRepository;
pub use location::LocationRepository;
pub use vote_invite::VoteInviteRepository;
pub use voting_cycle::VotingCycleRepository;
