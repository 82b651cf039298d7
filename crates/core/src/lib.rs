//! Core business logic for voting-rs.
//!
//! [`tally`] holds the pure counting and winner rules; [`services`] loads
//! cycles from storage, applies those rules and sends email.

pub mod services;
pub mod tally;

pub use services::*;
