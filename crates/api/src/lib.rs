//! HTTP API layer for voting-rs.
//!
//! - **Endpoints**: cycle administration, ballots, invites, results and notifications
//! - **State**: the services shared by every handler
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod response;
pub mod state;

pub use endpoints::router;
pub use state::AppState;
