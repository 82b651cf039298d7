//! Database entities.
//!
//! Reference sets (a cycle's locations, voters and nominees, an employee's
//! locations, a ballot's nominees) are stored as JSON arrays of IDs, the way
//! the cycle document embeds them.

pub mod ballot;
pub mod cycle_winner;
pub mod employee;
pub mod location;
pub mod vote_invite;
pub mod voting_cycle;

pub use ballot::Entity as Ballot;
pub use cycle_winner::Entity as CycleWinner;
pub use employee::Entity as Employee;
pub use location::Entity as Location;
pub use vote_invite::Entity as VoteInvite;
pub use voting_cycle::Entity as VotingCycle;

use serde_json::Value as JsonValue;
use voting_common::{AppError, AppResult};

/// Decode a JSON array of IDs stored in `column`.
pub(crate) fn decode_ids(value: &JsonValue, column: &str) -> AppResult<Vec<String>> {
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::Internal(format!("Invalid {column} column: {e}")))
}

/// Encode a list of IDs for a JSON column.
#[must_use]
pub fn encode_ids(ids: &[String]) -> JsonValue {
    JsonValue::from(ids.to_vec())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_round_trip_through_json_column() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let encoded = encode_ids(&ids);
        assert_eq!(encoded, json!(["a", "b"]));
        assert_eq!(decode_ids(&encoded, "ids").unwrap(), ids);
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let result = decode_ids(&json!({"id": 1}), "voter_ids");
        assert!(matches!(result, Err(AppError::Internal(msg)) if msg.contains("voter_ids")));
    }
}
