//! ID and token generation utilities.

use rand::RngCore;
use ulid::Ulid;

/// Number of random bytes in an invite token.
const INVITE_TOKEN_BYTES: usize = 24;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are lexicographically sortable, so ballots and cycles listed by
    /// ID come back in creation order.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an unguessable invite token (48 hex characters).
    #[must_use]
    pub fn generate_invite_token(&self) -> String {
        let mut bytes = [0u8; INVITE_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}
