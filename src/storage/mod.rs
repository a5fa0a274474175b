//! Storage for token revocations

pub mod token_revocation;

// Re-export the revocation store
pub use token_revocation::{
    MemoryTokenRevocationStore, RevocationReason, RevokedToken, TokenRevocationStore,
};
