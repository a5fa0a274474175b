//! Token revocation storage and management
//!
//! Revocations are keyed either by a single token (jti) or by a token family,
//! which covers every token issued together with it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;

/// Information about a revoked token or token family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    /// JWT ID (jti) or family id
    pub token_id: String,
    /// User ID who owned the token
    pub user_id: String,
    /// When the token was revoked
    pub revoked_at: DateTime<Utc>,
    /// When the original token expires (for cleanup)
    pub expires_at: DateTime<Utc>,
    pub reason: RevocationReason,
}

impl RevokedToken {
    pub fn new(
        token_id: impl Into<String>,
        user_id: impl Into<String>,
        expires_at: DateTime<Utc>,
        reason: RevocationReason,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            user_id: user_id.into(),
            revoked_at: Utc::now(),
            expires_at,
            reason,
        }
    }
}

/// Reason for token revocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RevocationReason {
    /// User initiated logout
    UserLogout,
    /// Family rotated by a refresh
    Rotated,
}

/// Token revocation storage trait
#[async_trait]
pub trait TokenRevocationStore: Send + Sync {
    /// Add a single token to the revocation list
    async fn revoke_token(&self, revoked: RevokedToken) -> Result<()>;

    /// Revoke every token of a family
    async fn revoke_family(&self, revoked: RevokedToken) -> Result<()>;

    async fn is_token_revoked(&self, token_id: &str) -> Result<bool>;

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool>;

    /// Clean up revocations whose token has expired anyway
    async fn cleanup_expired_revocations(&self) -> Result<usize>;
}

/// In-memory implementation of token revocation store
pub struct MemoryTokenRevocationStore {
    /// Map of jti -> RevokedToken
    revoked_tokens: RwLock<HashMap<String, RevokedToken>>,
    /// Map of family_id -> RevokedToken
    revoked_families: RwLock<HashMap<String, RevokedToken>>,
}

impl MemoryTokenRevocationStore {
    pub fn new() -> Self {
        Self {
            revoked_tokens: RwLock::new(HashMap::new()),
            revoked_families: RwLock::new(HashMap::new()),
        }
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self: Arc<Self>, every: std::time::Duration) {
        let store = Arc::clone(&self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match store.cleanup_expired_revocations().await {
                    Ok(0) => {}
                    Ok(count) => log::info!("Purged {} expired token revocations", count),
                    Err(e) => log::error!("Failed to cleanup expired token revocations: {}", e),
                }
            }
        });
    }
}

impl Default for MemoryTokenRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenRevocationStore for MemoryTokenRevocationStore {
    async fn revoke_token(&self, revoked: RevokedToken) -> Result<()> {
        log::info!("Token revoked: {} (user {})", revoked.token_id, revoked.user_id);
        self.revoked_tokens
            .write()
            .await
            .insert(revoked.token_id.clone(), revoked);
        Ok(())
    }

    async fn revoke_family(&self, revoked: RevokedToken) -> Result<()> {
        log::info!("Token family revoked: {} (user {})", revoked.token_id, revoked.user_id);
        self.revoked_families
            .write()
            .await
            .insert(revoked.token_id.clone(), revoked);
        Ok(())
    }

    async fn is_token_revoked(&self, token_id: &str) -> Result<bool> {
        Ok(self.revoked_tokens.read().await.contains_key(token_id))
    }

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool> {
        Ok(self.revoked_families.read().await.contains_key(family_id))
    }

    async fn cleanup_expired_revocations(&self) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        {
            let mut tokens = self.revoked_tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, t| t.expires_at > now);
            removed += before - tokens.len();
        }
        {
            let mut families = self.revoked_families.write().await;
            let before = families.len();
            families.retain(|_, t| t.expires_at > now);
            removed += before - families.len();
        }

        Ok(removed)
    }
}
