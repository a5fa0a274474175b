//! Credential checking used before any upgrade or admin call.
//!
//! `authenticate` fails closed: any validation error, revoked jti or revoked
//! family rejects the caller.

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::token::{Claims, TokenManager, TokenType};
use crate::auth::user::AuthenticatedUser;
use crate::error::{Result, RustyRoomsError};
use crate::storage::token_revocation::TokenRevocationStore;

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Decode and verify a credential
    async fn validate_token(&self, token: &str) -> Result<Claims>;

    async fn is_revoked(&self, token_id: &str) -> Result<bool>;

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool>;

    /// Full check: signature, expiry, token type and both revocation lists
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = self.validate_token(token).await?;

        if claims.token_type != TokenType::Access {
            return Err(RustyRoomsError::AuthError(
                "Refresh tokens cannot be used for access".to_string(),
            ));
        }
        if claims.user_id.is_empty() {
            return Err(RustyRoomsError::AuthError("Invalid token claims".to_string()));
        }

        if self.is_revoked(&claims.jti).await? || self.is_family_revoked(&claims.family_id).await? {
            log::warn!("Revoked token presented by user {}", claims.user_id);
            return Err(RustyRoomsError::TokenRevoked);
        }

        Ok(AuthenticatedUser {
            display_name: claims.username.clone().unwrap_or_else(|| claims.user_id.clone()),
            user_id: claims.user_id,
            role: claims.role,
            token_id: claims.jti,
        })
    }
}

/// HS256 JWT authenticator backed by a revocation store
pub struct JwtAuthenticator {
    token_manager: Arc<TokenManager>,
    revocations: Arc<dyn TokenRevocationStore>,
}

impl JwtAuthenticator {
    pub fn new(token_manager: Arc<TokenManager>, revocations: Arc<dyn TokenRevocationStore>) -> Self {
        Self {
            token_manager,
            revocations,
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn validate_token(&self, token: &str) -> Result<Claims> {
        // Oversized or control-character tokens never reach the decoder
        if token.len() > 4096 || token.chars().any(|c| c.is_control()) {
            return Err(RustyRoomsError::AuthError("Malformed token".to_string()));
        }
        self.token_manager.validate_token(token)
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool> {
        self.revocations.is_token_revoked(token_id).await
    }

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool> {
        self.revocations.is_family_revoked(family_id).await
    }
}

/// Shared reference to the authenticator
pub type SharedAuthenticator = Arc<dyn Authenticator>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user::Role;
    use crate::storage::token_revocation::{
        MemoryTokenRevocationStore, RevocationReason, RevokedToken,
    };

    fn setup() -> (Arc<TokenManager>, Arc<MemoryTokenRevocationStore>, JwtAuthenticator) {
        let tm = Arc::new(TokenManager::new(
            "unit-tests-only-hs256-key-9f3e7a1c-b2d4-e6f8",
            chrono::Duration::hours(1),
            chrono::Duration::hours(24),
        ));
        let store = Arc::new(MemoryTokenRevocationStore::new());
        let auth = JwtAuthenticator::new(tm.clone(), store.clone());
        (tm, store, auth)
    }

    #[tokio::test]
    async fn test_valid_access_token_authenticates() {
        let (tm, _, auth) = setup();
        let pair = tm.issue_pair("u1", Role::User, None).unwrap();
        let user = auth.authenticate(&pair.access_token).await.unwrap();
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.display_name, "u1");
        assert!(!user.is_admin());
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_authenticate() {
        let (tm, _, auth) = setup();
        let pair = tm.issue_pair("u1", Role::User, None).unwrap();
        assert!(auth.authenticate(&pair.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_revoked_jti_rejected() {
        let (tm, store, auth) = setup();
        let pair = tm.issue_pair("u1", Role::User, None).unwrap();
        store
            .revoke_token(RevokedToken::new(
                pair.access_claims.jti.clone(),
                "u1",
                pair.access_claims.expires_at(),
                RevocationReason::UserLogout,
            ))
            .await
            .unwrap();
        assert_eq!(
            auth.authenticate(&pair.access_token).await.unwrap_err(),
            RustyRoomsError::TokenRevoked
        );
    }

    #[tokio::test]
    async fn test_revoked_family_rejected() {
        let (tm, store, auth) = setup();
        let pair = tm.issue_pair("u1", Role::Admin, None).unwrap();
        store
            .revoke_family(RevokedToken::new(
                pair.refresh_claims.family_id.clone(),
                "u1",
                pair.refresh_claims.expires_at(),
                RevocationReason::Rotated,
            ))
            .await
            .unwrap();
        assert_eq!(
            auth.authenticate(&pair.access_token).await.unwrap_err(),
            RustyRoomsError::TokenRevoked
        );
    }

    #[tokio::test]
    async fn test_garbage_rejected() {
        let (_, _, auth) = setup();
        assert!(auth.authenticate("not.a.jwt").await.is_err());
        assert!(auth.authenticate("bad\u{0}token").await.is_err());
    }
}
