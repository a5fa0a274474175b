use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::user::Role;
use crate::error::{Result, RustyRoomsError};

/// Access tokens open connections; refresh tokens only mint new pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    #[serde(default)]
    pub role: Role,
    pub token_type: TokenType,
    /// Links the access and refresh token issued together
    pub family_id: String,
    /// JWT ID
    pub jti: String,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// A freshly issued access/refresh pair sharing one family id
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_claims: Claims,
    pub refresh_claims: Claims,
}

/// Manages JWT token operations
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenManager {
    /// Creates a new token manager with a secret
    pub fn new(secret: &str, access_ttl: chrono::Duration, refresh_ttl: chrono::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        validation.required_spec_claims.insert("exp".to_string());

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Signs arbitrary claims
    pub fn generate_token(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| RustyRoomsError::AuthError(format!("Failed to generate token: {}", e)))
    }

    /// Issues an access and refresh token with the same family id
    pub fn issue_pair(&self, user_id: &str, role: Role, username: Option<String>) -> Result<TokenPair> {
        let now = Utc::now();
        let family_id = Uuid::new_v4().to_string();

        let access_claims = Claims {
            user_id: user_id.to_string(),
            role,
            token_type: TokenType::Access,
            family_id: family_id.clone(),
            jti: Uuid::new_v4().to_string(),
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
            username: username.clone(),
        };
        let refresh_claims = Claims {
            user_id: user_id.to_string(),
            role,
            token_type: TokenType::Refresh,
            family_id,
            jti: Uuid::new_v4().to_string(),
            exp: (now + self.refresh_ttl).timestamp(),
            iat: now.timestamp(),
            username,
        };

        Ok(TokenPair {
            access_token: self.generate_token(&access_claims)?,
            refresh_token: self.generate_token(&refresh_claims)?,
            access_claims,
            refresh_claims,
        })
    }

    /// Validates signature and expiry, returning the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => RustyRoomsError::TokenExpired,
                _ => RustyRoomsError::AuthError(format!("Invalid token: {}", e)),
            })
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    let mut parts = auth_header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token.to_string()),
        _ => None,
    }
}
