//! Server configuration module
//! Handles dynamic configuration parameters for the room server

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_HOURS, DEFAULT_GAME_ROOM_CAPACITY, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_REFRESH_TOKEN_HOURS, DEFAULT_REVOCATION_CLEANUP_SECS,
};
use crate::error::{Result, RustyRoomsError};
use std::env;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JWT secret for token signing/validation
    pub jwt_secret: String,
    /// Lifetime of access tokens
    pub access_token_ttl: chrono::Duration,
    /// Lifetime of refresh tokens
    pub refresh_token_ttl: chrono::Duration,
    /// Game rooms only admit invited users when enabled
    pub room_auth_enabled: bool,
    /// Capacity of rooms created through the in-band protocol
    pub default_room_capacity: usize,
    /// How often expired revocations are purged
    pub revocation_cleanup_interval: Duration,
}

impl ServerConfig {
    /// Create a test configuration - only for tests
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "unit-tests-only-hs256-key-9f3e7a1c-b2d4-e6f8".to_string(),
            access_token_ttl: chrono::Duration::hours(DEFAULT_ACCESS_TOKEN_HOURS),
            refresh_token_ttl: chrono::Duration::hours(DEFAULT_REFRESH_TOKEN_HOURS),
            room_auth_enabled: false,
            default_room_capacity: DEFAULT_GAME_ROOM_CAPACITY,
            revocation_cleanup_interval: Duration::from_secs(DEFAULT_REVOCATION_CLEANUP_SECS),
        }
    }

    /// Validate that a secret meets security requirements
    fn validate_jwt_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(RustyRoomsError::ConfigError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        // Check for insecure default or example values
        let insecure_patterns = [
            "your-secret-key",
            "change-this",
            "default-secret-key",
            "test-secret",
            "password",
            "12345",
        ];

        for pattern in &insecure_patterns {
            if secret.contains(pattern) {
                return Err(RustyRoomsError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Please use a secure random secret generated with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RustyRoomsError::ConfigError(
                "JWT secret should contain mixed characters (letters, numbers, symbols)".to_string(),
            ));
        }

        Ok(())
    }

    fn env_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .map(|v| {
                let v = v.to_lowercase();
                v == "true" || v == "1"
            })
            .unwrap_or(default)
    }

    fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let host = env::var("RUSTY_ROOMS_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = Self::env_parse("RUSTY_ROOMS_PORT", DEFAULT_PORT);

        let jwt_secret = env::var("RUSTY_ROOMS_JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| {
                RustyRoomsError::ConfigError(
                    "JWT_SECRET environment variable is required. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;
        Self::validate_jwt_secret(&jwt_secret)?;

        let access_hours = Self::env_parse("ACCESS_TOKEN_DURATION", DEFAULT_ACCESS_TOKEN_HOURS);
        let refresh_hours = Self::env_parse("REFRESH_TOKEN_DURATION", DEFAULT_REFRESH_TOKEN_HOURS);

        let default_room_capacity =
            Self::env_parse("RUSTY_ROOMS_DEFAULT_ROOM_CAPACITY", DEFAULT_GAME_ROOM_CAPACITY);
        let cleanup_secs = Self::env_parse(
            "RUSTY_ROOMS_REVOCATION_CLEANUP_SECS",
            DEFAULT_REVOCATION_CLEANUP_SECS,
        );

        Ok(Self {
            host,
            port,
            jwt_secret,
            access_token_ttl: chrono::Duration::hours(access_hours),
            refresh_token_ttl: chrono::Duration::hours(refresh_hours),
            room_auth_enabled: Self::env_bool("ROOM_AUTH_ENABLED", false),
            default_room_capacity,
            revocation_cleanup_interval: Duration::from_secs(cleanup_secs),
        })
    }
}
