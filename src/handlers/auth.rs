//! Authentication filters shared by the WebSocket and room endpoints

use serde::Deserialize;
use std::convert::Infallible;
use warp::{Filter, Rejection};

use crate::auth::token::extract_bearer_token;
use crate::auth::{AuthenticatedUser, SharedAuthenticator};
use crate::error::RustyRoomsError;

/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// also travel as a query parameter
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Picks the credential: a present Authorization header must be a well-formed
/// bearer header, otherwise the `token` query parameter is used
pub fn resolve_token(
    authorization: Option<&str>,
    query_token: Option<&str>,
) -> Result<String, RustyRoomsError> {
    match authorization {
        Some(header) => extract_bearer_token(header).ok_or_else(|| {
            RustyRoomsError::AuthError("Invalid authorization header format".to_string())
        }),
        None => query_token
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or(RustyRoomsError::Unauthorized),
    }
}

fn with_authenticator(
    authenticator: SharedAuthenticator,
) -> impl Filter<Extract = (SharedAuthenticator,), Error = Infallible> + Clone {
    warp::any().map(move || authenticator.clone())
}

async fn authenticate_request(
    authorization: Option<String>,
    query: TokenQuery,
    authenticator: SharedAuthenticator,
) -> Result<AuthenticatedUser, Rejection> {
    let token = resolve_token(authorization.as_deref(), query.token.as_deref())
        .map_err(warp::reject::custom)?;

    authenticator.authenticate(&token).await.map_err(|e| {
        log::warn!("Authentication failed: {}", e);
        warp::reject::custom(e)
    })
}

/// Rejects the request with 401 unless it carries a valid access token
pub fn with_auth(
    authenticator: SharedAuthenticator,
) -> impl Filter<Extract = (AuthenticatedUser,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::query::<TokenQuery>())
        .and(with_authenticator(authenticator))
        .and_then(authenticate_request)
}

/// `with_auth` plus the ADMIN role, 403 otherwise
pub fn require_admin(
    authenticator: SharedAuthenticator,
) -> impl Filter<Extract = (AuthenticatedUser,), Error = Rejection> + Clone {
    with_auth(authenticator).and_then(|user: AuthenticatedUser| async move {
        if user.is_admin() {
            Ok(user)
        } else {
            log::warn!("Admin endpoint refused for user {}", user.user_id);
            Err(warp::reject::custom(RustyRoomsError::Forbidden))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_takes_precedence_over_query() {
        let token = resolve_token(Some("Bearer from-header"), Some("from-query")).unwrap();
        assert_eq!(token, "from-header");
    }

    #[test]
    fn test_malformed_header_is_rejected_even_with_query_token() {
        assert!(matches!(
            resolve_token(Some("Token abc"), Some("from-query")),
            Err(RustyRoomsError::AuthError(_))
        ));
        assert!(resolve_token(Some("Bearer"), None).is_err());
    }

    #[test]
    fn test_query_token_used_without_header() {
        assert_eq!(resolve_token(None, Some("q")).unwrap(), "q");
        assert_eq!(resolve_token(None, Some("")), Err(RustyRoomsError::Unauthorized));
        assert_eq!(resolve_token(None, None), Err(RustyRoomsError::Unauthorized));
    }
}
