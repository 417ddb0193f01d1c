use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::{error, warn};
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use super::jwt::JwtKeys;
use super::repo;
use crate::{
    errors::{unauthorized, ApiError},
    state::AppState,
};

/// Validated claims of the access token on the request.
#[derive(Debug)]
pub struct AccessClaims(pub Claims);

/// Extracts and validates the access token, returning the user ID.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| unauthorized("Invalid Authorization header"))
}

#[async_trait]
impl FromRequestParts<AppState> for AccessClaims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let keys = JwtKeys::from_ref(state);
        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                return Err(unauthorized("Invalid or expired token"));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err(unauthorized("Access token required"));
        }

        match repo::session_is_valid(&state.db, claims.sub, claims.jti).await {
            Ok(true) => Ok(AccessClaims(claims)),
            Ok(false) => {
                warn!(user_id = %claims.sub, jti = %claims.jti, "revoked token or inactive user");
                Err(unauthorized("Token has been revoked"))
            }
            Err(e) => {
                error!(error = %e, "session check failed");
                Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into()))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AccessClaims(claims) = AccessClaims::from_request_parts(parts, state).await?;
        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/goals");
        if let Some(v) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_is_extracted() {
        let parts = parts_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");

        let parts = parts_with_auth(Some("bearer xyz"));
        assert_eq!(bearer_token(&parts).unwrap(), "xyz");
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        let (status, _) = bearer_token(&parts_with_auth(None)).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, msg) = bearer_token(&parts_with_auth(Some("Basic dXNlcjpwYXNz"))).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(msg, "Invalid Authorization header");

        assert!(bearer_token(&parts_with_auth(Some("Bearer    "))).is_err());
    }
}
