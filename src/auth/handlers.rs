use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest, RegisterRequest},
    extractors::{AccessClaims, AuthUser},
    jwt::{expires_at, JwtKeys},
    password::{hash_password, verify_against_dummy, verify_password},
    repo,
    repo_types::User,
    services::{is_valid_email, issue_tokens, normalize_email, validate_registration},
};
use crate::{
    errors::{bad_request, internal, unauthorized, ApiError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_me))
}

fn email_taken() -> ApiError {
    (StatusCode::CONFLICT, "Email already registered".into())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if let Err(msg) = validate_registration(&mut payload) {
        warn!(email = %payload.email, reason = %msg, "registration rejected");
        return Err(bad_request(msg));
    }

    if User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(email_taken());
    }

    let hash = hash_password(&payload.password).map_err(internal)?;
    let user = match User::create(&state.db, &payload.email, &payload.display_name, &hash).await {
        Ok(user) => user,
        Err(e) if repo::is_unique_violation(&e) => {
            warn!(email = %payload.email, "email registered concurrently");
            return Err(email_taken());
        }
        Err(e) => return Err(internal(e)),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    let keys = JwtKeys::from_ref(&state);
    let response = issue_tokens(&keys, user).map_err(internal)?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(bad_request("Invalid email"));
    }

    let user = match User::find_by_email(&state.db, &email).await.map_err(internal)? {
        Some(u) => u,
        None => {
            verify_against_dummy(&payload.password);
            warn!(email = %email, "login unknown email");
            return Err(unauthorized("Invalid credentials"));
        }
    };

    if !verify_password(&payload.password, &user.password_hash).map_err(internal)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(unauthorized("Invalid credentials"));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err((StatusCode::FORBIDDEN, "Account is disabled".into()));
    }

    info!(user_id = %user.id, "user logged in");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(issue_tokens(&keys, user).map_err(internal)?))
}

/// Rotates the pair: the presented refresh token is revoked once a new one is issued.
#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        unauthorized("Invalid refresh token")
    })?;

    if !repo::session_is_valid(&state.db, claims.sub, claims.jti)
        .await
        .map_err(internal)?
    {
        warn!(user_id = %claims.sub, jti = %claims.jti, "refresh with revoked token");
        return Err(unauthorized("Token has been revoked"));
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal)?
        .ok_or_else(|| unauthorized("User not found"))?;

    let response = issue_tokens(&keys, user).map_err(internal)?;
    repo::revoke_token(&state.db, claims.jti, expires_at(&claims))
        .await
        .map_err(internal)?;

    info!(user_id = %claims.sub, "tokens refreshed");
    Ok(Json(response))
}

#[instrument(skip(state, claims))]
pub async fn logout(
    State(state): State<AppState>,
    AccessClaims(claims): AccessClaims,
) -> Result<Json<MessageResponse>, ApiError> {
    repo::revoke_token(&state.db, claims.jti, expires_at(&claims))
        .await
        .map_err(internal)?;

    match repo::purge_expired_revocations(&state.db).await {
        Ok(0) => {}
        Ok(n) => info!(purged = n, "expired revocations purged"),
        Err(e) => warn!(error = %format!("{e:#}"), "purge of revoked tokens failed"),
    }

    info!(user_id = %claims.sub, "user logged out");
    Ok(Json(MessageResponse {
        message: "Logged out".into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| unauthorized("User not found"))?;
    Ok(Json(user.into()))
}
