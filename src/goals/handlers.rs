use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{GoalCreate, GoalUpdate, ListQuery, SavedAmountUpdate};
use super::model::Goal;
use super::progress::GoalSummary;
use super::{repo, services};
use crate::{
    auth::extractors::AuthUser,
    errors::{bad_request, internal, not_found, ApiError},
    state::AppState,
};

pub fn goal_routes() -> Router<AppState> {
    Router::new()
        .route("/goals", get(list_goals).post(create_goal))
        .route("/goals/summary", get(get_summary))
        .route(
            "/goals/:id",
            get(get_goal).patch(update_goal).delete(delete_goal),
        )
        .route("/goals/:id/saved", patch(update_goal_saved))
}

#[instrument(skip(state))]
pub async fn list_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    q.validate().map_err(bad_request)?;
    let goals = repo::list_by_user(&state.db, user_id, q.category, q.skip, q.limit)
        .await
        .map_err(internal)?;
    Ok(Json(goals))
}

#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<GoalSummary>, ApiError> {
    let summary = services::summary_for_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(summary))
}

#[instrument(skip(state, body))]
pub async fn create_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<GoalCreate>,
) -> Result<(StatusCode, HeaderMap, Json<Goal>), ApiError> {
    if let Err(msg) = body.validate() {
        warn!(%user_id, reason = %msg, "rejected goal");
        return Err(bad_request(msg));
    }

    let goal = repo::insert(&state.db, user_id, &body)
        .await
        .map_err(internal)?;
    info!(%user_id, goal_id = %goal.id, category = %goal.category, "goal created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/goals/{}", goal.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(goal)))
}

#[instrument(skip(state))]
pub async fn get_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Goal>, ApiError> {
    repo::get_by_id(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Goal"))
}

#[instrument(skip(state, body))]
pub async fn update_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<GoalUpdate>,
) -> Result<Json<Goal>, ApiError> {
    body.validate().map_err(bad_request)?;

    let updated = if body.is_empty() {
        repo::get_by_id(&state.db, user_id, id).await
    } else {
        repo::update(&state.db, user_id, id, &body).await
    };

    match updated.map_err(internal)? {
        Some(goal) => {
            info!(%user_id, goal_id = %id, "goal updated");
            Ok(Json(goal))
        }
        None => Err(not_found("Goal")),
    }
}

#[instrument(skip(state))]
pub async fn update_goal_saved(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SavedAmountUpdate>,
) -> Result<Json<Goal>, ApiError> {
    body.validate().map_err(bad_request)?;

    let goal = repo::update_saved(&state.db, user_id, id, body.amount)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Goal"))?;

    if goal.saved < body.amount {
        info!(%user_id, goal_id = %id, requested = body.amount, stored = goal.saved, "saved amount clamped to target");
    }
    Ok(Json(goal))
}

#[instrument(skip(state))]
pub async fn delete_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = repo::delete(&state.db, user_id, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found("Goal"));
    }
    info!(%user_id, goal_id = %id, "goal deleted");
    Ok(StatusCode::NO_CONTENT)
}
