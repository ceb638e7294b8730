//! Profile/group membership endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use gnosis_common::db::{self, ProfileGroup};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub group_id: Uuid,
    pub profile_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersRequest {
    pub group_id: Uuid,
    pub profile_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMembersRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RemoveMembersResponse {
    pub removed: u64,
}

async fn require_group(state: &AppState, group_id: Uuid) -> ApiResult<()> {
    match db::groups::get_group(&state.db, group_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(format!("group {}", group_id))),
    }
}

async fn require_profile(state: &AppState, profile_id: Uuid) -> ApiResult<()> {
    match db::profiles::get_profile(&state.db, profile_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(format!("profile {}", profile_id))),
    }
}

/// GET /api/profile-group/one/:id
pub async fn get_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProfileGroup>> {
    db::profile_groups::get_membership(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("membership {}", id)))
}

/// GET /api/profile-group/group/:group_id
pub async fn list_members(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProfileGroup>>> {
    Ok(Json(db::profile_groups::list_members(&state.db, group_id).await?))
}

/// POST /api/profile-group
pub async fn add_member(
    State(state): State<AppState>,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<ProfileGroup>)> {
    require_group(&state, request.group_id).await?;
    require_profile(&state, request.profile_id).await?;

    let membership =
        db::profile_groups::add_member(&state.db, request.group_id, request.profile_id).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// POST /api/profile-group/many
pub async fn add_members(
    State(state): State<AppState>,
    Json(request): Json<AddMembersRequest>,
) -> ApiResult<(StatusCode, Json<Vec<ProfileGroup>>)> {
    if request.profile_ids.is_empty() {
        return Err(ApiError::BadRequest("profileIds is empty".to_string()));
    }
    require_group(&state, request.group_id).await?;
    for profile_id in &request.profile_ids {
        require_profile(&state, *profile_id).await?;
    }

    let memberships =
        db::profile_groups::add_members(&state.db, request.group_id, &request.profile_ids).await?;
    tracing::info!(
        group_id = %request.group_id,
        added = memberships.len(),
        "Profiles added to group"
    );
    Ok((StatusCode::CREATED, Json(memberships)))
}

/// DELETE /api/profile-group/one/:id
pub async fn remove_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProfileGroup>> {
    db::profile_groups::remove_member(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("membership {}", id)))
}

/// DELETE /api/profile-group/many
pub async fn remove_members(
    State(state): State<AppState>,
    Json(request): Json<RemoveMembersRequest>,
) -> ApiResult<Json<RemoveMembersResponse>> {
    let removed = db::profile_groups::remove_members(&state.db, &request.ids).await?;
    Ok(Json(RemoveMembersResponse { removed }))
}

pub fn profile_group_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile-group", post(add_member))
        .route("/api/profile-group/many", post(add_members).delete(remove_members))
        .route(
            "/api/profile-group/one/:id",
            get(get_membership).delete(remove_member),
        )
        .route("/api/profile-group/group/:group_id", get(list_members))
}
