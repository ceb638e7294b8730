//! Group endpoints, including dataset build and clear

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use gnosis_common::db::{self, Group, GroupUpdate, GroupWithMembers, NewGroup};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/group
pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Json<Vec<Group>>> {
    Ok(Json(db::groups::list_groups(&state.db).await?))
}

/// GET /api/group/:id
///
/// Group with member profiles and their images.
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GroupWithMembers>> {
    db::groups::load_group_with_members(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("group {}", id)))
}

/// GET /api/group/user/:user_id
pub async fn list_user_groups(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Group>>> {
    Ok(Json(db::groups::list_groups_by_user(&state.db, &user_id).await?))
}

/// POST /api/group
pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<NewGroup>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    if request.name.trim().is_empty() || request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("name and userId are required".to_string()));
    }

    let group = db::groups::create_group(&state.db, &request).await?;
    tracing::info!(group_id = %group.id, user_id = %group.user_id, "Group created");
    Ok((StatusCode::CREATED, Json(group)))
}

/// PUT /api/group/:id
pub async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<GroupUpdate>,
) -> ApiResult<Json<Group>> {
    db::groups::update_group(&state.db, id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("group {}", id)))
}

/// DELETE /api/group/:id
pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Group>> {
    let group = db::groups::delete_group(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("group {}", id)))?;

    tracing::info!(group_id = %id, "Group deleted");
    Ok(Json(group))
}

/// POST /api/group/:id/dataset
///
/// Encode what is missing, upload the dataset and record it on the group.
pub async fn build_dataset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Group>> {
    let group = state.dataset_builder.build(id).await?;
    Ok(Json(group))
}

/// DELETE /api/group/:id/dataset
pub async fn delete_dataset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Group>> {
    let group = state.dataset_builder.delete_dataset(id).await?;
    Ok(Json(group))
}

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/api/group", get(list_groups).post(create_group))
        .route(
            "/api/group/:id",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/api/group/user/:user_id", get(list_user_groups))
        .route(
            "/api/group/:id/dataset",
            post(build_dataset).delete(delete_dataset),
        )
}
