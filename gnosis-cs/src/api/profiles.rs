//! Profile endpoints and on-demand encoding

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use gnosis_common::db::{self, NewProfile, Profile, ProfileUpdate, ProfileWithImages};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::EncodeOutcome;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeRequest {
    /// Restrict encoding to these images; all of the profile's images when absent
    #[serde(default)]
    pub image_ids: Option<Vec<Uuid>>,
}

/// GET /api/profile/:id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProfileWithImages>> {
    let profile = db::profiles::get_profile(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("profile {}", id)))?;
    let images = db::images::list_images_by_profile(&state.db, id).await?;

    Ok(Json(ProfileWithImages { profile, images }))
}

/// GET /api/profile/user/:user_id
pub async fn list_user_profiles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Profile>>> {
    Ok(Json(db::profiles::list_profiles_by_user(&state.db, &user_id).await?))
}

/// GET /api/profile/group/:group_id
pub async fn list_group_profiles(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Profile>>> {
    Ok(Json(db::profiles::list_profiles_by_group(&state.db, group_id).await?))
}

/// GET /api/profile/not-in-group/:group_id
///
/// Profiles of the group owner that could still be added.
pub async fn list_candidate_profiles(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Profile>>> {
    Ok(Json(
        db::profiles::list_profiles_not_in_group(&state.db, group_id).await?,
    ))
}

/// POST /api/profile
pub async fn create_profile(
    State(state): State<AppState>,
    Json(request): Json<NewProfile>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    if request.name.trim().is_empty() || request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("name and userId are required".to_string()));
    }

    let profile = db::profiles::create_profile(&state.db, &request).await?;
    tracing::info!(profile_id = %profile.id, user_id = %profile.user_id, "Profile created");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// PUT /api/profile/:id
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Profile>> {
    db::profiles::update_profile(&state.db, id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("profile {}", id)))
}

/// DELETE /api/profile/:id
pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Profile>> {
    let profile = db::profiles::delete_profile(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("profile {}", id)))?;

    tracing::info!(profile_id = %id, "Profile deleted");
    Ok(Json(profile))
}

impl EncodeRequest {
    /// An empty body selects every image; anything else must decode cleanly.
    fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("invalid encode request: {}", e)))
    }
}

/// POST /api/profile/:id/encode
pub async fn encode_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Json<EncodeOutcome>> {
    let request = EncodeRequest::from_body(&body)?;
    let outcome = state
        .image_encoder
        .encode(id, request.image_ids.as_deref())
        .await?;
    Ok(Json(outcome))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile", post(create_profile))
        .route(
            "/api/profile/:id",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/api/profile/user/:user_id", get(list_user_profiles))
        .route("/api/profile/group/:group_id", get(list_group_profiles))
        .route("/api/profile/not-in-group/:group_id", get(list_candidate_profiles))
        .route("/api/profile/:id/encode", post(encode_profile))
}
