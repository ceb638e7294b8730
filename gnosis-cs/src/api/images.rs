//! Image endpoints
//!
//! Images are registered after their file has been placed on the store under
//! the owning profile's directory.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use gnosis_common::db::{self, Image, NewImage};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/image/:id
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Image>> {
    db::images::get_image(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("image {}", id)))
}

/// GET /api/image/profile/:profile_id
pub async fn list_profile_images(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Image>>> {
    Ok(Json(
        db::images::list_images_by_profile(&state.db, profile_id).await?,
    ))
}

/// GET /api/image/user/:user_id
pub async fn list_user_images(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Image>>> {
    Ok(Json(db::images::list_images_by_user(&state.db, &user_id).await?))
}

/// POST /api/image
pub async fn create_image(
    State(state): State<AppState>,
    Json(request): Json<NewImage>,
) -> ApiResult<(StatusCode, Json<Image>)> {
    let file = request.image_file.trim();
    if file.is_empty() || file.contains('/') || file.contains('\\') {
        return Err(ApiError::BadRequest(
            "imageFile must be a plain file name".to_string(),
        ));
    }

    if db::profiles::get_profile(&state.db, request.profile_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("profile {}", request.profile_id)));
    }

    let image = db::images::create_image(&state.db, &request).await?;
    tracing::info!(image_id = %image.id, profile_id = %image.profile_id, "Image registered");
    Ok((StatusCode::CREATED, Json(image)))
}

/// DELETE /api/image/:id
///
/// Removes the record only; the file stays on the store.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Image>> {
    db::images::delete_image(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("image {}", id)))
}

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/api/image", post(create_image))
        .route("/api/image/:id", get(get_image).delete(delete_image))
        .route("/api/image/profile/:profile_id", get(list_profile_images))
        .route("/api/image/user/:user_id", get(list_user_images))
}
