//! WebRTC signaling endpoints
//!
//! Clients post an SDP offer and get the analytics engine's answer back.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::services::SessionDescription;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionOffer {
    #[serde(flatten)]
    pub offer: SessionDescription,
    pub group_id: Uuid,
}

/// POST /api/detection/stream
pub async fn detection_stream(
    State(state): State<AppState>,
    Json(offer): Json<SessionDescription>,
) -> ApiResult<Json<SessionDescription>> {
    let answer = state.signaling_relay.detection_stream(offer).await?;
    Ok(Json(answer))
}

/// POST /api/recognition/stream
pub async fn recognition_stream(
    State(state): State<AppState>,
    Json(request): Json<RecognitionOffer>,
) -> ApiResult<Json<SessionDescription>> {
    tracing::info!(group_id = %request.group_id, "Recognition stream requested");

    let answer = state
        .signaling_relay
        .recognition_stream(request.offer, request.group_id)
        .await?;
    Ok(Json(answer))
}

pub fn stream_routes() -> Router<AppState> {
    Router::new()
        .route("/api/detection/stream", post(detection_stream))
        .route("/api/recognition/stream", post(recognition_stream))
}
