//! gnosis-cs library interface
//!
//! Central server of the face recognition platform: dataset build pipeline
//! and WebRTC signaling relay, exposed over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult, ErrorKind, PipelineError};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{
    DatasetBuilder, Encoder, FileStore, ImageEncoder, SignalingEngine, SignalingRelay,
    StoreLayout,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub image_encoder: Arc<ImageEncoder>,
    pub dataset_builder: Arc<DatasetBuilder>,
    pub signaling_relay: Arc<SignalingRelay>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the pipeline services around one store, encoder and signaling engine
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn FileStore>,
        encoder: Arc<dyn Encoder>,
        signaling: Arc<dyn SignalingEngine>,
        layout: StoreLayout,
    ) -> Self {
        let image_encoder = Arc::new(ImageEncoder::new(
            db.clone(),
            Arc::clone(&store),
            encoder,
            layout.clone(),
        ));
        let dataset_builder = Arc::new(DatasetBuilder::new(
            db.clone(),
            Arc::clone(&store),
            Arc::clone(&image_encoder),
            layout.clone(),
        ));
        let signaling_relay = Arc::new(SignalingRelay::new(db.clone(), store, signaling, layout));

        Self {
            db,
            image_encoder,
            dataset_builder,
            signaling_relay,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::group_routes())
        .merge(api::profile_routes())
        .merge(api::image_routes())
        .merge(api::profile_group_routes())
        .merge(api::stream_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
