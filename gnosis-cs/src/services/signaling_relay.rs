//! Signaling relay
//!
//! Forwards WebRTC session descriptions between a client and the analytics
//! engine. Detection is a stateless proxy. Recognition attaches the group's
//! dataset artifact so the engine can match faces against it.

use async_trait::async_trait;
use gnosis_common::db;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use super::engine::{send_json, EngineEndpoint, EngineError};
use super::file_store::{FileStore, StoreError, StoreLayout};
use crate::error::PipelineError;

/// SDP offer or answer, `{"sdp": ..., "type": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: String,
}

/// Offer body the engine expects on its stream endpoints
#[derive(Debug, Serialize)]
struct EngineOffer<'a> {
    sdp: &'a str,
    sdp_type: &'a str,
}

#[async_trait]
pub trait SignalingEngine: Send + Sync {
    async fn detection_offer(
        &self,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, EngineError>;

    async fn recognition_offer(
        &self,
        offer: &SessionDescription,
        dataset_name: &str,
        dataset: Vec<u8>,
    ) -> Result<SessionDescription, EngineError>;
}

/// HTTP signaling client for the analytics engine
#[derive(Debug, Clone)]
pub struct SignalingClient {
    endpoint: EngineEndpoint,
}

impl SignalingClient {
    pub fn new(endpoint: EngineEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl SignalingEngine for SignalingClient {
    async fn detection_offer(
        &self,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, EngineError> {
        let body = EngineOffer {
            sdp: &offer.sdp,
            sdp_type: &offer.sdp_type,
        };

        send_json(
            self.endpoint
                .http()
                .post(self.endpoint.url("/detector/stream"))
                .json(&body),
        )
        .await
    }

    async fn recognition_offer(
        &self,
        offer: &SessionDescription,
        dataset_name: &str,
        dataset: Vec<u8>,
    ) -> Result<SessionDescription, EngineError> {
        let dataset_part = Part::bytes(dataset)
            .file_name(dataset_name.to_string())
            .mime_str("application/json")
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        let form = Form::new()
            .text("sdp", offer.sdp.clone())
            .text("sdp_type", offer.sdp_type.clone())
            .part("dataset", dataset_part);

        send_json(
            self.endpoint
                .http()
                .post(self.endpoint.url("/recognizer/stream"))
                .multipart(form),
        )
        .await
    }
}

pub struct SignalingRelay {
    db: SqlitePool,
    store: Arc<dyn FileStore>,
    engine: Arc<dyn SignalingEngine>,
    layout: StoreLayout,
}

impl SignalingRelay {
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn FileStore>,
        engine: Arc<dyn SignalingEngine>,
        layout: StoreLayout,
    ) -> Self {
        Self {
            db,
            store,
            engine,
            layout,
        }
    }

    /// Forward an offer to the detection endpoint and return its answer as-is
    pub async fn detection_stream(
        &self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, PipelineError> {
        tracing::debug!(sdp_type = %offer.sdp_type, "Relaying detection offer");

        self.engine
            .detection_offer(&offer)
            .await
            .map_err(PipelineError::Signaling)
    }

    /// Forward an offer plus the group's dataset to the recognition endpoint
    pub async fn recognition_stream(
        &self,
        offer: SessionDescription,
        group_id: Uuid,
    ) -> Result<SessionDescription, PipelineError> {
        let group = db::groups::get_group(&self.db, group_id)
            .await?
            .ok_or(PipelineError::GroupNotFound(group_id))?;

        let dataset_name = group
            .dataset
            .ok_or(PipelineError::DatasetMissing(group_id))?;

        let path = self.layout.dataset_path(&dataset_name);
        let dataset = match self.store.get(&path).await {
            Ok(bytes) => bytes,
            Err(source @ StoreError::RemoteNotFound(_)) => {
                tracing::warn!(
                    group_id = %group_id,
                    path = %path,
                    "Dataset pointer has no backing file"
                );
                return Err(PipelineError::DatasetDownloadFailed { path, source });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            group_id = %group_id,
            dataset_bytes = dataset.len(),
            "Relaying recognition offer"
        );

        self.engine
            .recognition_offer(&offer, &dataset_name, dataset)
            .await
            .map_err(PipelineError::Signaling)
    }
}
