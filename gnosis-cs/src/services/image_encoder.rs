//! Image encoding orchestrator
//!
//! Resolves a profile's images, fetches their bytes from the file store,
//! encodes them in one engine call labeled by the profile name, then writes
//! each token back to its image row.
//!
//! Row updates run one after another and every outcome is collected; a failed
//! update is reported, never rolled back, and never stops the remaining ones.

use gnosis_common::db::{self, Image, Profile};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use super::encoding_client::{Encoder, LabeledImage};
use super::engine::EngineError;
use super::file_store::{FileStore, StoreError, StoreLayout};
use crate::error::PipelineError;

/// Result of writing one token back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum UpdateStatus {
    Updated,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdate {
    pub image_id: Uuid,
    #[serde(flatten)]
    pub status: UpdateStatus,
}

/// What an encode call did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeOutcome {
    pub message: String,
    /// Images submitted to the engine
    pub encoded_image_ids: Vec<Uuid>,
    /// Images whose file was missing from the store, left uncoded
    pub skipped_image_ids: Vec<Uuid>,
    pub updates: Vec<ImageUpdate>,
}

impl EncodeOutcome {
    pub fn updated_count(&self) -> usize {
        self.updates
            .iter()
            .filter(|u| u.status == UpdateStatus::Updated)
            .count()
    }
}

pub struct ImageEncoder {
    db: SqlitePool,
    store: Arc<dyn FileStore>,
    encoder: Arc<dyn Encoder>,
    layout: StoreLayout,
}

impl ImageEncoder {
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn FileStore>,
        encoder: Arc<dyn Encoder>,
        layout: StoreLayout,
    ) -> Self {
        Self {
            db,
            store,
            encoder,
            layout,
        }
    }

    /// Encode a profile's images
    ///
    /// With no ids (or an empty list) every image of the profile is encoded.
    /// Otherwise only ids that belong to the profile are kept; foreign ids are
    /// dropped silently.
    pub async fn encode(
        &self,
        profile_id: Uuid,
        image_ids: Option<&[Uuid]>,
    ) -> Result<EncodeOutcome, PipelineError> {
        let profile = db::profiles::get_profile(&self.db, profile_id)
            .await?
            .ok_or(PipelineError::ProfileNotFound(profile_id))?;

        let owned = db::images::list_images_by_profile(&self.db, profile_id).await?;
        let selected = select_images(owned, image_ids);
        if selected.is_empty() {
            return Err(PipelineError::NoImagesToEncode(profile_id));
        }

        tracing::info!(
            profile_id = %profile_id,
            images = selected.len(),
            "Encoding profile images"
        );

        let (submitted, labeled, skipped) = self.fetch_images(&profile, selected).await?;

        if submitted.is_empty() {
            tracing::warn!(profile_id = %profile_id, "No image files found on the store");
            return Ok(EncodeOutcome {
                message: format!("No image files found for profile {}", profile.name),
                encoded_image_ids: Vec::new(),
                skipped_image_ids: skipped,
                updates: Vec::new(),
            });
        }

        let mut encodings = self
            .encoder
            .encode(labeled)
            .await
            .map_err(PipelineError::Encoding)?;

        let tokens = encodings.remove(&profile.name).unwrap_or_default();
        if tokens.len() != submitted.len() {
            return Err(PipelineError::Encoding(EngineError::Parse(format!(
                "expected {} embeddings for '{}', got {}",
                submitted.len(),
                profile.name,
                tokens.len()
            ))));
        }

        let mut updates = Vec::with_capacity(submitted.len());
        for (image_id, token) in submitted.iter().zip(tokens.iter()) {
            let status = match db::images::set_image_encoding(&self.db, *image_id, token).await {
                Ok(true) => UpdateStatus::Updated,
                Ok(false) => UpdateStatus::Failed {
                    reason: "image no longer exists".to_string(),
                },
                Err(e) => UpdateStatus::Failed {
                    reason: e.to_string(),
                },
            };

            if let UpdateStatus::Failed { reason } = &status {
                tracing::warn!(image_id = %image_id, reason = %reason, "Image update failed");
            }
            updates.push(ImageUpdate {
                image_id: *image_id,
                status,
            });
        }

        let outcome = EncodeOutcome {
            message: format!("Encoded {} image(s) for profile {}", submitted.len(), profile.name),
            encoded_image_ids: submitted,
            skipped_image_ids: skipped,
            updates,
        };

        tracing::info!(
            profile_id = %profile_id,
            encoded = outcome.encoded_image_ids.len(),
            updated = outcome.updated_count(),
            skipped = outcome.skipped_image_ids.len(),
            "Profile encoding complete"
        );

        Ok(outcome)
    }

    /// Download image bytes. Missing files are skipped, anything else aborts.
    async fn fetch_images(
        &self,
        profile: &Profile,
        images: Vec<Image>,
    ) -> Result<(Vec<Uuid>, Vec<LabeledImage>, Vec<Uuid>), PipelineError> {
        let mut submitted = Vec::with_capacity(images.len());
        let mut labeled = Vec::with_capacity(images.len());
        let mut skipped = Vec::new();

        for image in images {
            let remote_path = self.layout.image_path(profile, &image);
            match self.store.get(&remote_path).await {
                Ok(bytes) => {
                    submitted.push(image.id);
                    labeled.push(LabeledImage {
                        label: profile.name.clone(),
                        file_name: image.image_file.clone(),
                        bytes,
                    });
                }
                Err(StoreError::RemoteNotFound(path)) => {
                    tracing::warn!(
                        image_id = %image.id,
                        path = %path,
                        "Image file missing, skipping"
                    );
                    skipped.push(image.id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok((submitted, labeled, skipped))
    }
}

/// Keep the profile's images, restricted to `requested` when it is non-empty
fn select_images(owned: Vec<Image>, requested: Option<&[Uuid]>) -> Vec<Image> {
    match requested {
        Some(ids) if !ids.is_empty() => owned
            .into_iter()
            .filter(|image| ids.contains(&image.id))
            .collect(),
        _ => owned,
    }
}
