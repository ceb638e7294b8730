//! Dataset builder
//!
//! Produces a group's recognition dataset: a JSON array of
//! `[profileName, embeddingToken]` pairs uploaded as `<groupId>.json`.
//!
//! Uncoded images are encoded first, per profile. Any encoding failure aborts
//! the build before anything is uploaded, and the group row is only updated
//! after the upload succeeds.

use gnosis_common::db::{self, Group, GroupWithMembers};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use super::file_store::{FileStore, PutSource, StoreLayout};
use super::image_encoder::ImageEncoder;
use crate::error::PipelineError;

/// One `[profileName, token]` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry(pub String, pub String);

/// Dataset artifact contents, serialized as a bare JSON array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset(pub Vec<DatasetEntry>);

impl Dataset {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Collect coded images in profile order then image order
///
/// Returns the dataset and whether every member image was coded.
fn assemble(group: &GroupWithMembers) -> Result<(Dataset, bool), PipelineError> {
    let mut entries = Vec::new();
    let mut all_coded = true;

    for member in &group.profiles {
        for image in &member.images {
            if !image.is_coded {
                all_coded = false;
                continue;
            }
            let token = image
                .embedding()
                .ok_or(PipelineError::InconsistentState(image.id))?;
            entries.push(DatasetEntry(member.profile.name.clone(), token.to_string()));
        }
    }

    Ok((Dataset(entries), all_coded))
}

pub struct DatasetBuilder {
    db: SqlitePool,
    store: Arc<dyn FileStore>,
    image_encoder: Arc<ImageEncoder>,
    layout: StoreLayout,
}

impl DatasetBuilder {
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn FileStore>,
        image_encoder: Arc<ImageEncoder>,
        layout: StoreLayout,
    ) -> Self {
        Self {
            db,
            store,
            image_encoder,
            layout,
        }
    }

    async fn load(&self, group_id: Uuid) -> Result<GroupWithMembers, PipelineError> {
        db::groups::load_group_with_members(&self.db, group_id)
            .await?
            .ok_or(PipelineError::GroupNotFound(group_id))
    }

    /// Build and upload the group's dataset, then record it on the group
    pub async fn build(&self, group_id: Uuid) -> Result<Group, PipelineError> {
        let group = self.load(group_id).await?;
        if group.profiles.is_empty() {
            return Err(PipelineError::EmptyGroup(group_id));
        }

        tracing::info!(
            group_id = %group_id,
            profiles = group.profiles.len(),
            "Building dataset"
        );

        for member in &group.profiles {
            let uncoded: Vec<Uuid> = member
                .images
                .iter()
                .filter(|image| !image.is_coded)
                .map(|image| image.id)
                .collect();
            if uncoded.is_empty() {
                continue;
            }

            let outcome = self
                .image_encoder
                .encode(member.profile.id, Some(&uncoded))
                .await
                .map_err(|e| {
                    tracing::error!(
                        group_id = %group_id,
                        profile_id = %member.profile.id,
                        error = %e,
                        "Encoding failed, build aborted"
                    );
                    e
                })?;

            tracing::info!(
                group_id = %group_id,
                profile_id = %member.profile.id,
                encoded = outcome.encoded_image_ids.len(),
                updated = outcome.updated_count(),
                "Profile encoded"
            );
        }

        let group = self.load(group_id).await?;
        let (dataset, all_coded) = assemble(&group)?;
        if dataset.is_empty() {
            return Err(PipelineError::EmptyDataset(group_id));
        }

        let bytes = dataset.to_bytes()?;
        let name = StoreLayout::dataset_name(group_id);
        let remote_path = self.layout.dataset_path(&name);

        let upload = async {
            self.store.ensure_dir(self.layout.root()).await?;
            self.store.put(PutSource::Buffer(bytes), &remote_path).await
        };
        if let Err(source) = upload.await {
            tracing::error!(
                group_id = %group_id,
                path = %remote_path,
                error = %source,
                "Dataset upload failed"
            );
            return Err(PipelineError::DatasetPersistFailed { group_id, source });
        }

        let updated = db::groups::set_dataset(&self.db, group_id, &name, all_coded)
            .await?
            .ok_or(PipelineError::GroupNotFound(group_id))?;

        tracing::info!(
            group_id = %group_id,
            entries = dataset.len(),
            all_images_coded = all_coded,
            "Dataset built"
        );

        Ok(updated)
    }

    /// Drop the group's dataset pointer; the uploaded artifact stays on the store
    pub async fn delete_dataset(&self, group_id: Uuid) -> Result<Group, PipelineError> {
        let group = db::groups::clear_dataset(&self.db, group_id)
            .await?
            .ok_or(PipelineError::GroupNotFound(group_id))?;

        tracing::info!(group_id = %group_id, "Dataset cleared");
        Ok(group)
    }
}
