//! Seeded database plus fakes wired into an [`AppState`]

use gnosis_common::db::{self, Group, Image, NewGroup, NewImage, NewProfile, Profile};
use gnosis_cs::services::StoreLayout;
use gnosis_cs::AppState;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

use super::fakes::{FakeEncoder, FakeSignaling, MemoryFileStore};

/// Create a temporary on-disk database
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::init_database(&temp_dir.path().join("test_gnosis.db"))
        .await
        .unwrap();
    (temp_dir, pool)
}

pub struct Harness {
    _temp_dir: TempDir,
    pub db: SqlitePool,
    pub store: Arc<MemoryFileStore>,
    pub encoder: Arc<FakeEncoder>,
    pub signaling: Arc<FakeSignaling>,
    pub layout: StoreLayout,
    pub state: AppState,
}

impl Harness {
    pub async fn new() -> Self {
        let (temp_dir, db) = create_test_db().await;
        let store = Arc::new(MemoryFileStore::new());
        let encoder = Arc::new(FakeEncoder::new());
        let signaling = Arc::new(FakeSignaling::new());
        let layout = StoreLayout::default();

        let state = AppState::new(
            db.clone(),
            store.clone(),
            encoder.clone(),
            signaling.clone(),
            layout.clone(),
        );

        Self {
            _temp_dir: temp_dir,
            db,
            store,
            encoder,
            signaling,
            layout,
            state,
        }
    }

    pub async fn group(&self, name: &str) -> Group {
        db::groups::create_group(
            &self.db,
            &NewGroup {
                name: name.to_string(),
                description: None,
                user_id: "user-1".to_string(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn profile(&self, name: &str) -> Profile {
        db::profiles::create_profile(
            &self.db,
            &NewProfile {
                name: name.to_string(),
                bio: None,
                user_id: "user-1".to_string(),
            },
        )
        .await
        .unwrap()
    }

    /// Register an image and upload `bytes` to its remote path
    pub async fn image(&self, profile: &Profile, file: &str, bytes: &[u8]) -> Image {
        let image = self.image_record(profile, file).await;
        self.store
            .insert(&self.layout.image_path(profile, &image), bytes);
        image
    }

    /// Register an image that was already encoded with `token`
    pub async fn coded_image(&self, profile: &Profile, file: &str, token: &str) -> Image {
        let image = self.image(profile, file, file.as_bytes()).await;
        db::images::set_image_encoding(&self.db, image.id, token)
            .await
            .unwrap();
        db::images::get_image(&self.db, image.id).await.unwrap().unwrap()
    }

    /// Register an image without uploading anything
    pub async fn image_record(&self, profile: &Profile, file: &str) -> Image {
        db::images::create_image(
            &self.db,
            &NewImage {
                image_file: file.to_string(),
                profile_id: profile.id,
            },
        )
        .await
        .unwrap()
    }

    pub async fn join(&self, group: &Group, profile: &Profile) {
        db::profile_groups::add_member(&self.db, group.id, profile.id)
            .await
            .unwrap();
    }

    pub async fn reload_group(&self, group: &Group) -> Group {
        db::groups::get_group(&self.db, group.id).await.unwrap().unwrap()
    }

    pub async fn reload_image(&self, image: &Image) -> Image {
        db::images::get_image(&self.db, image.id).await.unwrap().unwrap()
    }

    /// Parsed dataset artifact for a group, if uploaded
    pub fn dataset_json(&self, group: &Group) -> Option<serde_json::Value> {
        let path = self
            .layout
            .dataset_path(&StoreLayout::dataset_name(group.id));
        self.store
            .contents(&path)
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }
}
