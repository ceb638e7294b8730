//! Database models
//!
//! JSON field names are camelCase to match the public API (`allImagesCoded`, `userId`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named set of profiles that can be used for recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Dataset artifact name (`<groupId>.json`), set only by a successful build
    pub dataset: Option<String>,
    /// True iff the last successful build encoded every member image
    pub all_images_coded: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub user_id: String,
}

/// Editable group fields. `dataset` and `allImagesCoded` are deliberately absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// Reference image of a profile
///
/// `is_coded` and `coder` are always written together: `is_coded == true`
/// implies `coder` holds the token returned by the analytics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    /// File name inside the owning profile's directory on the file store
    pub image_file: String,
    pub coder: Option<String>,
    pub is_coded: bool,
    pub profile_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Image {
    /// Embedding token, only if the image is marked coded
    pub fn embedding(&self) -> Option<&str> {
        if self.is_coded {
            self.coder.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewImage {
    pub image_file: String,
    pub profile_id: Uuid,
}

/// Membership of one profile in one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileGroup {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub group_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Profile with its images, eagerly loaded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileWithImages {
    #[serde(flatten)]
    pub profile: Profile,
    pub images: Vec<Image>,
}

/// Group with member profiles and their images, eagerly loaded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: Group,
    pub profiles: Vec<ProfileWithImages>,
}
