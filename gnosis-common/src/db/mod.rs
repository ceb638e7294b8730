//! Database access layer
//!
//! Entity persistence for groups, profiles, images and profile/group memberships.
//! Ids are UUID v4 stored as TEXT, timestamps are RFC 3339 TEXT.

pub mod groups;
pub mod images;
pub mod init;
pub mod models;
pub mod profile_groups;
pub mod profiles;

pub use init::{create_schema, init_database};
pub use models::{
    Group, GroupUpdate, GroupWithMembers, Image, NewGroup, NewImage, NewProfile, Profile,
    ProfileGroup, ProfileUpdate, ProfileWithImages,
};

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::CorruptRecord(format!("bad id '{}': {}", value, e)))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::CorruptRecord(format!("bad timestamp '{}': {}", value, e)))
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
