//! Group persistence
//!
//! `dataset` and `all_images_coded` are only written through [`set_dataset`] and
//! [`clear_dataset`]; the general update path cannot touch them.

use super::models::{Group, GroupUpdate, GroupWithMembers, NewGroup, ProfileWithImages};
use super::{images, now_rfc3339, parse_timestamp, parse_uuid, profiles};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const GROUP_COLUMNS: &str =
    "id, name, description, dataset, all_images_coded, user_id, created_at, updated_at";

fn group_from_row(row: &SqliteRow) -> Result<Group> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Group {
        id: parse_uuid(&id)?,
        name: row.get("name"),
        description: row.get("description"),
        dataset: row.get("dataset"),
        all_images_coded: row.get("all_images_coded"),
        user_id: row.get("user_id"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Insert a new group (no dataset, not coded)
pub async fn create_group(pool: &SqlitePool, new_group: &NewGroup) -> Result<Group> {
    let id = Uuid::new_v4();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO face_groups (id, name, description, dataset, all_images_coded, user_id, created_at, updated_at)
        VALUES (?, ?, ?, NULL, 0, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&new_group.name)
    .bind(&new_group.description)
    .bind(&new_group.user_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_group(pool, id)
        .await?
        .ok_or_else(|| crate::Error::Internal(format!("group {} vanished after insert", id)))
}

/// Load group by id
pub async fn get_group(pool: &SqlitePool, id: Uuid) -> Result<Option<Group>> {
    let row = sqlx::query(&format!("SELECT {} FROM face_groups WHERE id = ?", GROUP_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(group_from_row).transpose()
}

/// All groups, oldest first
pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<Group>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM face_groups ORDER BY created_at, rowid",
        GROUP_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(group_from_row).collect()
}

/// Groups owned by a user
pub async fn list_groups_by_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Group>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM face_groups WHERE user_id = ? ORDER BY created_at, rowid",
        GROUP_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(group_from_row).collect()
}

/// Update name/description. Returns `None` if the group does not exist.
pub async fn update_group(
    pool: &SqlitePool,
    id: Uuid,
    update: &GroupUpdate,
) -> Result<Option<Group>> {
    let result = sqlx::query(
        r#"
        UPDATE face_groups
        SET name = COALESCE(?, name),
            description = COALESCE(?, description),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.name)
    .bind(&update.description)
    .bind(now_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_group(pool, id).await
}

/// Delete a group and its memberships. Returns the deleted group.
pub async fn delete_group(pool: &SqlitePool, id: Uuid) -> Result<Option<Group>> {
    let Some(group) = get_group(pool, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM face_groups WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(Some(group))
}

/// Record a built dataset on the group
pub async fn set_dataset(
    pool: &SqlitePool,
    id: Uuid,
    dataset: &str,
    all_images_coded: bool,
) -> Result<Option<Group>> {
    let result = sqlx::query(
        "UPDATE face_groups SET dataset = ?, all_images_coded = ?, updated_at = ? WHERE id = ?",
    )
    .bind(dataset)
    .bind(all_images_coded)
    .bind(now_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_group(pool, id).await
}

/// Drop the dataset pointer and coded flag (remote artifact is left in place)
pub async fn clear_dataset(pool: &SqlitePool, id: Uuid) -> Result<Option<Group>> {
    let result = sqlx::query(
        "UPDATE face_groups SET dataset = NULL, all_images_coded = 0, updated_at = ? WHERE id = ?",
    )
    .bind(now_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_group(pool, id).await
}

/// Load a group with all member profiles and each profile's images
///
/// Profiles come back in membership order, images in insertion order.
pub async fn load_group_with_members(
    pool: &SqlitePool,
    id: Uuid,
) -> Result<Option<GroupWithMembers>> {
    let Some(group) = get_group(pool, id).await? else {
        return Ok(None);
    };

    let members = profiles::list_profiles_by_group(pool, id).await?;
    let mut profiles = Vec::with_capacity(members.len());
    for profile in members {
        let images = images::list_images_by_profile(pool, profile.id).await?;
        profiles.push(ProfileWithImages { profile, images });
    }

    Ok(Some(GroupWithMembers { group, profiles }))
}
