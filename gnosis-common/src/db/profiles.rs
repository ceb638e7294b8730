//! Profile persistence

use super::models::{NewProfile, Profile, ProfileUpdate};
use super::{now_rfc3339, parse_timestamp, parse_uuid};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn profile_from_row(row: &SqliteRow) -> Result<Profile> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Profile {
        id: parse_uuid(&id)?,
        name: row.get("name"),
        bio: row.get("bio"),
        user_id: row.get("user_id"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

pub async fn create_profile(pool: &SqlitePool, new_profile: &NewProfile) -> Result<Profile> {
    let id = Uuid::new_v4();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO profiles (id, name, bio, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&new_profile.name)
    .bind(&new_profile.bio)
    .bind(&new_profile.user_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_profile(pool, id)
        .await?
        .ok_or_else(|| crate::Error::Internal(format!("profile {} vanished after insert", id)))
}

pub async fn get_profile(pool: &SqlitePool, id: Uuid) -> Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT id, name, bio, user_id, created_at, updated_at FROM profiles WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(profile_from_row).transpose()
}

pub async fn list_profiles_by_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Profile>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, bio, user_id, created_at, updated_at
        FROM profiles
        WHERE user_id = ?
        ORDER BY created_at, rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(profile_from_row).collect()
}

/// Member profiles of a group, in the order they joined
pub async fn list_profiles_by_group(pool: &SqlitePool, group_id: Uuid) -> Result<Vec<Profile>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.name, p.bio, p.user_id, p.created_at, p.updated_at
        FROM profile_groups pg
        JOIN profiles p ON p.id = pg.profile_id
        WHERE pg.group_id = ?
        ORDER BY pg.rowid
        "#,
    )
    .bind(group_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(profile_from_row).collect()
}

/// Profiles of the group owner that are not members of the group yet
pub async fn list_profiles_not_in_group(
    pool: &SqlitePool,
    group_id: Uuid,
) -> Result<Vec<Profile>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.name, p.bio, p.user_id, p.created_at, p.updated_at
        FROM profiles p
        JOIN face_groups g ON g.id = ? AND g.user_id = p.user_id
        WHERE NOT EXISTS (
            SELECT 1 FROM profile_groups pg
            WHERE pg.group_id = g.id AND pg.profile_id = p.id
        )
        ORDER BY p.created_at, p.rowid
        "#,
    )
    .bind(group_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(profile_from_row).collect()
}

pub async fn update_profile(
    pool: &SqlitePool,
    id: Uuid,
    update: &ProfileUpdate,
) -> Result<Option<Profile>> {
    let result = sqlx::query(
        r#"
        UPDATE profiles
        SET name = COALESCE(?, name),
            bio = COALESCE(?, bio),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.name)
    .bind(&update.bio)
    .bind(now_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_profile(pool, id).await
}

/// Delete a profile; its images and memberships cascade
pub async fn delete_profile(pool: &SqlitePool, id: Uuid) -> Result<Option<Profile>> {
    let Some(profile) = get_profile(pool, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM profiles WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(Some(profile))
}
