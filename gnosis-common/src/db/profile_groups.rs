//! Profile/group membership persistence

use super::models::ProfileGroup;
use super::{now_rfc3339, parse_timestamp, parse_uuid};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn membership_from_row(row: &SqliteRow) -> Result<ProfileGroup> {
    let id: String = row.get("id");
    let profile_id: String = row.get("profile_id");
    let group_id: String = row.get("group_id");
    let created_at: String = row.get("created_at");

    Ok(ProfileGroup {
        id: parse_uuid(&id)?,
        profile_id: parse_uuid(&profile_id)?,
        group_id: parse_uuid(&group_id)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

async fn get_membership_by_pair(
    pool: &SqlitePool,
    profile_id: Uuid,
    group_id: Uuid,
) -> Result<Option<ProfileGroup>> {
    let row = sqlx::query(
        "SELECT id, profile_id, group_id, created_at FROM profile_groups WHERE profile_id = ? AND group_id = ?",
    )
    .bind(profile_id.to_string())
    .bind(group_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(membership_from_row).transpose()
}

pub async fn get_membership(pool: &SqlitePool, id: Uuid) -> Result<Option<ProfileGroup>> {
    let row = sqlx::query(
        "SELECT id, profile_id, group_id, created_at FROM profile_groups WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(membership_from_row).transpose()
}

/// Add one profile to a group. Adding an existing member returns the existing row.
pub async fn add_member(
    pool: &SqlitePool,
    group_id: Uuid,
    profile_id: Uuid,
) -> Result<ProfileGroup> {
    sqlx::query(
        r#"
        INSERT INTO profile_groups (id, profile_id, group_id, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(profile_id, group_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(profile_id.to_string())
    .bind(group_id.to_string())
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    get_membership_by_pair(pool, profile_id, group_id)
        .await?
        .ok_or_else(|| {
            crate::Error::Internal(format!(
                "membership {}/{} vanished after insert",
                group_id, profile_id
            ))
        })
}

/// Add many profiles to one group in a single transaction.
///
/// Profiles that are already members are skipped. Returns the memberships of
/// every requested profile in request order.
pub async fn add_members(
    pool: &SqlitePool,
    group_id: Uuid,
    profile_ids: &[Uuid],
) -> Result<Vec<ProfileGroup>> {
    let mut tx = pool.begin().await?;
    let now = now_rfc3339();

    for profile_id in profile_ids {
        sqlx::query(
            r#"
            INSERT INTO profile_groups (id, profile_id, group_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(profile_id, group_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(profile_id.to_string())
        .bind(group_id.to_string())
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let mut memberships = Vec::with_capacity(profile_ids.len());
    for profile_id in profile_ids {
        if let Some(membership) = get_membership_by_pair(pool, *profile_id, group_id).await? {
            if !memberships.iter().any(|m: &ProfileGroup| m.id == membership.id) {
                memberships.push(membership);
            }
        }
    }
    Ok(memberships)
}

pub async fn remove_member(pool: &SqlitePool, id: Uuid) -> Result<Option<ProfileGroup>> {
    let Some(membership) = get_membership(pool, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM profile_groups WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(Some(membership))
}

/// Remove many memberships by id. Returns how many rows were deleted.
pub async fn remove_members(pool: &SqlitePool, ids: &[Uuid]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut removed = 0;

    for id in ids {
        let result = sqlx::query("DELETE FROM profile_groups WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        removed += result.rows_affected();
    }

    tx.commit().await?;
    Ok(removed)
}

/// Memberships of a group in the order they were created
pub async fn list_members(pool: &SqlitePool, group_id: Uuid) -> Result<Vec<ProfileGroup>> {
    let rows = sqlx::query(
        "SELECT id, profile_id, group_id, created_at FROM profile_groups WHERE group_id = ? ORDER BY rowid",
    )
    .bind(group_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(membership_from_row).collect()
}
