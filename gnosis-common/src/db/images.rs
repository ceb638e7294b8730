//! Image persistence
//!
//! `is_coded` and `coder` are written by a single statement in [`set_image_encoding`],
//! so no reader can observe one without the other.

use super::models::{Image, NewImage};
use super::{now_rfc3339, parse_timestamp, parse_uuid};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn image_from_row(row: &SqliteRow) -> Result<Image> {
    let id: String = row.get("id");
    let profile_id: String = row.get("profile_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Image {
        id: parse_uuid(&id)?,
        image_file: row.get("image_file"),
        coder: row.get("coder"),
        is_coded: row.get("is_coded"),
        profile_id: parse_uuid(&profile_id)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Register an image whose bytes are already on the file store. New images are uncoded.
pub async fn create_image(pool: &SqlitePool, new_image: &NewImage) -> Result<Image> {
    let id = Uuid::new_v4();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO images (id, image_file, coder, is_coded, profile_id, created_at, updated_at)
        VALUES (?, ?, NULL, 0, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&new_image.image_file)
    .bind(new_image.profile_id.to_string())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_image(pool, id)
        .await?
        .ok_or_else(|| crate::Error::Internal(format!("image {} vanished after insert", id)))
}

pub async fn get_image(pool: &SqlitePool, id: Uuid) -> Result<Option<Image>> {
    let row = sqlx::query(
        r#"
        SELECT id, image_file, coder, is_coded, profile_id, created_at, updated_at
        FROM images
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(image_from_row).transpose()
}

/// Images of a profile in insertion order
pub async fn list_images_by_profile(pool: &SqlitePool, profile_id: Uuid) -> Result<Vec<Image>> {
    let rows = sqlx::query(
        r#"
        SELECT id, image_file, coder, is_coded, profile_id, created_at, updated_at
        FROM images
        WHERE profile_id = ?
        ORDER BY rowid
        "#,
    )
    .bind(profile_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(image_from_row).collect()
}

/// Images across every profile owned by a user
pub async fn list_images_by_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Image>> {
    let rows = sqlx::query(
        r#"
        SELECT i.id, i.image_file, i.coder, i.is_coded, i.profile_id, i.created_at, i.updated_at
        FROM images i
        JOIN profiles p ON p.id = i.profile_id
        WHERE p.user_id = ?
        ORDER BY i.rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(image_from_row).collect()
}

/// Mark an image coded with its embedding token.
///
/// Returns `false` if no such image exists.
pub async fn set_image_encoding(pool: &SqlitePool, id: Uuid, coder: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE images SET is_coded = 1, coder = ?, updated_at = ? WHERE id = ?",
    )
    .bind(coder)
    .bind(now_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_image(pool: &SqlitePool, id: Uuid) -> Result<Option<Image>> {
    let Some(image) = get_image(pool, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM images WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(Some(image))
}
