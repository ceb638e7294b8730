//! Database layer tests
//!
//! Each test runs against a fresh on-disk SQLite database in a temp directory.

use gnosis_common::db::{self, groups, images, profile_groups, profiles};
use gnosis_common::db::{GroupUpdate, NewGroup, NewImage, NewProfile};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::init_database(&temp_dir.path().join("test_gnosis.db"))
        .await
        .expect("database should initialize");
    (temp_dir, pool)
}

async fn create_profile(pool: &SqlitePool, name: &str) -> db::Profile {
    profiles::create_profile(
        pool,
        &NewProfile {
            name: name.to_string(),
            bio: None,
            user_id: "user-1".to_string(),
        },
    )
    .await
    .unwrap()
}

async fn create_group(pool: &SqlitePool) -> db::Group {
    groups::create_group(
        pool,
        &NewGroup {
            name: "office".to_string(),
            description: Some("front door".to_string()),
            user_id: "user-1".to_string(),
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("gnosis.db");

    let pool = db::init_database(&path).await.unwrap();
    db::create_schema(&pool).await.unwrap();
    drop(pool);

    // Re-open existing database
    let pool = db::init_database(&path).await.unwrap();
    assert!(groups::list_groups(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_new_group_has_no_dataset() {
    let (_dir, pool) = create_test_db().await;
    let group = create_group(&pool).await;

    assert_eq!(group.name, "office");
    assert_eq!(group.dataset, None);
    assert!(!group.all_images_coded);

    let loaded = groups::get_group(&pool, group.id).await.unwrap().unwrap();
    assert_eq!(loaded, group);
}

#[tokio::test]
async fn test_update_group_does_not_touch_dataset() {
    let (_dir, pool) = create_test_db().await;
    let group = create_group(&pool).await;
    groups::set_dataset(&pool, group.id, "x.json", true).await.unwrap();

    let updated = groups::update_group(
        &pool,
        group.id,
        &GroupUpdate {
            name: Some("lobby".to_string()),
            description: None,
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.name, "lobby");
    assert_eq!(updated.description.as_deref(), Some("front door"));
    assert_eq!(updated.dataset.as_deref(), Some("x.json"));
    assert!(updated.all_images_coded);
}

#[tokio::test]
async fn test_set_and_clear_dataset() {
    let (_dir, pool) = create_test_db().await;
    let group = create_group(&pool).await;

    let built = groups::set_dataset(&pool, group.id, "g.json", true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(built.dataset.as_deref(), Some("g.json"));
    assert!(built.all_images_coded);

    let cleared = groups::clear_dataset(&pool, group.id).await.unwrap().unwrap();
    assert_eq!(cleared.dataset, None);
    assert!(!cleared.all_images_coded);

    assert!(groups::clear_dataset(&pool, Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_image_encoding_sets_both_fields() {
    let (_dir, pool) = create_test_db().await;
    let profile = create_profile(&pool, "Ana").await;
    let image = images::create_image(
        &pool,
        &NewImage {
            image_file: "a.jpg".to_string(),
            profile_id: profile.id,
        },
    )
    .await
    .unwrap();

    assert!(!image.is_coded);
    assert_eq!(image.coder, None);
    assert_eq!(image.embedding(), None);

    assert!(images::set_image_encoding(&pool, image.id, "tok").await.unwrap());
    let coded = images::get_image(&pool, image.id).await.unwrap().unwrap();
    assert!(coded.is_coded);
    assert_eq!(coded.coder.as_deref(), Some("tok"));
    assert_eq!(coded.embedding(), Some("tok"));

    assert!(!images::set_image_encoding(&pool, Uuid::new_v4(), "tok").await.unwrap());
}

#[tokio::test]
async fn test_coded_without_token_is_rejected_by_schema() {
    let (_dir, pool) = create_test_db().await;
    let profile = create_profile(&pool, "Ana").await;
    let image = images::create_image(
        &pool,
        &NewImage {
            image_file: "a.jpg".to_string(),
            profile_id: profile.id,
        },
    )
    .await
    .unwrap();

    let result = sqlx::query("UPDATE images SET is_coded = 1 WHERE id = ?")
        .bind(image.id.to_string())
        .execute(&pool)
        .await;
    assert!(result.is_err(), "CHECK constraint should reject coded image without token");
}

#[tokio::test]
async fn test_group_members_load_in_membership_order() {
    let (_dir, pool) = create_test_db().await;
    let group = create_group(&pool).await;
    let second = create_profile(&pool, "Second").await;
    let first = create_profile(&pool, "First").await;

    for file in ["1.jpg", "2.jpg"] {
        images::create_image(
            &pool,
            &NewImage {
                image_file: file.to_string(),
                profile_id: first.id,
            },
        )
        .await
        .unwrap();
    }

    // Join order, not creation order, decides iteration order
    profile_groups::add_member(&pool, group.id, first.id).await.unwrap();
    profile_groups::add_member(&pool, group.id, second.id).await.unwrap();

    let loaded = groups::load_group_with_members(&pool, group.id)
        .await
        .unwrap()
        .unwrap();
    let names: Vec<_> = loaded.profiles.iter().map(|p| p.profile.name.as_str()).collect();
    assert_eq!(names, vec!["First", "Second"]);

    let files: Vec<_> = loaded.profiles[0]
        .images
        .iter()
        .map(|i| i.image_file.as_str())
        .collect();
    assert_eq!(files, vec!["1.jpg", "2.jpg"]);
    assert!(loaded.profiles[1].images.is_empty());

    assert!(groups::load_group_with_members(&pool, Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_bulk_membership_add_and_remove() {
    let (_dir, pool) = create_test_db().await;
    let group = create_group(&pool).await;
    let a = create_profile(&pool, "A").await;
    let b = create_profile(&pool, "B").await;

    let added = profile_groups::add_members(&pool, group.id, &[a.id, b.id, a.id])
        .await
        .unwrap();
    assert_eq!(added.len(), 2);

    // Re-adding is harmless
    let again = profile_groups::add_member(&pool, group.id, a.id).await.unwrap();
    assert_eq!(again.id, added[0].id);
    assert_eq!(profile_groups::list_members(&pool, group.id).await.unwrap().len(), 2);

    let outsiders = profiles::list_profiles_not_in_group(&pool, group.id).await.unwrap();
    assert!(outsiders.is_empty());

    let removed = profile_groups::remove_members(&pool, &[added[0].id, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let outsiders = profiles::list_profiles_not_in_group(&pool, group.id).await.unwrap();
    assert_eq!(outsiders.len(), 1);
    assert_eq!(outsiders[0].id, a.id);

    let single = profile_groups::remove_member(&pool, added[1].id).await.unwrap();
    assert!(single.is_some());
    assert!(profile_groups::list_members(&pool, group.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_profile_cascades() {
    let (_dir, pool) = create_test_db().await;
    let group = create_group(&pool).await;
    let profile = create_profile(&pool, "Gone").await;
    let image = images::create_image(
        &pool,
        &NewImage {
            image_file: "a.jpg".to_string(),
            profile_id: profile.id,
        },
    )
    .await
    .unwrap();
    profile_groups::add_member(&pool, group.id, profile.id).await.unwrap();

    profiles::delete_profile(&pool, profile.id).await.unwrap().unwrap();

    assert!(images::get_image(&pool, image.id).await.unwrap().is_none());
    assert!(profile_groups::list_members(&pool, group.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_by_user() {
    let (_dir, pool) = create_test_db().await;
    let group = create_group(&pool).await;
    let profile = create_profile(&pool, "Ana").await;
    images::create_image(
        &pool,
        &NewImage {
            image_file: "a.jpg".to_string(),
            profile_id: profile.id,
        },
    )
    .await
    .unwrap();

    assert_eq!(groups::list_groups_by_user(&pool, "user-1").await.unwrap(), vec![group]);
    assert!(groups::list_groups_by_user(&pool, "user-2").await.unwrap().is_empty());
    assert_eq!(profiles::list_profiles_by_user(&pool, "user-1").await.unwrap().len(), 1);
    assert_eq!(images::list_images_by_user(&pool, "user-1").await.unwrap().len(), 1);
}
