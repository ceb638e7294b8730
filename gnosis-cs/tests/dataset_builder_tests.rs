//! Dataset build pipeline tests

mod helpers;

use gnosis_cs::services::StoreLayout;
use gnosis_cs::{ErrorKind, PipelineError};
use helpers::{FakeEncoder, Harness};
use serde_json::json;

#[tokio::test]
async fn test_build_encodes_only_uncoded_images() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    let p2 = h.profile("P2").await;
    h.coded_image(&p1, "a.jpg", "abc").await;
    let uncoded = h.image(&p1, "b.jpg", b"b-bytes").await;
    h.coded_image(&p2, "c.jpg", "xyz").await;
    h.join(&group, &p1).await;
    h.join(&group, &p2).await;

    let built = h.state.dataset_builder.build(group.id).await.unwrap();

    assert_eq!(
        h.encoder.calls(),
        vec![vec![("P1".to_string(), "b.jpg".to_string())]]
    );
    let new_token = FakeEncoder::token_for(b"b-bytes");
    assert_eq!(
        h.dataset_json(&group).unwrap(),
        json!([["P1", "abc"], ["P1", new_token], ["P2", "xyz"]])
    );
    assert_eq!(built.dataset, Some(format!("{}.json", group.id)));
    assert!(built.all_images_coded);

    let image = h.reload_image(&uncoded).await;
    assert!(image.is_coded);
    assert_eq!(image.coder.as_deref(), Some(new_token.as_str()));
    assert!(h.store.has_dir(h.layout.root()));
}

#[tokio::test]
async fn test_build_is_idempotent() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    h.coded_image(&p1, "a.jpg", "abc").await;
    h.coded_image(&p1, "b.jpg", "def").await;
    h.join(&group, &p1).await;

    h.state.dataset_builder.build(group.id).await.unwrap();
    let first = h.dataset_json(&group).unwrap();
    h.state.dataset_builder.build(group.id).await.unwrap();
    let second = h.dataset_json(&group).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, json!([["P1", "abc"], ["P1", "def"]]));
    assert_eq!(h.encoder.call_count(), 0);
    assert_eq!(h.store.put_count(), 2);
}

#[tokio::test]
async fn test_delete_then_rebuild_does_not_reencode() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    h.image(&p1, "a.jpg", b"face").await;
    h.join(&group, &p1).await;

    h.state.dataset_builder.build(group.id).await.unwrap();
    assert_eq!(h.encoder.call_count(), 1);

    let cleared = h.state.dataset_builder.delete_dataset(group.id).await.unwrap();
    assert_eq!(cleared.dataset, None);
    assert!(!cleared.all_images_coded);
    // Artifact is left on the store
    assert!(h.dataset_json(&group).is_some());

    let rebuilt = h.state.dataset_builder.build(group.id).await.unwrap();
    assert_eq!(rebuilt.dataset, Some(StoreLayout::dataset_name(group.id)));
    assert!(rebuilt.all_images_coded);
    assert_eq!(h.encoder.call_count(), 1);
}

#[tokio::test]
async fn test_encoder_failure_leaves_group_untouched() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    h.coded_image(&p1, "a.jpg", "abc").await;
    h.image(&p1, "b.jpg", b"b-bytes").await;
    h.join(&group, &p1).await;
    let before = h.reload_group(&group).await;

    h.encoder.fail(true);
    let err = h.state.dataset_builder.build(group.id).await.unwrap_err();

    assert!(matches!(err, PipelineError::Encoding(_)));
    assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
    assert_eq!(h.reload_group(&group).await, before);
    assert_eq!(h.store.put_count(), 0);
    assert!(h.dataset_json(&group).is_none());
}

#[tokio::test]
async fn test_encoder_failure_keeps_previous_dataset() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    h.coded_image(&p1, "a.jpg", "abc").await;
    h.join(&group, &p1).await;
    let built = h.state.dataset_builder.build(group.id).await.unwrap();

    h.image(&p1, "b.jpg", b"new").await;
    h.encoder.fail(true);
    assert!(h.state.dataset_builder.build(group.id).await.is_err());

    let after = h.reload_group(&group).await;
    assert_eq!(after.dataset, built.dataset);
    assert!(after.all_images_coded);
    assert_eq!(h.dataset_json(&group).unwrap(), json!([["P1", "abc"]]));
}

#[tokio::test]
async fn test_empty_group() {
    let h = Harness::new().await;
    let group = h.group("G").await;

    let err = h.state.dataset_builder.build(group.id).await.unwrap_err();

    assert!(matches!(err, PipelineError::EmptyGroup(id) if id == group.id));
    assert_eq!(err.kind(), ErrorKind::EmptyInput);
    assert_eq!(h.reload_group(&group).await, group);
}

#[tokio::test]
async fn test_members_without_images_give_empty_dataset() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    h.join(&group, &p1).await;

    let err = h.state.dataset_builder.build(group.id).await.unwrap_err();

    assert!(matches!(err, PipelineError::EmptyDataset(_)));
    assert_eq!(h.store.put_count(), 0);
}

#[tokio::test]
async fn test_unknown_group() {
    let h = Harness::new().await;
    let missing = uuid::Uuid::new_v4();

    let err = h.state.dataset_builder.build(missing).await.unwrap_err();
    assert!(matches!(err, PipelineError::GroupNotFound(id) if id == missing));

    let err = h
        .state
        .dataset_builder
        .delete_dataset(missing)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_upload_failure_does_not_set_pointer() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    h.coded_image(&p1, "a.jpg", "abc").await;
    h.join(&group, &p1).await;

    h.store.fail_puts(true);
    let err = h.state.dataset_builder.build(group.id).await.unwrap_err();

    assert!(matches!(err, PipelineError::DatasetPersistFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::PersistFailed);
    let after = h.reload_group(&group).await;
    assert_eq!(after.dataset, None);
    assert!(!after.all_images_coded);
}

#[tokio::test]
async fn test_missing_image_file_is_skipped() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    h.image(&p1, "a.jpg", b"a").await;
    let lost = h.image_record(&p1, "lost.jpg").await;
    h.join(&group, &p1).await;

    let built = h.state.dataset_builder.build(group.id).await.unwrap();

    assert!(!built.all_images_coded);
    assert_eq!(
        h.dataset_json(&group).unwrap(),
        json!([["P1", FakeEncoder::token_for(b"a")]])
    );
    assert!(!h.reload_image(&lost).await.is_coded);
}

#[tokio::test]
async fn test_profiles_encoded_one_call_each_in_membership_order() {
    let h = Harness::new().await;
    let group = h.group("G").await;
    let p1 = h.profile("P1").await;
    let p2 = h.profile("P2").await;
    h.image(&p2, "x.jpg", b"x").await;
    h.image(&p2, "y.jpg", b"y").await;
    h.image(&p1, "z.jpg", b"z").await;
    h.join(&group, &p2).await;
    h.join(&group, &p1).await;

    h.state.dataset_builder.build(group.id).await.unwrap();

    let calls = h.encoder.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].len(), 2);
    assert!(calls[0].iter().all(|(label, _)| label == "P2"));
    assert_eq!(calls[1], vec![("P1".to_string(), "z.jpg".to_string())]);
    assert_eq!(
        h.dataset_json(&group).unwrap(),
        json!([["P2", "tok:x"], ["P2", "tok:y"], ["P1", "tok:z"]])
    );
}
