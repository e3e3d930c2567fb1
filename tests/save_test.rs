//! 履歴保存コーディネーターのテスト
//!
//! 二重送信ガード・前提条件・失敗時の状態・Saved の自動リセットを検証

mod support;

use crop_ai_rust::error::CropAiError;
use crop_ai_rust::pipeline::{BatchPipeline, Pacer};
use crop_ai_rust::registry::{ItemRegistry, ItemStatus, NoPreview, SelectionMode};
use crop_ai_rust::save::{SaveCoordinator, SaveOutcome, SaveStatus};
use std::sync::Arc;
use std::time::Duration;
use support::{images, StubClassifier, StubStore};

const TOKEN: &str = "jwt-token";
const RESET: Duration = Duration::from_secs(2);

/// a.jpg, b.jpg は Completed、c.jpg は Error
async fn analyzed_registry() -> ItemRegistry {
    let mut reg = ItemRegistry::new(Arc::new(NoPreview));
    reg.select(images(&["a.jpg", "b.jpg", "c.jpg"]), SelectionMode::Batch)
        .unwrap();
    let classifier = StubClassifier::new(&[("a.jpg", "Wheat Stem Rust"), ("b.jpg", "Wheat Healthy")]);
    let pipeline = BatchPipeline::new(classifier, Pacer::new(Duration::ZERO));
    pipeline.start(&mut reg).unwrap().run_to_end(|_| {}).await;
    reg
}

#[tokio::test]
async fn test_save_sends_full_payload() {
    let reg = analyzed_registry().await;
    let coordinator = SaveCoordinator::new(StubStore::default(), RESET);
    let item = &reg.items()[0];

    let outcome = coordinator.save(item, Some(TOKEN)).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Saved { prediction_id: "pred-1".to_string() });
    assert_eq!(coordinator.status(item.id()), SaveStatus::Saved);

    let records = coordinator.store().records.lock().unwrap();
    let (record, token) = &records[0];
    assert_eq!(token, TOKEN);
    assert_eq!(record.filename, "a.jpg");
    assert_eq!(record.disease, "Wheat Stem Rust");
    assert_eq!(record.confidence, 0.9);
    assert_eq!(record.tips, "test tips");
    assert_eq!(record.top2_class.as_deref(), Some("Second"));
    assert!(record.top3_class.is_none());
    // "a.jpg" の base64
    assert_eq!(record.image_base64, "data:image/jpeg;base64,YS5qcGc=");
}

/// 連続で2回呼んでも送信は1回
#[tokio::test]
async fn test_double_save_sends_once() {
    let reg = analyzed_registry().await;
    let coordinator = SaveCoordinator::new(StubStore::with_latency(Duration::from_millis(50)), RESET);
    let item = &reg.items()[0];

    let (first, second) = tokio::join!(
        coordinator.save(item, Some(TOKEN)),
        coordinator.save(item, Some(TOKEN)),
    );

    assert!(matches!(first.unwrap(), SaveOutcome::Saved { .. }));
    assert_eq!(second.unwrap(), SaveOutcome::Skipped(SaveStatus::Saving));
    assert_eq!(coordinator.store().save_calls(), 1);

    // 保存済みの間も何もしない
    let third = coordinator.save(item, Some(TOKEN)).await.unwrap();
    assert_eq!(third, SaveOutcome::Skipped(SaveStatus::Saved));
    assert_eq!(coordinator.store().save_calls(), 1);
}

/// 別々の画像は同時に保存できる
#[tokio::test]
async fn test_distinct_items_save_concurrently() {
    let reg = analyzed_registry().await;
    let coordinator = SaveCoordinator::new(StubStore::with_latency(Duration::from_millis(50)), RESET);
    let (a, b) = (&reg.items()[0], &reg.items()[1]);

    let (ra, rb) = tokio::join!(coordinator.save(a, Some(TOKEN)), coordinator.save(b, Some(TOKEN)));
    assert!(matches!(ra.unwrap(), SaveOutcome::Saved { .. }));
    assert!(matches!(rb.unwrap(), SaveOutcome::Saved { .. }));
    assert_eq!(coordinator.store().save_calls(), 2);
}

#[tokio::test]
async fn test_not_authenticated_no_network() {
    let reg = analyzed_registry().await;
    let coordinator = SaveCoordinator::new(StubStore::default(), RESET);
    let item = &reg.items()[0];

    for credential in [None, Some(""), Some("   ")] {
        let err = coordinator.save(item, credential).await.unwrap_err();
        assert!(matches!(err, CropAiError::NotAuthenticated));
    }
    assert_eq!(coordinator.store().save_calls(), 0);
    assert_eq!(coordinator.status(item.id()), SaveStatus::Idle);
}

#[tokio::test]
async fn test_failed_item_cannot_be_saved() {
    let reg = analyzed_registry().await;
    let coordinator = SaveCoordinator::new(StubStore::default(), RESET);
    let failed = &reg.items()[2];
    assert_eq!(failed.status(), ItemStatus::Error);

    let err = coordinator.save(failed, Some(TOKEN)).await.unwrap_err();
    assert!(matches!(err, CropAiError::ItemNotCompleted(_)));
    assert_eq!(coordinator.store().save_calls(), 0);
    assert_eq!(coordinator.status(failed.id()), SaveStatus::Idle);
}

/// 失敗は Failed になり、呼び出し側に理由が返る。再試行は可能
#[tokio::test]
async fn test_store_failure_surfaces() {
    let reg = analyzed_registry().await;
    let coordinator = SaveCoordinator::new(StubStore::failing("Token expired"), RESET);
    let item = &reg.items()[1];

    let err = coordinator.save(item, Some(TOKEN)).await.unwrap_err();
    match err {
        CropAiError::SaveFailed(message) => assert!(message.contains("Token expired")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(coordinator.status(item.id()), SaveStatus::Failed);

    // 自動では再送しない。明示的に呼べばもう一度送る
    assert_eq!(coordinator.store().save_calls(), 1);
    assert!(coordinator.save(item, Some(TOKEN)).await.is_err());
    assert_eq!(coordinator.store().save_calls(), 2);
}

/// Saved は一定時間後に Idle へ戻る
#[tokio::test(start_paused = true)]
async fn test_saved_is_transient() {
    let reg = analyzed_registry().await;
    let coordinator = SaveCoordinator::new(StubStore::default(), RESET);
    let item = &reg.items()[0];

    coordinator.save(item, Some(TOKEN)).await.unwrap();
    assert_eq!(coordinator.status(item.id()), SaveStatus::Saved);

    tokio::time::sleep(RESET / 2).await;
    assert_eq!(coordinator.status(item.id()), SaveStatus::Saved);

    tokio::time::sleep(RESET).await;
    assert_eq!(coordinator.status(item.id()), SaveStatus::Idle);

    // Idle に戻れば再保存できる
    let again = coordinator.save(item, Some(TOKEN)).await.unwrap();
    assert!(matches!(again, SaveOutcome::Saved { .. }));
    assert_eq!(coordinator.store().save_calls(), 2);
}

/// 失敗は件数に残り、成功した保存はリセット後に状態が残らない
#[tokio::test(start_paused = true)]
async fn test_failed_count_and_reset() {
    let reg = analyzed_registry().await;
    let failing = SaveCoordinator::new(StubStore::failing("boom"), RESET);
    let item = &reg.items()[0];

    let _ = failing.save(item, Some(TOKEN)).await;
    assert_eq!(failing.status(item.id()), SaveStatus::Failed);
    assert_eq!(failing.failed_count(), 1);

    let coordinator = SaveCoordinator::new(StubStore::default(), RESET);
    let _ = coordinator.save(item, Some(TOKEN)).await;
    assert_eq!(coordinator.failed_count(), 0);

    tokio::time::sleep(RESET * 2).await;
    assert_eq!(coordinator.status(item.id()), SaveStatus::Idle);
    assert_eq!(coordinator.failed_count(), 0);
}

/// 送信中に呼び出し側が待つのをやめても Saving のまま残らない
#[tokio::test(start_paused = true)]
async fn test_cancelled_save_can_be_retried() {
    let reg = analyzed_registry().await;
    let coordinator = SaveCoordinator::new(StubStore::with_latency(Duration::from_secs(10)), RESET);
    let item = &reg.items()[0];

    let cancelled = tokio::time::timeout(Duration::from_secs(1), coordinator.save(item, Some(TOKEN))).await;
    assert!(cancelled.is_err());
    assert_eq!(coordinator.status(item.id()), SaveStatus::Failed);
    assert_eq!(coordinator.failed_count(), 1);

    let retried = coordinator.save(item, Some(TOKEN)).await.unwrap();
    assert!(matches!(retried, SaveOutcome::Saved { .. }));
    assert_eq!(coordinator.store().save_calls(), 2);
    assert_eq!(coordinator.failed_count(), 0);
}
