//! Storage backend tests
//!
//! Tests for SeaOrmStorage using temporary SQLite databases.

use std::sync::Arc;

use chrono::Utc;
use qrlinker::storage::{
    Assignment, Code, ContentPayload, Experiment, ExperimentStatus, NewScan, ResolverStore,
    ScanContext, SeaOrmStorage, StartOutcome, Variant,
};
use tempfile::TempDir;

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (Arc::new(storage), temp_dir)
}

fn create_test_code(token: &str) -> Code {
    Code::new(
        "acct-1",
        token,
        &ContentPayload::Url {
            url: Some(format!("https://{}.example.com", token)),
        },
    )
}

fn new_scan(code_id: &str, variant_id: Option<&str>) -> NewScan {
    NewScan {
        code_id: code_id.to_string(),
        scanned_at: Utc::now(),
        context: ScanContext {
            device_type: Some("mobile".to_string()),
            ..Default::default()
        },
        variant_id: variant_id.map(String::from),
        visitor_hash: Some("visitor".to_string()),
    }
}

async fn running_experiment_with_variants(
    storage: &SeaOrmStorage,
    code: &Code,
    slugs: &[&str],
) -> (Experiment, Vec<Variant>) {
    let mut exp = Experiment::new(&code.id, 0.95);
    exp.status = ExperimentStatus::Running;
    exp.started_at = Some(Utc::now());
    storage.insert_experiment(&exp).await.unwrap();

    let mut variants = Vec::new();
    for slug in slugs {
        let v = Variant::new(&exp.id, slug, &format!("https://{}.example.com", slug), 50);
        storage.insert_variant(&v).await.unwrap();
        variants.push(v);
    }
    (exp, variants)
}

// =============================================================================
// Code
// =============================================================================

#[tokio::test]
async fn test_code_roundtrip_and_update() {
    let (storage, _dir) = create_temp_storage().await;
    let mut code = create_test_code("menu");
    storage.insert_code(&code).await.unwrap();

    let found = storage.find_code("menu").await.unwrap().expect("code should exist");
    assert_eq!(found.id, code.id);
    assert_eq!(found.content_type, "url");
    assert!(storage.find_code("missing").await.unwrap().is_none());

    code.archived = true;
    code.password_hash = Some("$argon2id$fake".to_string());
    storage.update_code(&code).await.unwrap();

    let found = storage.get_code(&code.id).await.unwrap().unwrap();
    assert!(found.archived);
    assert_eq!(found.password_hash.as_deref(), Some("$argon2id$fake"));
}

#[tokio::test]
async fn test_update_missing_code_is_not_found() {
    let (storage, _dir) = create_temp_storage().await;
    let err = storage
        .update_code(&create_test_code("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, qrlinker::errors::QrlinkerError::NotFound(_)));
}

// =============================================================================
// Scans
// =============================================================================

#[tokio::test]
async fn test_record_scan_increments_counters() {
    let (storage, _dir) = create_temp_storage().await;
    let code = create_test_code("menu");
    storage.insert_code(&code).await.unwrap();
    let (_exp, variants) = running_experiment_with_variants(&storage, &code, &["a", "b"]).await;

    storage.record_scan(&new_scan(&code.id, None)).await.unwrap();
    storage
        .record_scan(&new_scan(&code.id, Some(&variants[1].id)))
        .await
        .unwrap();

    let found = storage.get_code(&code.id).await.unwrap().unwrap();
    assert_eq!(found.scan_count, 2);
    assert_eq!(storage.count_scans(&code.id).await.unwrap(), 2);

    let listed = storage.list_variants(&variants[0].experiment_id).await.unwrap();
    assert_eq!(listed[0].scan_count, 0);
    assert_eq!(listed[1].scan_count, 1);
    assert_eq!(storage.count_variant_scans(&variants[1].id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_scans_lose_no_increments() {
    let (storage, _dir) = create_temp_storage().await;
    let code = create_test_code("busy");
    storage.insert_code(&code).await.unwrap();

    let n = 40;
    let mut handles = Vec::new();
    for _ in 0..n {
        let storage = storage.clone();
        let code_id = code.id.clone();
        handles.push(tokio::spawn(async move {
            storage.record_scan(&new_scan(&code_id, None)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("scan should be recorded");
    }

    let found = storage.get_code(&code.id).await.unwrap().unwrap();
    assert_eq!(found.scan_count, n);
    assert_eq!(storage.count_scans(&code.id).await.unwrap(), n);
}

// =============================================================================
// Experiments & assignments
// =============================================================================

#[tokio::test]
async fn test_find_running_experiment() {
    let (storage, _dir) = create_temp_storage().await;
    let code = create_test_code("menu");
    storage.insert_code(&code).await.unwrap();

    assert!(storage.find_running_experiment(&code.id).await.unwrap().is_none());

    let (exp, _) = running_experiment_with_variants(&storage, &code, &["b", "a"]).await;
    let running = storage
        .find_running_experiment(&code.id)
        .await
        .unwrap()
        .expect("experiment should be running");
    assert_eq!(running.experiment.id, exp.id);
    // 按 slug 升序
    let slugs: Vec<_> = running.variants.iter().map(|v| v.slug.as_str()).collect();
    assert_eq!(slugs, ["a", "b"]);

    let mut paused = running.experiment.clone();
    paused.status = ExperimentStatus::Paused;
    storage.update_experiment(&paused).await.unwrap();
    assert!(storage.find_running_experiment(&code.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_variant_slug_conflicts() {
    let (storage, _dir) = create_temp_storage().await;
    let code = create_test_code("menu");
    storage.insert_code(&code).await.unwrap();
    let (exp, _) = running_experiment_with_variants(&storage, &code, &["a"]).await;

    let dup = Variant::new(&exp.id, "a", "https://dup.example.com", 10);
    let err = storage.insert_variant(&dup).await.unwrap_err();
    assert!(matches!(err, qrlinker::errors::QrlinkerError::Conflict(_)));
}

#[tokio::test]
async fn test_first_assignment_wins() {
    let (storage, _dir) = create_temp_storage().await;
    let code = create_test_code("menu");
    storage.insert_code(&code).await.unwrap();
    let (exp, variants) = running_experiment_with_variants(&storage, &code, &["a", "b"]).await;

    let first = Assignment {
        experiment_id: exp.id.clone(),
        visitor_hash: "v1".to_string(),
        variant_id: variants[0].id.clone(),
        assigned_at: Utc::now(),
    };
    let second = Assignment {
        variant_id: variants[1].id.clone(),
        ..first.clone()
    };

    assert!(storage.insert_assignment(&first).await.unwrap());
    assert!(!storage.insert_assignment(&second).await.unwrap());

    let stored = storage.get_assignment(&exp.id, "v1").await.unwrap().unwrap();
    assert_eq!(stored.variant_id, variants[0].id);
}

#[tokio::test]
async fn test_reassign_only_replaces_stale_variant() {
    let (storage, _dir) = create_temp_storage().await;
    let code = create_test_code("menu");
    storage.insert_code(&code).await.unwrap();
    let (exp, variants) = running_experiment_with_variants(&storage, &code, &["a", "b"]).await;

    let original = Assignment {
        experiment_id: exp.id.clone(),
        visitor_hash: "v1".to_string(),
        variant_id: variants[0].id.clone(),
        assigned_at: Utc::now(),
    };
    storage.save_assignment(&original, None).await.unwrap();
    storage.delete_variant(&variants[0].id).await.unwrap();

    let replacement = Assignment {
        variant_id: variants[1].id.clone(),
        ..original.clone()
    };
    // 过期 id 不匹配时不改写
    assert!(!storage.reassign(&replacement, "not-the-stale-one").await.unwrap());
    assert!(storage.reassign(&replacement, &variants[0].id).await.unwrap());

    let stored = storage.get_assignment(&exp.id, "v1").await.unwrap().unwrap();
    assert_eq!(stored.variant_id, variants[1].id);
}

#[tokio::test]
async fn test_delete_missing_variant_is_not_found() {
    let (storage, _dir) = create_temp_storage().await;
    let err = storage.delete_variant("nope").await.unwrap_err();
    assert!(matches!(err, qrlinker::errors::QrlinkerError::NotFound(_)));
}

#[tokio::test]
async fn test_start_experiment_is_conditional() {
    let (storage, _dir) = create_temp_storage().await;
    let code = create_test_code("ab");
    storage.insert_code(&code).await.unwrap();

    let (running, _) = running_experiment_with_variants(&storage, &code, &["a"]).await;

    let draft = Experiment::new(&code.id, 0.95);
    storage.insert_experiment(&draft).await.unwrap();
    assert_eq!(
        storage.start_experiment(&draft).await.unwrap(),
        StartOutcome::AlreadyRunning(running.id.clone())
    );

    // 已经 running 的实验不能再次启动
    assert_eq!(
        storage.start_experiment(&running).await.unwrap(),
        StartOutcome::NotStartable
    );

    let mut paused = running.clone();
    paused.status = ExperimentStatus::Paused;
    storage.update_experiment(&paused).await.unwrap();
    assert_eq!(
        storage.start_experiment(&draft).await.unwrap(),
        StartOutcome::Started
    );

    let stored = storage.get_experiment(&draft.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExperimentStatus::Running);
    assert!(stored.started_at.is_some());
}
