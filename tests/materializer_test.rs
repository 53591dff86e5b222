use segment_engine::db::init_db;
use segment_engine::{
    compile_value, Decimal, MaterializeError, Materializer, MemoryStore, NewSegment, Repository,
    Segment, SegmentId, TimeMs, UserRecord,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn users() -> Vec<UserRecord> {
    vec![
        UserRecord::new("a", TimeMs::new(1_000))
            .with_order(d("200"))
            .with_order(d("50"))
            .with_designs(2),
        UserRecord::new("b", TimeMs::new(2_000)),
        UserRecord::new("c", TimeMs::new(3_000)).with_order(d("50")),
        UserRecord::new("d", TimeMs::new(4_000)).with_designs(1),
    ]
}

fn segment(id: &str, conditions: Value, user_count: i64) -> Segment {
    Segment {
        id: SegmentId::new(id.to_string()),
        name: id.to_string(),
        description: None,
        conditions,
        is_dynamic: true,
        user_count,
        created_at: TimeMs::new(0),
        updated_at: TimeMs::new(0),
    }
}

#[tokio::test]
async fn test_failing_segment_does_not_abort_batch() {
    let broken = json!({ "created_after": 2_500 });
    let store = Arc::new(
        MemoryStore::new()
            .with_users(users())
            .with_segment(segment("buyers", json!({ "has_orders": true }), -1))
            .with_segment(segment("designers", json!({ "has_designs": true }), -1))
            .with_segment(segment("everyone", json!({}), -1))
            .with_segment(segment("broken", broken.clone(), 17))
            .failing_count_for(compile_value(&broken)),
    );
    let materializer = Materializer::new(store.clone(), store.clone());

    materializer.update_all_segment_counts().await;

    let count_of = |id: &str| store.segment(&SegmentId::new(id.to_string())).unwrap().user_count;
    assert_eq!(count_of("buyers"), 2);
    assert_eq!(count_of("designers"), 2);
    assert_eq!(count_of("everyone"), 4);
    assert_eq!(count_of("broken"), 17, "failed segment keeps its stale count");
    assert_eq!(store.write_count(), 3);
}

#[tokio::test]
async fn test_strict_refresh_reports_each_outcome() {
    let broken = json!({ "design_count_min": 5 });
    let store = Arc::new(
        MemoryStore::new()
            .with_users(users())
            .with_segment(segment("ok", json!({ "order_count_min": 1 }), 0))
            .with_segment(segment("broken", broken.clone(), 0))
            .failing_count_for(compile_value(&broken)),
    );
    let materializer = Materializer::new(store.clone(), store);

    let report = materializer.try_update_all_segment_counts().await.unwrap();
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures[0].0.as_str(), "broken");
    assert!(matches!(failures[0].1, MaterializeError::Count(_)));
}

#[tokio::test]
async fn test_fixed_segments_are_not_refreshed() {
    let mut fixed = segment("fixed", json!({}), 99);
    fixed.is_dynamic = false;
    let store = Arc::new(MemoryStore::new().with_users(users()).with_segment(fixed));
    let materializer = Materializer::new(store.clone(), store.clone());

    materializer.update_all_segment_counts().await;

    let id = SegmentId::new("fixed".to_string());
    assert_eq!(store.segment(&id).unwrap().user_count, 99);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_malformed_conditions_count_everyone() {
    let store = Arc::new(
        MemoryStore::new()
            .with_users(users())
            .with_segment(segment("weird", json!(["has_orders"]), 0)),
    );
    let materializer = Materializer::new(store.clone(), store);
    let id = SegmentId::new("weird".to_string());

    assert_eq!(materializer.calculate_segment_user_count(&id).await, 4);
}

#[tokio::test]
async fn test_sqlite_end_to_end_refresh() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let repo = Arc::new(Repository::new(init_db(&db_path).await.unwrap()));
    for user in users() {
        repo.insert_user_record(&user).await.unwrap();
    }

    let high_value = repo
        .insert_segment(&NewSegment::new(
            "High value",
            json!({ "has_orders": true, "min_order_amount": 200 }),
        ))
        .await
        .unwrap();
    let newcomers = repo
        .insert_segment(&NewSegment::new(
            "Newcomers",
            json!({ "created_after": 2_000, "has_orders": false }),
        ))
        .await
        .unwrap();
    let fixed = repo
        .insert_segment(&NewSegment::new("Snapshot", json!({})).fixed())
        .await
        .unwrap();

    let materializer = Materializer::new(repo.clone(), repo.clone());
    let report = materializer.try_update_all_segment_counts().await.unwrap();
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 0);

    let reload = |id: SegmentId| {
        let repo = repo.clone();
        async move { repo.find_segment(&id).await.unwrap().unwrap().user_count }
    };
    assert_eq!(reload(high_value.id.clone()).await, 1);
    assert_eq!(reload(newcomers.id.clone()).await, 2);
    assert_eq!(reload(fixed.id.clone()).await, 0);

    // A new high-value buyer shows up only after the next materialization.
    repo.insert_user_record(&UserRecord::new("e", TimeMs::new(5_000)).with_order(d("999")))
        .await
        .unwrap();
    assert_eq!(reload(high_value.id.clone()).await, 1);
    assert_eq!(
        materializer
            .calculate_segment_user_count(&high_value.id)
            .await,
        2
    );
    assert_eq!(reload(high_value.id.clone()).await, 2);
}

#[tokio::test]
async fn test_sqlite_deleted_segment_counts_zero() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let repo = Arc::new(Repository::new(init_db(&db_path).await.unwrap()));
    let created = repo
        .insert_segment(&NewSegment::new("Gone", json!({})))
        .await
        .unwrap();
    repo.delete_segment(&created.id).await.unwrap();

    let materializer = Materializer::new(repo.clone(), repo);
    assert_eq!(materializer.calculate_segment_user_count(&created.id).await, 0);
    assert!(matches!(
        materializer.try_calculate_segment_user_count(&created.id).await,
        Err(MaterializeError::SegmentNotFound(_))
    ));
}

#[tokio::test]
async fn test_sqlite_refresh_with_extreme_conditions() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let repo = Arc::new(Repository::new(init_db(&db_path).await.unwrap()));
    for user in users() {
        repo.insert_user_record(&user).await.unwrap();
    }

    let everyone = repo
        .insert_segment(&NewSegment::new("Everyone", json!({})))
        .await
        .unwrap();
    repo.set_user_count(&everyone.id, 55).await.unwrap();

    let extremes = [
        (json!({ "min_order_amount": "1000000000000000000000000000" }), 0),
        (json!({ "min_order_amount": "-1000000000000000000000000000" }), 2),
        (json!({ "min_order_amount": 1e21 }), 0),
        (json!({ "order_count_min": i64::MAX }), 0),
        (json!({ "order_count_min": i64::MIN }), 4),
        (json!({ "created_after": i64::MAX }), 0),
        (json!({ "created_before": i64::MIN }), 0),
    ];
    let mut expected = vec![(everyone.id.clone(), 4)];
    for (i, (conditions, count)) in extremes.into_iter().enumerate() {
        let segment = repo
            .insert_segment(&NewSegment::new(format!("Extreme {}", i), conditions))
            .await
            .unwrap();
        repo.set_user_count(&segment.id, -1).await.unwrap();
        expected.push((segment.id, count));
    }

    let materializer = Materializer::new(repo.clone(), repo.clone());
    let batch = tokio::spawn(async move { materializer.update_all_segment_counts().await });
    batch.await.expect("refresh task must not panic");

    for (id, count) in expected {
        let segment = repo.find_segment(&id).await.unwrap().unwrap();
        assert_eq!(segment.user_count, count, "{} {}", segment.name, segment.conditions);
    }
}
