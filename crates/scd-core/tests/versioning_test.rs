//! Integration tests for version history, resolution and write conflicts.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::Duration;
use common::Engagement;
use scd_core::{
    Database, Direction, Entity, ErrorCode, Filter, Resolution, ScdError, SqliteVersionStore,
    StoreConfig, Transform, VersionStore,
};
use uuid::Uuid;

fn store() -> SqliteVersionStore<Engagement> {
    SqliteVersionStore::in_memory().unwrap()
}

fn set_rate(rate: f64) -> Transform<Engagement> {
    Box::new(move |mut e: Engagement| {
        e.rate = rate;
        e
    })
}

/// Create at rate 20, update to 15.5, then read it back every way.
#[test]
fn test_rate_change_history() {
    let store = store();
    let company = Uuid::new_v4();

    let v1 = store
        .create(Engagement::new("Backend Developer", 20.0, company))
        .unwrap();
    thread::sleep(StdDuration::from_millis(5));
    let v2 = store.update(&v1.version_uid(), set_rate(15.5)).unwrap();

    let history = store.get_version_history(&v1.business_id()).unwrap();
    assert_eq!(history, vec![v1.clone(), v2.clone()]);
    assert_eq!(store.get_latest_version(&v1.business_id()).unwrap(), v2);

    let t1 = v1.created_at.unwrap();
    let t2 = v2.created_at.unwrap();
    let midpoint = t1 + (t2 - t1) / 2;
    assert_eq!(store.get_version_at(&v1.business_id(), midpoint).unwrap(), v1);
    assert_eq!(
        store
            .get_version_at(&v1.business_id(), t2 + Duration::seconds(1))
            .unwrap(),
        v2
    );

    let err = store
        .get_version_at(&v1.business_id(), t1 - Duration::seconds(1))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_find_by_uid_after_update_returns_original() {
    let store = store();
    let v1 = store
        .create(Engagement::new("Designer", 40.0, Uuid::new_v4()))
        .unwrap();
    store.update(&v1.version_uid(), set_rate(45.0)).unwrap();

    let found = store.find_by_uid(&v1.version_uid()).unwrap();
    assert_eq!(found, v1);
    assert_eq!(found.rate, 40.0);
}

#[test]
fn test_update_without_change_copies_payload() {
    let store = store();
    let v1 = store
        .create(Engagement::new("Analyst", 33.0, Uuid::new_v4()))
        .unwrap();
    let v2 = store
        .update(&v1.version_uid(), Box::new(|e: Engagement| e))
        .unwrap();

    assert_eq!(v2.business_id, v1.business_id);
    assert_ne!(v2.version_uid, v1.version_uid);
    assert_eq!(v2.version, v1.version + 1);
    assert_eq!(
        (&v2.title, v2.rate, &v2.status, v2.company_id),
        (&v1.title, v1.rate, &v1.status, v1.company_id)
    );
}

#[test]
fn test_sequential_writes_produce_dense_versions() {
    let store = store();
    let mut current = store
        .create(Engagement::new("Writer", 10.0, Uuid::new_v4()))
        .unwrap();
    for i in 1..10 {
        current = store
            .update(&current.version_uid(), set_rate(10.0 + i as f64))
            .unwrap();
    }

    let versions: Vec<u32> = store
        .get_version_history(&current.business_id())
        .unwrap()
        .iter()
        .map(|e| e.version)
        .collect();
    assert_eq!(versions, (1..=10).collect::<Vec<_>>());
}

/// Two updates from the same base: one row, one retryable conflict.
#[test]
fn test_concurrent_updates_from_same_base() {
    let store = Arc::new(store());
    let v1 = store
        .create(Engagement::new("Contested", 20.0, Uuid::new_v4()))
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [30.0, 40.0]
        .into_iter()
        .map(|rate| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let uid = v1.version_uid();
            thread::spawn(move || {
                barrier.wait();
                store.update(&uid, set_rate(rate))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let conflict = results
        .into_iter()
        .find_map(|r| r.err())
        .expect("one update must fail");
    assert_eq!(conflict.code(), ErrorCode::ConflictVersion);
    assert!(conflict.is_retryable());

    let v2_rows = store
        .query()
        .for_business_id(v1.business_id())
        .filter(Filter::eq("version", 2))
        .count()
        .unwrap();
    assert_eq!(v2_rows, 1);
}

/// A conflicted writer retries against the latest version and succeeds.
#[test]
fn test_retry_after_conflict() {
    let store = store();
    let v1 = store
        .create(Engagement::new("Retry", 20.0, Uuid::new_v4()))
        .unwrap();
    store.update(&v1.version_uid(), set_rate(21.0)).unwrap();

    let err = store.update(&v1.version_uid(), set_rate(22.0)).unwrap_err();
    assert!(err.is_retryable());

    let latest = store.get_latest_version(&v1.business_id()).unwrap();
    let v3 = store.update(&latest.version_uid(), set_rate(22.0)).unwrap();
    assert_eq!(v3.version, 3);
}

#[test]
fn test_sql_resolver_agrees_with_in_memory() {
    let store = store();
    let company = Uuid::new_v4();
    let mut cutoffs = Vec::new();

    for (n, title) in ["a", "b", "c", "d"].iter().enumerate() {
        let mut current = store.create(Engagement::new(title, 1.0, company)).unwrap();
        for i in 0..n {
            current = store
                .update(&current.version_uid(), set_rate(2.0 + i as f64))
                .unwrap();
        }
        cutoffs.push(current.created_at.unwrap());
    }

    let raw = store.query().find().unwrap();
    assert_eq!(raw.len(), 1 + 2 + 3 + 4);

    let by_id = |mut rows: Vec<Engagement>| {
        rows.sort_by_key(|e| e.business_id());
        rows
    };

    let sql_latest = by_id(store.query().latest().find().unwrap());
    assert_eq!(sql_latest, by_id(Resolution::Latest.apply(raw.clone())));

    for cutoff in cutoffs {
        let sql_as_of = by_id(store.query().as_of(cutoff).find().unwrap());
        assert_eq!(sql_as_of, by_id(Resolution::AsOf(cutoff).apply(raw.clone())));
    }
}

#[test]
fn test_latest_active_by_company() {
    let store = store();
    let acme = Uuid::new_v4();
    let other = Uuid::new_v4();

    let a = store.create(Engagement::new("a", 10.0, acme)).unwrap();
    let b = store.create(Engagement::new("b", 20.0, acme)).unwrap();
    store.create(Engagement::new("c", 30.0, other)).unwrap();
    store.soft_delete(&b.version_uid()).unwrap();
    let a2 = store.update(&a.version_uid(), set_rate(12.0)).unwrap();

    let rows = store
        .query()
        .latest()
        .filter(Filter::eq("company_id", acme.to_string()))
        .filter(Filter::eq("status", "active"))
        .order_by("created_at", Direction::Desc)
        .find()
        .unwrap();
    assert_eq!(rows, vec![a2]);
}

#[test]
fn test_contains_filter_treats_wildcards_literally() {
    let store = store();
    let company = Uuid::new_v4();
    store.create(Engagement::new("100% remote", 1.0, company)).unwrap();
    store.create(Engagement::new("1000 remote", 1.0, company)).unwrap();

    let rows = store
        .query()
        .filter(Filter::contains("title", "100%"))
        .find()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "100% remote");
}

#[test]
fn test_count_respects_limit_and_offset() {
    let store = store();
    let company = Uuid::new_v4();
    for i in 0..5 {
        store
            .create(Engagement::new(&format!("e{}", i), i as f64, company))
            .unwrap();
    }
    assert_eq!(store.query().limit(3).count().unwrap(), 3);
    assert_eq!(store.query().offset(4).count().unwrap(), 1);
}

#[test]
fn test_query_validation_errors() {
    let store = store();
    let err = store
        .query()
        .filter(Filter::eq("rate", "fast"))
        .find()
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValTypeMismatch);

    let err = store
        .query()
        .where_in("status", Vec::<String>::new())
        .count()
        .unwrap_err();
    assert!(matches!(err, ScdError::Validation { .. }));
}

#[test]
fn test_file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engagements.db");
    let config = StoreConfig::default().with_db_path(&path);

    let v1 = {
        let store = SqliteVersionStore::<Engagement>::from_config(&config).unwrap();
        let v1 = store
            .create(Engagement::new("Persistent", 50.0, Uuid::new_v4()))
            .unwrap();
        store.update(&v1.version_uid(), set_rate(55.0)).unwrap();
        v1
    };

    let reopened = SqliteVersionStore::<Engagement>::new(Database::open(&path).unwrap()).unwrap();
    let history = reopened.get_version_history(&v1.business_id()).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], v1);
    assert_eq!(history[1].rate, 55.0);
}

#[test]
fn test_batch_create_then_query() {
    let config = StoreConfig::default().with_batch_size(3);
    let store =
        SqliteVersionStore::<Engagement>::with_config(Database::in_memory().unwrap(), &config)
            .unwrap();
    let company = Uuid::new_v4();

    let created = store
        .create_batch(
            (0..7)
                .map(|i| Engagement::new(&format!("bulk-{}", i), i as f64, company))
                .collect(),
        )
        .unwrap();
    assert_eq!(created.len(), 7);
    assert_eq!(
        store
            .query()
            .latest()
            .filter(Filter::gte("rate", 4.0))
            .count()
            .unwrap(),
        3
    );
    assert_eq!(Engagement::TABLE, "engagements");
}
