//! Tests for engine module

use super::*;
use crate::error::ErrorKind;
use crate::types::{Record, TableOptions};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn engine(domains: &[&str]) -> IngestEngine {
    IngestEngine::new(Arc::new(DatabaseSet::in_memory(domains.iter().copied())))
}

fn rows(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new()
                .with("Symbol", format!("SYM{i}"))
                .with("Close", i as f64)
        })
        .collect()
}

fn count(engine: &IngestEngine, database: &str, table: &str) -> u64 {
    engine
        .databases()
        .get(database)
        .unwrap()
        .row_count(table)
        .unwrap()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_engine_config_builder() {
    let config = EngineConfig::new()
        .with_max_workers(0)
        .with_fetch_timeout(Duration::from_secs(5));

    assert_eq!(config.max_workers, 1);
    assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    assert_eq!(EngineConfig::default().max_workers, 5);
}

// ============================================================================
// Unit Tests
// ============================================================================

#[tokio::test]
async fn test_unit_success_reports_counts() {
    let engine = engine(&["indices"]);
    let unit = Unit::from_batch("quotes", "indices", Batch::upsert("quotes", ["Symbol"], rows(3)));

    let result = engine.run_unit(unit).await;

    assert!(result.is_success());
    assert_eq!(result.table, "quotes");
    assert_eq!(result.records_in, 3);
    assert_eq!(result.rows_affected, 3);
    assert_eq!(result.rows_inserted, 3);
    assert_eq!(result.error_message, None);
    assert!(result.batches[0].created_table);
    assert_eq!(count(&engine, "indices", "quotes"), 3);
}

#[tokio::test]
async fn test_empty_unit_is_success_and_creates_nothing() {
    let engine = engine(&["ipo"]);
    let unit = Unit::from_batch("sme", "ipo", Batch::append("sme_data", Vec::new()));

    let result = engine.run_unit(unit).await;

    assert!(result.is_success());
    assert_eq!(result.records_in, 0);
    assert_eq!(result.rows_affected, 0);
    let tables = engine.databases().get("ipo").unwrap().list_tables().unwrap();
    assert!(tables.is_empty());
}

#[tokio::test]
async fn test_fetch_error_reported() {
    let engine = engine(&["news"]);
    let unit = Unit::from_fn("feed", "news", "pib", || async {
        Err(crate::Error::fetch("pib", "connection reset"))
    });

    let result = engine.run_unit(unit).await;

    assert_eq!(result.status, UnitStatus::Error);
    assert_eq!(result.table, "pib");
    assert_eq!(result.error_kind, Some(ErrorKind::Fetch));
    assert!(result.error_message.unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_fetch_timeout() {
    let engine = engine(&["news"])
        .with_config(EngineConfig::new().with_fetch_timeout(Duration::from_millis(50)));
    let unit = Unit::from_fn("slow", "news", "slow", || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    });

    let result = engine.run_unit(unit).await;

    assert_eq!(result.status, UnitStatus::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::Fetch));
}

#[tokio::test]
async fn test_unknown_database_fails_unit() {
    let engine = engine(&["news"]);
    let unit = Unit::from_batch("x", "nowhere", Batch::append("t", rows(1)));

    let result = engine.run_unit(unit).await;

    assert_eq!(result.status, UnitStatus::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::Schema));
}

#[tokio::test]
async fn test_upsert_without_keys_rejected() {
    let engine = engine(&["news"]);
    let batch = Batch::upsert("t", Vec::<String>::new(), rows(1));

    let result = engine.run_unit(Unit::from_batch("x", "news", batch)).await;

    assert_eq!(result.error_kind, Some(ErrorKind::Write));
}

#[tokio::test]
async fn test_multiple_batches_in_one_unit() {
    let engine = engine(&["bhavcopy"]);
    let unit = Unit::from_fn("archive", "bhavcopy", "bhavcopy", || async {
        Ok(vec![
            Batch::append("pr", rows(2)),
            Batch::append("bc", rows(1)),
            Batch::append("gl", Vec::new()),
        ])
    });

    let result = engine.run_unit(unit).await;

    assert!(result.is_success());
    assert_eq!(result.table, "pr,bc,gl");
    assert_eq!(result.records_in, 3);
    assert_eq!(result.batches.len(), 3);
}

// ============================================================================
// Run Tests
// ============================================================================

#[tokio::test]
async fn test_failure_is_isolated() {
    let engine = engine(&["indices", "news"]);
    let units = vec![
        Unit::from_batch("a", "indices", Batch::append("a", rows(2))),
        Unit::from_fn("b", "news", "b", || async {
            Err(crate::Error::fetch("b", "HTTP 503"))
        }),
        Unit::from_batch("c", "news", Batch::append("c", rows(4))),
    ];

    let summary = engine.run(units).await;

    assert_eq!(summary.units.len(), 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.records_in, 6);
    assert!(!summary.all_succeeded());
    assert_eq!(summary.unit("b").unwrap().status, UnitStatus::Error);
    assert_eq!(count(&engine, "news", "c"), 4);
}

#[tokio::test]
async fn test_panicking_fetch_is_isolated() {
    let engine = engine(&["news"]);
    let units = vec![
        Unit::from_fn("boom", "news", "boom", || async {
            if true {
                panic!("fetcher exploded");
            }
            Ok(Vec::new())
        }),
        Unit::from_batch("ok", "news", Batch::append("ok", rows(1))),
    ];

    let summary = engine.run(units).await;

    assert_eq!(summary.unit("boom").unwrap().status, UnitStatus::Error);
    assert!(summary.unit("ok").unwrap().is_success());
}

#[tokio::test]
async fn test_worker_pool_is_bounded() {
    let engine = engine(&["news"]).with_config(EngineConfig::new().with_max_workers(2));
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let units = (0..6)
        .map(|i| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            Unit::from_fn(format!("u{i}"), "news", "t", move || {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(Vec::new())
                }
            })
        })
        .collect();

    let summary = engine.run(units).await;

    assert_eq!(summary.succeeded, 6);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_units_same_table() {
    let engine = engine(&["news"]);
    let units = (0..8)
        .map(|i| {
            let records = vec![Record::new().with("title", format!("t{i}"))];
            Unit::from_batch(format!("u{i}"), "news", Batch::append("feed", records))
        })
        .collect();

    let summary = engine.run(units).await;

    assert_eq!(summary.failed, 0, "{:?}", summary.units);
    assert_eq!(count(&engine, "news", "feed"), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_units_widening_same_table() {
    let engine = engine(&["news"]).with_config(EngineConfig::new().with_max_workers(8));

    for round in 0..10 {
        let units = (0..8)
            .map(|i| {
                let records = (0..50)
                    .map(|n| {
                        Record::new()
                            .with("title", format!("r{round}u{i}n{n}"))
                            .with(format!("f_{round}_{i}"), n as i64)
                    })
                    .collect();
                Unit::from_batch(format!("r{round}u{i}"), "news", Batch::append("feed", records))
            })
            .collect();

        let summary = engine.run(units).await;
        assert_eq!(summary.failed, 0, "round {round}: {:?}", summary.units);
    }

    assert_eq!(count(&engine, "news", "feed"), 10 * 8 * 50);
    let info = engine
        .databases()
        .get("news")
        .unwrap()
        .describe_table("feed")
        .unwrap()
        .unwrap();
    assert!(info.columns.contains(&"f_9_7".to_string()));
}

#[tokio::test]
async fn test_timestamped_options_flow_through() {
    let engine = engine(&["ipo"]);
    let batch = Batch::append("mainboard_data", rows(1)).with_options(TableOptions::timestamped());

    let result = engine.run_unit(Unit::from_batch("ipo", "ipo", batch)).await;

    assert!(result.is_success());
    let info = engine
        .databases()
        .get("ipo")
        .unwrap()
        .describe_table("mainboard_data")
        .unwrap()
        .unwrap();
    assert!(info.columns.contains(&"created_at".to_string()));
}
