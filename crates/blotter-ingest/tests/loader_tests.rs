//! Load coordinator tests against an in-memory staging sink

use async_trait::async_trait;
use blotter_ingest::{load, LoadSummary, NormalizedRow, RawRecord, SinkError, StagingSink};
use serde_json::json;

/// Sink double with transactional visibility: rows land in `pending` and
/// only replace `committed` on commit.
#[derive(Default)]
struct MemorySink {
    committed: Vec<NormalizedRow>,
    pending: Option<Vec<NormalizedRow>>,
    calls: Vec<&'static str>,
    reject_ids: Vec<String>,
    fail_commit: bool,
    fail_insert_fatally: bool,
}

impl MemorySink {
    fn rejecting(ids: &[&str]) -> Self {
        Self {
            reject_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl StagingSink for MemorySink {
    async fn clear(&mut self) -> Result<(), SinkError> {
        self.calls.push("clear");
        self.pending = Some(Vec::new());
        Ok(())
    }

    async fn insert(&mut self, row: &NormalizedRow) -> Result<(), SinkError> {
        self.calls.push("insert");
        if self.fail_insert_fatally {
            return Err(SinkError::Query(sqlx::Error::PoolClosed));
        }
        if self.reject_ids.contains(&row.event_id) {
            return Err(SinkError::insert(&row.event_id, "constraint violation"));
        }
        self.pending.get_or_insert_with(Vec::new).push(row.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        self.calls.push("commit");
        if self.fail_commit {
            self.pending = None;
            return Err(SinkError::Commit(sqlx::Error::PoolClosed));
        }
        if let Some(rows) = self.pending.take() {
            self.committed = rows;
        }
        Ok(())
    }
}

fn batch() -> Vec<RawRecord> {
    vec![
        json!({"id": 1, "type": "Rån", "location": {"name": "Stockholm", "gps": "59.33, 18.06"}}),
        json!({"id": 2, "type": "Stöld", "location": "Göteborg"}),
        json!({"id": 3, "type": "Brand", "location": {"name": "Malmö", "gps": "bad-data"}}),
        json!({"id": 4, "summary": "Ingen plats angiven"}),
    ]
    .into_iter()
    .map(RawRecord::new)
    .collect()
}

#[tokio::test]
async fn test_empty_batch_never_touches_sink() {
    let mut sink = MemorySink::default();

    let summary = load(&mut sink, &[]).await.unwrap();

    assert_eq!(summary, LoadSummary { inserted: 0, skipped: 0 });
    assert!(sink.calls.is_empty());
}

#[tokio::test]
async fn test_load_clears_inserts_then_commits_once() {
    let mut sink = MemorySink::default();
    let records = batch();

    let summary = load(&mut sink, &records).await.unwrap();

    assert_eq!(summary, LoadSummary { inserted: 4, skipped: 0 });
    assert_eq!(
        sink.calls,
        vec!["clear", "insert", "insert", "insert", "insert", "commit"]
    );

    let ids: Vec<&str> = sink.committed.iter().map(|r| r.event_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_rejected_rows_are_skipped_not_fatal() {
    let mut sink = MemorySink::rejecting(&["2", "4"]);
    let records = batch();

    let summary = load(&mut sink, &records).await.unwrap();

    assert_eq!(summary, LoadSummary { inserted: 2, skipped: 2 });
    assert_eq!(summary.total(), records.len());
    assert_eq!(sink.committed.len(), 2);
    assert_eq!(sink.calls.last(), Some(&"commit"));
}

#[tokio::test]
async fn test_every_row_rejected_still_commits() {
    let mut sink = MemorySink::rejecting(&["1", "2", "3", "4"]);

    let summary = load(&mut sink, &batch()).await.unwrap();

    assert_eq!(summary, LoadSummary { inserted: 0, skipped: 4 });
    assert!(sink.committed.is_empty());
    assert_eq!(sink.calls.last(), Some(&"commit"));
}

#[tokio::test]
async fn test_commit_failure_is_surfaced() {
    let mut sink = MemorySink {
        fail_commit: true,
        ..MemorySink::default()
    };

    let err = load(&mut sink, &batch()).await.unwrap_err();

    assert!(matches!(err, SinkError::Commit(_)));
    assert!(sink.committed.is_empty());
}

#[tokio::test]
async fn test_fatal_insert_error_aborts_before_commit() {
    let mut sink = MemorySink {
        fail_insert_fatally: true,
        ..MemorySink::default()
    };

    let err = load(&mut sink, &batch()).await.unwrap_err();

    assert!(!err.is_record_level());
    assert_eq!(sink.calls, vec!["clear", "insert"]);
}

#[tokio::test]
async fn test_repeated_load_replaces_instead_of_appending() {
    let mut sink = MemorySink::default();
    let records = batch();

    load(&mut sink, &records).await.unwrap();
    load(&mut sink, &records).await.unwrap();

    assert_eq!(sink.committed.len(), records.len());
}

#[tokio::test]
async fn test_rows_are_normalized_before_insert() {
    let mut sink = MemorySink::default();

    load(&mut sink, &batch()).await.unwrap();

    let stockholm = &sink.committed[0];
    assert_eq!(stockholm.location_name, "Stockholm");
    assert!(stockholm.has_coordinates());

    let malmo = &sink.committed[2];
    assert_eq!(malmo.location_name, "Malmö");
    assert_eq!((malmo.latitude, malmo.longitude), (None, None));

    let unplaced = &sink.committed[3];
    assert_eq!(unplaced.description, "Ingen plats angiven");
    assert_eq!(unplaced.location_raw, "");
}

#[tokio::test]
async fn test_counts_always_cover_the_batch() {
    for rejected in [&[][..], &["1"][..], &["1", "3"][..], &["1", "2", "3", "4"][..]] {
        let mut sink = MemorySink::rejecting(rejected);
        let records = batch();

        let summary = load(&mut sink, &records).await.unwrap();

        assert_eq!(summary.inserted + summary.skipped, records.len());
        assert_eq!(summary.skipped, rejected.len());
    }
}
