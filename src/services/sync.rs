// src/services/sync.rs
//! Offline batch-sync reconciliation.
//!
//! Trainer devices buffer scans while offline (IndexedDB on the client) and
//! upload them in one batch when connectivity returns. Reconciliation is
//! authorized once up front by the trainer token, then applies each record
//! independently through the symmetric dedup window. A bad record never
//! aborts the batch: it is logged, reported in its per-record outcome, and
//! excluded from both aggregate counts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::attendance::SOURCE_OFFLINE_SYNC;
use crate::services::dedup::DedupWindow;
use crate::storage::Store;

/// One client-buffered scan.
///
/// `local_id` is the client's IndexedDB key. It is echoed back in the
/// per-record outcome but is not part of the dedup key — deduplication is
/// purely `student_id` + time window. Using it to dedupe client retries is
/// an open product decision, left as-is on purpose.
#[derive(Deserialize, Debug, Clone)]
pub struct SyncRecord {
    pub student_id: String,
    /// RFC 3339 occurrence time as captured on the device.
    pub timestamp: String,
    pub local_id: String,
}

/// Outcome of one record in the batch.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "outcome", content = "reason")]
pub enum RecordOutcome {
    Inserted,
    Duplicate,
    Error(String),
}

/// Per-record result, keyed by the client's `local_id`.
#[derive(Serialize, Debug, Clone)]
pub struct RecordResult {
    pub local_id: String,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

/// Batch reconciliation report.
///
/// Aggregate counts keep the existing sync worker happy; `results` lets
/// newer clients see which individual records failed instead of only
/// totals.
#[derive(Serialize, Debug, Clone)]
pub struct SyncReport {
    pub inserted: u32,
    pub duplicates: u32,
    pub results: Vec<RecordResult>,
}

/// Applies batches of offline scans against the store.
pub struct BatchReconciler {
    store: Arc<dyn Store>,
    dedup: DedupWindow,
}

impl BatchReconciler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let dedup = DedupWindow::new(store.clone());
        BatchReconciler { store, dedup }
    }

    /// Reconciles a batch of buffered scans.
    ///
    /// # Errors
    /// - [`AppError::Unauthorized`] when the token matches no trainer —
    ///   checked before any record is touched
    /// - [`AppError::Forbidden`] when the trainer is revoked
    ///
    /// Inserted records keep the client-supplied timestamp (offline scans
    /// must preserve their original occurrence time) and are tagged
    /// `source="offline_sync"`.
    pub async fn reconcile(
        &self,
        records: Vec<SyncRecord>,
        trainer_token: &str,
    ) -> Result<SyncReport, AppError> {
        let trainer = self
            .store
            .find_trainer_by_token(trainer_token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Token inválido".to_string()))?;
        if trainer.revoked {
            return Err(AppError::Forbidden(
                "Acceso denegado: token revocado".to_string(),
            ));
        }

        let mut report = SyncReport {
            inserted: 0,
            duplicates: 0,
            results: Vec::with_capacity(records.len()),
        };

        for record in records {
            let outcome = self.apply(&record).await;
            match &outcome {
                RecordOutcome::Inserted => report.inserted += 1,
                RecordOutcome::Duplicate => report.duplicates += 1,
                RecordOutcome::Error(reason) => {
                    warn!(
                        "sync record {} for student {} dropped: {}",
                        record.local_id, record.student_id, reason
                    );
                }
            }
            report.results.push(RecordResult {
                local_id: record.local_id,
                outcome,
            });
        }

        info!(
            "batch sync by {}: {} inserted, {} duplicates, {} records total",
            trainer.full_name,
            report.inserted,
            report.duplicates,
            report.results.len()
        );
        Ok(report)
    }

    /// Applies one record; all failures collapse into its own outcome.
    async fn apply(&self, record: &SyncRecord) -> RecordOutcome {
        let at = match DateTime::parse_from_rfc3339(&record.timestamp) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => return RecordOutcome::Error(format!("invalid timestamp: {}", e)),
        };

        match self.dedup.is_duplicate_sync(&record.student_id, at).await {
            Ok(true) => RecordOutcome::Duplicate,
            Ok(false) => match self
                .store
                .insert_attendance(&record.student_id, at, Some(SOURCE_OFFLINE_SYNC))
                .await
            {
                Ok(_) => RecordOutcome::Inserted,
                Err(e) => RecordOutcome::Error(format!("insert failed: {}", e)),
            },
            Err(e) => RecordOutcome::Error(format!("window check failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trainer::Trainer;
    use crate::storage::memory::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn trainer(token: &str, revoked: bool) -> Trainer {
        Trainer {
            id: "t1".to_string(),
            full_name: "Coach".to_string(),
            token: token.to_string(),
            revoked,
        }
    }

    fn record(student_id: &str, at: DateTime<Utc>, local_id: &str) -> SyncRecord {
        SyncRecord {
            student_id: student_id.to_string(),
            timestamp: at.to_rfc3339(),
            local_id: local_id.to_string(),
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_token_touches_nothing() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = BatchReconciler::new(store.clone());

        let result = reconciler
            .reconcile(vec![record("s1", base_time(), "l1")], "nope")
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert!(store.attendance().is_empty());
    }

    #[tokio::test]
    async fn test_revoked_token_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        store.add_trainer(trainer("tok", true));
        let reconciler = BatchReconciler::new(store.clone());

        let result = reconciler
            .reconcile(vec![record("s1", base_time(), "l1")], "tok")
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(store.attendance().is_empty());
    }

    #[tokio::test]
    async fn test_symmetric_window_counts_duplicates() {
        let t = base_time();
        let store = Arc::new(MemoryStore::new());
        store.add_trainer(trainer("tok", false));
        store.insert_attendance("s1", t, None).await.unwrap();
        let reconciler = BatchReconciler::new(store.clone());

        let report = reconciler
            .reconcile(
                vec![
                    record("s1", t - Duration::hours(11), "l1"),
                    record("s1", t + Duration::hours(11), "l2"),
                    record("s1", t - Duration::hours(13), "l3"),
                ],
                "tok",
            )
            .await
            .unwrap();

        assert_eq!(report.duplicates, 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.results[0].outcome, RecordOutcome::Duplicate);
        assert_eq!(report.results[1].outcome, RecordOutcome::Duplicate);
        assert_eq!(report.results[2].outcome, RecordOutcome::Inserted);
    }

    #[tokio::test]
    async fn test_inserted_records_keep_client_time_and_source() {
        let t = base_time();
        let store = Arc::new(MemoryStore::new());
        store.add_trainer(trainer("tok", false));
        let reconciler = BatchReconciler::new(store.clone());

        reconciler
            .reconcile(vec![record("s1", t, "l1")], "tok")
            .await
            .unwrap();

        let records = store.attendance();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].created_at, t);
        assert_eq!(records[0].source.as_deref(), Some(SOURCE_OFFLINE_SYNC));
    }

    #[tokio::test]
    async fn test_bad_timestamp_is_dropped_not_fatal() {
        let t = base_time();
        let store = Arc::new(MemoryStore::new());
        store.add_trainer(trainer("tok", false));
        let reconciler = BatchReconciler::new(store.clone());

        let report = reconciler
            .reconcile(
                vec![
                    SyncRecord {
                        student_id: "s1".to_string(),
                        timestamp: "ayer por la tarde".to_string(),
                        local_id: "l1".to_string(),
                    },
                    record("s2", t, "l2"),
                ],
                "tok",
            )
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 0);
        assert!(matches!(report.results[0].outcome, RecordOutcome::Error(_)));
        assert_eq!(store.attendance().len(), 1);
    }

    #[tokio::test]
    async fn test_records_within_one_batch_dedupe_each_other() {
        let t = base_time();
        let store = Arc::new(MemoryStore::new());
        store.add_trainer(trainer("tok", false));
        let reconciler = BatchReconciler::new(store.clone());

        let report = reconciler
            .reconcile(
                vec![
                    record("s1", t, "l1"),
                    record("s1", t + Duration::hours(1), "l2"),
                ],
                "tok",
            )
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 1);
    }
}
