// src/services/dedup.rs
//! Attendance dedup window.
//!
//! For a given student, no two attendance records count as distinct visits
//! within 12 hours of each other. This module only answers the question —
//! it never inserts; the caller decides what to do with a duplicate.
//!
//! The check-then-insert sequence around it is not atomic: two
//! near-simultaneous scans of the same student can both pass before either
//! insert lands. Accepted limitation; whichever record lands first becomes
//! canonical for later window checks.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::storage::{Store, StoreError};

/// Width of the dedup window on each side, in hours.
pub const WINDOW_HOURS: i64 = 12;

/// Read-only duplicate detector over stored attendance.
pub struct DedupWindow {
    store: Arc<dyn Store>,
}

impl DedupWindow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        DedupWindow { store }
    }

    /// Live-scan check: duplicate if any record exists in `[at - 12h, at]`.
    pub async fn is_duplicate_live(
        &self,
        student_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let existing = self
            .store
            .query_attendance(student_id, at - Duration::hours(WINDOW_HOURS), at)
            .await?;
        Ok(!existing.is_empty())
    }

    /// Batch-sync check: duplicate if any record exists in `[at - 12h, at + 12h]`.
    ///
    /// The window is symmetric because offline records arrive out of
    /// chronological order relative to already-synced ones; the check must
    /// catch the duplicate regardless of which record landed first.
    pub async fn is_duplicate_sync(
        &self,
        student_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let existing = self
            .store
            .query_attendance(
                student_id,
                at - Duration::hours(WINDOW_HOURS),
                at + Duration::hours(WINDOW_HOURS),
            )
            .await?;
        Ok(!existing.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()
    }

    async fn store_with_record_at(at: DateTime<Utc>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_attendance("s1", at, None).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_live_window_inside_and_outside() {
        let t = base_time();
        let dedup = DedupWindow::new(store_with_record_at(t).await);

        assert!(dedup.is_duplicate_live("s1", t + Duration::hours(1)).await.unwrap());
        assert!(dedup.is_duplicate_live("s1", t + Duration::hours(12)).await.unwrap());
        assert!(!dedup.is_duplicate_live("s1", t + Duration::hours(13)).await.unwrap());
        // The live window does not look forward.
        assert!(!dedup.is_duplicate_live("s1", t - Duration::hours(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_sync_window_is_symmetric() {
        let t = base_time();
        let dedup = DedupWindow::new(store_with_record_at(t).await);

        assert!(dedup.is_duplicate_sync("s1", t - Duration::hours(11)).await.unwrap());
        assert!(dedup.is_duplicate_sync("s1", t + Duration::hours(11)).await.unwrap());
        assert!(!dedup.is_duplicate_sync("s1", t - Duration::hours(13)).await.unwrap());
        assert!(!dedup.is_duplicate_sync("s1", t + Duration::hours(13)).await.unwrap());
    }

    #[tokio::test]
    async fn test_other_students_do_not_collide() {
        let t = base_time();
        let dedup = DedupWindow::new(store_with_record_at(t).await);
        assert!(!dedup.is_duplicate_live("s2", t + Duration::hours(1)).await.unwrap());
    }
}
