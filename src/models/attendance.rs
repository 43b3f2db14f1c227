// src/models/attendance.rs
//! Attendance record data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker stored in `source` for records created by offline batch sync.
pub const SOURCE_OFFLINE_SYNC: &str = "offline_sync";

/// A single check-in for a student.
///
/// Created by a successful live scan or by batch reconciliation; never
/// mutated or deleted by this backend.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AttendanceRecord {
    pub student_id: String,

    /// Occurrence time. For live scans this is the server (or client-supplied)
    /// scan time; for batch-synced records it is the client's original
    /// timestamp, preserved on purpose.
    pub created_at: DateTime<Utc>,

    /// `Some("offline_sync")` for batch-synced records, `None` for live scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
