// src/models/scan.rs
//! Scan outcome data model.
//!
//! A scan resolves to exactly one terminal state. Business outcomes
//! (`success`, `warning`, `debe`) travel in a 200 envelope so front-line
//! staff get a readable message; only malformed/unverifiable input or an
//! unresolvable code becomes a hard HTTP error.

use serde::{Deserialize, Serialize};

/// Terminal state of an accepted scan request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// New check-in recorded.
    Success,
    /// Duplicate inside the dedup window; nothing recorded.
    Warning,
    /// Blocked: inactive student or expired/absent membership.
    Debe,
}

/// Response envelope for a processed scan.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScanResult {
    pub status: ScanStatus,
    pub message: String,
    pub student_name: String,
}

impl ScanResult {
    pub fn new(status: ScanStatus, message: String, student_name: String) -> Self {
        ScanResult {
            status,
            message,
            student_name,
        }
    }
}
