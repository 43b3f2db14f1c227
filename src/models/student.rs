// src/models/student.rs
//! Student roster record.
//!
//! Mirrors the fields of the hosted `students` table that the credential and
//! attendance logic touches. The full relational schema (billing, smoothie
//! credits, contact data) lives entirely in the external store and is not
//! modeled here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A student as read from the roster table.
///
/// # Fields
/// - `id`: opaque unique identifier (string form of a UUID)
/// - `full_name`: display name shown on scan results and credentials
/// - `is_active`: soft-delete flag; inactive students are blocked at scan time
/// - `valid_until`: membership expiry date, absent when nothing is on file
/// - `schedule` / `shift`: training-plan metadata surfaced on the trainer roster
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Student {
    pub id: String,

    pub full_name: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Membership expiry (`DATE` column, `YYYY-MM-DD` on the wire).
    /// `None` means no expiry on record, which scan logic treats as overdue.
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,

    /// Weekly schedule code (e.g. "LMV").
    #[serde(default, rename = "horario")]
    pub schedule: Option<String>,

    /// Morning/evening shift.
    #[serde(default, rename = "turno")]
    pub shift: Option<String>,
}

fn default_active() -> bool {
    true
}
