// src/storage/mod.rs
//! External store abstraction.
//!
//! The hosted relational backend is the sole arbiter of durability and
//! consistency; this backend performs no local locking and reaches the store
//! only through the narrow [`Store`] trait below. The production adapter
//! speaks the hosted PostgREST API ([`supabase::SupabaseStore`]); tests run
//! against the in-memory [`memory::MemoryStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::attendance::AttendanceRecord;
use crate::models::student::Student;
use crate::models::trainer::Trainer;

pub mod memory;
pub mod supabase;

/// Store-level failure, opaque to API callers (mapped to 500).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected store response: {0}")]
    Unexpected(String),
}

/// Operations the backend consumes from the external store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Looks up a student by id.
    async fn find_student(&self, id: &str) -> Result<Option<Student>, StoreError>;

    /// Resolves an active legacy credential code to its linked student.
    ///
    /// Returns `None` when the code matches no row or the row is inactive.
    async fn find_student_by_credential_code(
        &self,
        code: &str,
    ) -> Result<Option<Student>, StoreError>;

    /// Looks up a trainer by its opaque bearer token.
    async fn find_trainer_by_token(&self, token: &str) -> Result<Option<Trainer>, StoreError>;

    /// Inserts an attendance record.
    async fn insert_attendance(
        &self,
        student_id: &str,
        at: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<AttendanceRecord, StoreError>;

    /// Returns attendance records for a student with
    /// `from <= created_at <= to`.
    async fn query_attendance(
        &self,
        student_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Returns all active students ordered by name.
    async fn list_active_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Returns all attendance records with `created_at >= since`, any student.
    async fn attendance_since(&self, since: DateTime<Utc>)
        -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Stores a freshly generated legacy credential code for a student.
    async fn insert_credential(&self, student_id: &str, code: &str) -> Result<(), StoreError>;
}
