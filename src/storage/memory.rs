// src/storage/memory.rs
//! In-memory store implementation.
//!
//! Backs the unit and integration tests with the same [`Store`] surface the
//! production adapter exposes, so the credential and attendance logic can be
//! exercised without a hosted backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Store, StoreError};
use crate::models::attendance::AttendanceRecord;
use crate::models::student::Student;
use crate::models::trainer::Trainer;

#[derive(Default)]
struct Inner {
    students: HashMap<String, Student>,
    /// Legacy code -> student id, plus an active flag per code.
    credentials: HashMap<String, (String, bool)>,
    /// Token -> trainer.
    trainers: HashMap<String, Trainer>,
    attendance: Vec<AttendanceRecord>,
}

/// Mutex-guarded in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn add_student(&self, student: Student) {
        let mut inner = self.inner.lock().unwrap();
        inner.students.insert(student.id.clone(), student);
    }

    pub fn add_legacy_code(&self, code: &str, student_id: &str, active: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .credentials
            .insert(code.to_string(), (student_id.to_string(), active));
    }

    pub fn add_trainer(&self, trainer: Trainer) {
        let mut inner = self.inner.lock().unwrap();
        inner.trainers.insert(trainer.token.clone(), trainer);
    }

    /// Snapshot of every attendance record, for assertions.
    pub fn attendance(&self) -> Vec<AttendanceRecord> {
        self.inner.lock().unwrap().attendance.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_student(&self, id: &str) -> Result<Option<Student>, StoreError> {
        Ok(self.inner.lock().unwrap().students.get(id).cloned())
    }

    async fn find_student_by_credential_code(
        &self,
        code: &str,
    ) -> Result<Option<Student>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let student = inner
            .credentials
            .get(code)
            .filter(|(_, active)| *active)
            .and_then(|(student_id, _)| inner.students.get(student_id))
            .cloned();
        Ok(student)
    }

    async fn find_trainer_by_token(&self, token: &str) -> Result<Option<Trainer>, StoreError> {
        Ok(self.inner.lock().unwrap().trainers.get(token).cloned())
    }

    async fn insert_attendance(
        &self,
        student_id: &str,
        at: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<AttendanceRecord, StoreError> {
        let record = AttendanceRecord {
            student_id: student_id.to_string(),
            created_at: at,
            source: source.map(str::to_string),
        };
        self.inner.lock().unwrap().attendance.push(record.clone());
        Ok(record)
    }

    async fn query_attendance(
        &self,
        student_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attendance
            .iter()
            .filter(|r| r.student_id == student_id && r.created_at >= from && r.created_at <= to)
            .cloned()
            .collect())
    }

    async fn list_active_students(&self) -> Result<Vec<Student>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut students: Vec<Student> = inner
            .students
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        students.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(students)
    }

    async fn attendance_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attendance
            .iter()
            .filter(|r| r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn insert_credential(&self, student_id: &str, code: &str) -> Result<(), StoreError> {
        self.add_legacy_code(code, student_id, true);
        Ok(())
    }
}
