// tests/scan_flow.rs
//! End-to-end flows: issue a signed credential, scan it through its
//! lifecycle, and reconcile offline batches — all against the in-memory
//! store.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use jrstars_backend::credential::issuer::CredentialIssuer;
use jrstars_backend::credential::signer::Signer;
use jrstars_backend::error::AppError;
use jrstars_backend::models::scan::ScanStatus;
use jrstars_backend::models::student::Student;
use jrstars_backend::models::trainer::Trainer;
use jrstars_backend::services::scan_verifier::ScanVerifier;
use jrstars_backend::services::sync::{BatchReconciler, SyncRecord};
use jrstars_backend::storage::memory::MemoryStore;

const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

struct Academy {
    store: Arc<MemoryStore>,
    issuer: CredentialIssuer,
    verifier: ScanVerifier,
    reconciler: BatchReconciler,
}

fn academy() -> Academy {
    let store = Arc::new(MemoryStore::new());
    let signer = Arc::new(Signer::new(KEY));
    Academy {
        issuer: CredentialIssuer::new(store.clone(), signer.clone()),
        verifier: ScanVerifier::new(store.clone(), signer),
        reconciler: BatchReconciler::new(store.clone()),
        store,
    }
}

fn enroll(store: &MemoryStore, id: &str, name: &str, valid_until: Option<(i32, u32, u32)>) {
    store.add_student(Student {
        id: id.to_string(),
        full_name: name.to_string(),
        is_active: true,
        valid_until: valid_until.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        schedule: Some("LMV".to_string()),
        shift: None,
    });
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

#[tokio::test]
async fn signed_credential_full_lifecycle() {
    let academy = academy();
    enroll(&academy.store, "abc-123", "José Pérez", Some((2026, 5, 1)));

    let issued = academy.issuer.issue("abc-123").await.unwrap();
    assert_eq!(issued.expiry, "20260501");

    // First scan well before expiry: success, one record, no source tag.
    let first = academy
        .verifier
        .verify_scan(&issued.payload, Some(at(2026, 4, 1, 10)))
        .await
        .unwrap();
    assert_eq!(first.status, ScanStatus::Success);
    assert_eq!(first.student_name, "José Pérez");
    let records = academy.store.attendance();
    assert_eq!(records.len(), 1);
    assert!(records[0].source.is_none());

    // Same payload an hour later: duplicate warning, no new record.
    let replay = academy
        .verifier
        .verify_scan(&issued.payload, Some(at(2026, 4, 1, 11)))
        .await
        .unwrap();
    assert_eq!(replay.status, ScanStatus::Warning);
    assert_eq!(academy.store.attendance().len(), 1);

    // Day after expiry: blocked, one day overdue.
    let overdue = academy
        .verifier
        .verify_scan(&issued.payload, Some(at(2026, 5, 2, 10)))
        .await
        .unwrap();
    assert_eq!(overdue.status, ScanStatus::Debe);
    assert!(overdue.message.contains('1'));
    assert_eq!(academy.store.attendance().len(), 1);
}

#[tokio::test]
async fn renewal_requires_reissue_on_signed_path() {
    let academy = academy();
    enroll(&academy.store, "abc-123", "Ana", Some((2026, 3, 1)));
    let stale = academy.issuer.issue("abc-123").await.unwrap().payload;

    // Membership renewed in the store, credential not reissued.
    enroll(&academy.store, "abc-123", "Ana", Some((2026, 9, 1)));

    // The old payload still carries the frozen expiry and scans as overdue.
    let result = academy
        .verifier
        .verify_scan(&stale, Some(at(2026, 4, 1, 10)))
        .await
        .unwrap();
    assert_eq!(result.status, ScanStatus::Debe);

    // Reissuing picks up the renewal.
    let fresh = academy.issuer.issue("abc-123").await.unwrap().payload;
    let result = academy
        .verifier
        .verify_scan(&fresh, Some(at(2026, 4, 1, 10)))
        .await
        .unwrap();
    assert_eq!(result.status, ScanStatus::Success);
}

#[tokio::test]
async fn offline_batch_reconciles_against_live_scans() {
    let academy = academy();
    enroll(&academy.store, "abc-123", "Ana", Some((2026, 12, 1)));
    academy.store.add_trainer(Trainer {
        id: "t1".to_string(),
        full_name: "Coach".to_string(),
        token: "coach-token".to_string(),
        revoked: false,
    });

    // A live scan happened at 10:00.
    enroll(&academy.store, "def-456", "Luis", Some((2026, 12, 1)));
    academy.store.add_legacy_code("STU-LUIS0001", "def-456", true);
    academy
        .verifier
        .verify_scan("STU-LUIS0001", Some(at(2026, 4, 1, 10)))
        .await
        .unwrap();

    // The offline device also caught Luis at 09:00 (before the live scan)
    // plus a genuinely new visit from Ana.
    let report = academy
        .reconciler
        .reconcile(
            vec![
                SyncRecord {
                    student_id: "def-456".to_string(),
                    timestamp: at(2026, 4, 1, 9).to_rfc3339(),
                    local_id: "l1".to_string(),
                },
                SyncRecord {
                    student_id: "abc-123".to_string(),
                    timestamp: at(2026, 4, 1, 9).to_rfc3339(),
                    local_id: "l2".to_string(),
                },
            ],
            "coach-token",
        )
        .await
        .unwrap();

    assert_eq!(report.duplicates, 1);
    assert_eq!(report.inserted, 1);

    let synced: Vec<_> = academy
        .store
        .attendance()
        .into_iter()
        .filter(|r| r.source.is_some())
        .collect();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].student_id, "abc-123");
    assert_eq!(synced[0].created_at, at(2026, 4, 1, 9));
}

#[tokio::test]
async fn unauthorized_batch_is_rejected_before_any_record() {
    let academy = academy();
    enroll(&academy.store, "abc-123", "Ana", Some((2026, 12, 1)));

    let result = academy
        .reconciler
        .reconcile(
            vec![SyncRecord {
                student_id: "abc-123".to_string(),
                timestamp: Utc::now().to_rfc3339(),
                local_id: "l1".to_string(),
            }],
            "no-such-token",
        )
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert!(academy.store.attendance().is_empty());
}

#[tokio::test]
async fn live_rescan_after_window_is_a_new_visit() {
    let academy = academy();
    enroll(&academy.store, "abc-123", "Ana", Some((2026, 12, 1)));
    let payload = academy.issuer.issue("abc-123").await.unwrap().payload;

    let t = at(2026, 4, 1, 8);
    academy.verifier.verify_scan(&payload, Some(t)).await.unwrap();

    let within = academy
        .verifier
        .verify_scan(&payload, Some(t + Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(within.status, ScanStatus::Warning);

    let beyond = academy
        .verifier
        .verify_scan(&payload, Some(t + Duration::hours(13)))
        .await
        .unwrap();
    assert_eq!(beyond.status, ScanStatus::Success);
    assert_eq!(academy.store.attendance().len(), 2);
}
