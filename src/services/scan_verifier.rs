// src/services/scan_verifier.rs
//! Scan verification state machine.
//!
//! Every live check-in attempt lands here with a raw code string. The code
//! resolves to exactly one terminal outcome:
//!
//! - `success` — new attendance record inserted
//! - `warning` — duplicate inside the dedup window, nothing inserted
//! - `debe` — blocked: inactive student or expired/absent membership
//! - rejected — malformed/unverifiable input, surfaced as an HTTP error
//!
//! Signed codes (`JRS:` prefix) are trusted from the payload itself: the
//! expiry is read from the signed fields, not re-queried, so disconnected
//! scanning devices keep working. The trade-off is that the expiry is frozen
//! at issuance until the credential is reissued. Legacy codes take the
//! opposite route and trust the live store row. Student existence and
//! active-status are always re-checked against the store on either path.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::credential::codec::{self, ParsedPayload, PayloadParse};
use crate::credential::signer::Signer;
use crate::error::AppError;
use crate::models::scan::{ScanResult, ScanStatus};
use crate::models::student::Student;
use crate::services::dedup::DedupWindow;
use crate::storage::Store;
use crate::utils::dates::{membership_state, parse_expiry, Membership};

/// One rejection message for malformed and forged signed codes alike; the
/// caller must not learn which field was wrong.
const REJECT_MESSAGE: &str = "Credencial inválida o alterada";

/// Verifies scan codes and records accepted check-ins.
pub struct ScanVerifier {
    store: Arc<dyn Store>,
    signer: Arc<Signer>,
    dedup: DedupWindow,
}

impl ScanVerifier {
    pub fn new(store: Arc<dyn Store>, signer: Arc<Signer>) -> Self {
        let dedup = DedupWindow::new(store.clone());
        ScanVerifier {
            store,
            signer,
            dedup,
        }
    }

    /// Processes one scan attempt.
    ///
    /// # Arguments
    /// * `code` - raw scan code, signed or legacy format
    /// * `at` - client-supplied scan time, or `None` for server time
    ///
    /// # Errors
    /// - [`AppError::InvalidCredential`] (400) when a signed code fails its
    ///   structure or tag check
    /// - [`AppError::NotFound`] (404) when the code or its student cannot be
    ///   resolved
    pub async fn verify_scan(
        &self,
        code: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<ScanResult, AppError> {
        let at = at.unwrap_or_else(Utc::now);
        match codec::parse(code) {
            PayloadParse::Signed(payload) => self.verify_signed(payload, at).await,
            PayloadParse::Malformed => {
                Err(AppError::InvalidCredential(REJECT_MESSAGE.to_string()))
            }
            PayloadParse::NotSigned => self.verify_legacy(code, at).await,
        }
    }

    /// Signed path: tag check first, then store re-check of the student,
    /// then the payload-embedded expiry.
    async fn verify_signed(
        &self,
        payload: ParsedPayload,
        at: DateTime<Utc>,
    ) -> Result<ScanResult, AppError> {
        // The tag covers the decoded name; an undecodable name can never
        // have been issued, so it is the same rejection as a bad tag.
        let name = codec::decode_name(&payload.name_b64)
            .map_err(|_| AppError::InvalidCredential(REJECT_MESSAGE.to_string()))?;

        let expected = self
            .signer
            .tag(&payload.student_id, &payload.expiry, &name);
        if !self.signer.verify(&payload.tag, &expected) {
            return Err(AppError::InvalidCredential(REJECT_MESSAGE.to_string()));
        }

        let student = self
            .store
            .find_student(&payload.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Estudiante no existe".to_string()))?;

        // Expiry from the payload, trusted because it passed the tag check.
        self.admit(&student, parse_expiry(&payload.expiry), at).await
    }

    /// Legacy path: the code itself proves nothing; the store row does.
    /// Expiry and active-status both come from the live student record.
    async fn verify_legacy(&self, code: &str, at: DateTime<Utc>) -> Result<ScanResult, AppError> {
        let student = self
            .store
            .find_student_by_credential_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound("Credencial inválida".to_string()))?;

        self.admit(&student, student.valid_until, at).await
    }

    /// Common tail of both paths: active-status, membership, dedup, insert.
    async fn admit(
        &self,
        student: &Student,
        expiry: Option<chrono::NaiveDate>,
        at: DateTime<Utc>,
    ) -> Result<ScanResult, AppError> {
        let name = student.full_name.clone();

        if !student.is_active {
            return Ok(ScanResult::new(
                ScanStatus::Debe,
                format!("Alumno inactivo: {}", name),
                name,
            ));
        }

        match membership_state(expiry, at.date_naive()) {
            Membership::NoExpiry => {
                return Ok(ScanResult::new(
                    ScanStatus::Debe,
                    format!("Sin membresía vigente: {}", name),
                    name,
                ));
            }
            Membership::Overdue(days) => {
                return Ok(ScanResult::new(
                    ScanStatus::Debe,
                    format!("Membresía vencida hace {} día(s): {}", days, name),
                    name,
                ));
            }
            Membership::Current => {}
        }

        if self.dedup.is_duplicate_live(&student.id, at).await? {
            return Ok(ScanResult::new(
                ScanStatus::Warning,
                format!("Ya registrado: {}", name),
                name,
            ));
        }

        self.store.insert_attendance(&student.id, at, None).await?;
        Ok(ScanResult::new(
            ScanStatus::Success,
            format!("¡Bienvenido, {}!", name),
            name,
        ))
    }
}
