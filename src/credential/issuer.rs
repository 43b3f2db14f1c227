// src/credential/issuer.rs
//! Signed credential issuance.
//!
//! Builds the self-contained payload string for a student: identity plus a
//! snapshot of the membership expiry, bound together by the signer's tag.
//! Issuance is stateless and idempotent — nothing is written to the store,
//! and re-issuing simply re-derives the string from current data. Revocation
//! is deactivating the student row, which the scan verifier re-checks
//! regardless of signature validity.

use std::sync::Arc;

use serde::Serialize;

use crate::credential::codec::{self, PAYLOAD_PREFIX};
use crate::credential::signer::Signer;
use crate::error::AppError;
use crate::storage::Store;
use crate::utils::dates::{format_expiry, MIN_EXPIRY};

/// Third-party QR rendering endpoint; the payload rides in the `data`
/// parameter. An external display convenience, not part of the trust model.
const QR_RENDER_URL: &str = "https://api.qrserver.com/v1/create-qr-code/?size=300x300&data=";

/// A freshly issued credential, ready for printing or on-screen display.
#[derive(Serialize, Debug, Clone)]
pub struct IssuedCredential {
    /// The full signed payload string encoded in the QR.
    pub payload: String,
    pub student_name: String,
    /// Compact `YYYYMMDD` expiry snapshotted into the payload.
    pub expiry: String,
    /// URL rendering the payload as a QR image.
    pub qr_url: String,
}

/// Service that derives signed payloads from student records.
pub struct CredentialIssuer {
    store: Arc<dyn Store>,
    signer: Arc<Signer>,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn Store>, signer: Arc<Signer>) -> Self {
        CredentialIssuer { store, signer }
    }

    /// Issues a signed payload for a student.
    ///
    /// # Errors
    /// - [`AppError::NotFound`] when the student does not exist
    /// - [`AppError::InvalidState`] when the student exists but is inactive
    ///
    /// A student with no expiry on file still gets a credential: the expiry
    /// field is snapshotted as [`MIN_EXPIRY`], so the scan verifier reports
    /// "owes" instead of this call failing. Front desk sees a readable
    /// state, not an error.
    pub async fn issue(&self, student_id: &str) -> Result<IssuedCredential, AppError> {
        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Estudiante no existe".to_string()))?;

        if !student.is_active {
            return Err(AppError::InvalidState(
                "Alumno inactivo: no se puede emitir credencial".to_string(),
            ));
        }

        let expiry = student
            .valid_until
            .map(format_expiry)
            .unwrap_or_else(|| MIN_EXPIRY.to_string());

        let name_b64 = codec::encode_name(&student.full_name);
        let tag = self.signer.tag(&student.id, &expiry, &student.full_name);
        let payload = format!(
            "{}{}:{}:{}:{}",
            PAYLOAD_PREFIX, student.id, expiry, name_b64, tag
        );
        let qr_url = format!("{}{}", QR_RENDER_URL, payload);

        Ok(IssuedCredential {
            payload,
            student_name: student.full_name,
            expiry,
            qr_url,
        })
    }
}
