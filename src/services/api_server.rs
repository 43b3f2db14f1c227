// src/services/api_server.rs
//! HTTP API for the academy backend.
//!
//! The API is built using Axum and exposes:
//! - Signed credential issuance (trainer-token gated)
//! - Legacy credential code generation (trainer-token gated)
//! - Live scan verification and recording
//! - Offline batch-sync reconciliation
//! - The trainer panel roster and PIN login
//!
//! CORS is wide open, as the original scanner/dashboard deployment expects
//! (the frontends are served from other origins).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::credential::issuer::{CredentialIssuer, IssuedCredential};
use crate::error::AppError;
use crate::models::scan::ScanResult;
use crate::models::trainer::Trainer;
use crate::services::auth::TrainerAuth;
use crate::services::scan_verifier::ScanVerifier;
use crate::services::sync::{BatchReconciler, SyncRecord, SyncReport};
use crate::storage::Store;
use crate::utils::dates::{membership_state, Membership};

/// Charset for generated legacy codes (uppercase letters and digits).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of the random part of a legacy code.
const CODE_LEN: usize = 8;

// API request and response structures

/// Request payload for a live scan.
#[derive(Serialize, Deserialize)]
struct ScanRequest {
    code: String,
    /// Optional client-supplied scan time (RFC 3339); server time otherwise.
    timestamp: Option<String>,
}

/// Request payload for offline batch sync.
#[derive(Deserialize)]
struct SyncBatchRequest {
    token: String,
    records: Vec<SyncRecord>,
}

/// Response for legacy credential generation.
#[derive(Serialize, Deserialize)]
struct LegacyCredentialResponse {
    message: String,
    code: String,
}

/// Request payload for trainer panel login.
#[derive(Serialize, Deserialize)]
struct TrainerLoginRequest {
    pin: String,
}

/// Response containing a trainer session token.
#[derive(Serialize, Deserialize)]
struct TrainerLoginResponse {
    access_token: String,
}

/// One row of the trainer roster view.
#[derive(Serialize)]
struct RosterEntry {
    id: String,
    full_name: String,
    #[serde(rename = "horario")]
    schedule: Option<String>,
    #[serde(rename = "turno")]
    shift: Option<String>,
    present: bool,
    time: Option<DateTime<Utc>>,
    debe: bool,
    valid_until: Option<NaiveDate>,
}

/// API server state containing all service dependencies.
pub struct ApiServer {
    /// Service issuing signed credential payloads
    issuer: Arc<CredentialIssuer>,

    /// Service verifying and recording scans
    verifier: Arc<ScanVerifier>,

    /// Service reconciling offline scan batches
    reconciler: Arc<BatchReconciler>,

    /// Trainer panel PIN login / JWT sessions
    auth: Arc<TrainerAuth>,

    /// External store, for registry lookups and the roster view
    store: Arc<dyn Store>,
}

impl ApiServer {
    pub fn new(
        issuer: CredentialIssuer,
        verifier: ScanVerifier,
        reconciler: BatchReconciler,
        auth: TrainerAuth,
        store: Arc<dyn Store>,
    ) -> Self {
        ApiServer {
            issuer: Arc::new(issuer),
            verifier: Arc::new(verifier),
            reconciler: Arc::new(reconciler),
            auth: Arc::new(auth),
            store,
        }
    }

    /// Builds the application router with all routes configured.
    pub fn router(self) -> Router {
        Router::new()
            .route("/credentials/issue/:student_id", post(Self::issue_handler))
            .route(
                "/credentials/legacy/:student_id",
                post(Self::legacy_credential_handler),
            )
            .route("/attendance/scan", post(Self::scan_handler))
            .route("/attendance/sync-batch", post(Self::sync_batch_handler))
            .route("/attendance/today", get(Self::today_handler))
            .route("/trainer/login", post(Self::trainer_login_handler))
            .route("/status", get(Self::status_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(self))
    }

    /// Starts the API server and begins listening for requests.
    pub async fn run(self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server running at http://{}", addr);
        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Resolves the `Authorization: Bearer` header against the trainer
    /// registry. Gate for issuance endpoints; batch sync carries its token
    /// in the body instead (the offline worker has no header plumbing).
    async fn require_trainer(&self, headers: &HeaderMap) -> Result<Trainer, AppError> {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Token requerido".to_string()))?;

        let trainer = self
            .store
            .find_trainer_by_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Token inválido".to_string()))?;
        if trainer.revoked {
            return Err(AppError::Forbidden(
                "Acceso denegado: token revocado".to_string(),
            ));
        }
        Ok(trainer)
    }

    // =====================
    // Credential Handlers
    // =====================

    /// Issues a signed credential payload for a student.
    ///
    /// # Endpoint
    /// POST /credentials/issue/:student_id
    ///
    /// # Responses
    /// - 200 OK: payload, student name, expiry snapshot, QR render URL
    /// - 400 Bad Request: student inactive
    /// - 404 Not Found: student missing
    /// - 401/403: missing or revoked trainer token
    async fn issue_handler(
        State(state): State<Arc<ApiServer>>,
        Path(student_id): Path<String>,
        headers: HeaderMap,
    ) -> Result<Json<IssuedCredential>, AppError> {
        state.require_trainer(&headers).await?;
        let issued = state.issuer.issue(&student_id).await?;
        Ok(Json(issued))
    }

    /// Generates and stores a legacy (unsigned) credential code.
    ///
    /// Kept for backward compatibility with printed cards; new credentials
    /// should use the signed format.
    ///
    /// # Endpoint
    /// POST /credentials/legacy/:student_id
    async fn legacy_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(student_id): Path<String>,
        headers: HeaderMap,
    ) -> Result<Json<LegacyCredentialResponse>, AppError> {
        state.require_trainer(&headers).await?;

        state
            .store
            .find_student(&student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Estudiante no existe".to_string()))?;

        let code = {
            let mut rng = rand::thread_rng();
            let suffix: String = (0..CODE_LEN)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            format!("STU-{}", suffix)
        };
        state.store.insert_credential(&student_id, &code).await?;

        Ok(Json(LegacyCredentialResponse {
            message: "Credencial creada".to_string(),
            code,
        }))
    }

    // =====================
    // Attendance Handlers
    // =====================

    /// Verifies a scan code and records the check-in.
    ///
    /// # Endpoint
    /// POST /attendance/scan
    ///
    /// # Responses
    /// - 200 OK: `{status: success|warning|debe, message, student_name}`
    /// - 400 Bad Request: tampered/malformed signed code, bad timestamp
    /// - 404 Not Found: unknown code or student
    async fn scan_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<ScanRequest>,
    ) -> Result<Json<ScanResult>, AppError> {
        let at = match &payload.timestamp {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|_| AppError::BadRequest("Marca de tiempo inválida".to_string()))?,
            ),
            None => None,
        };

        let result = state.verifier.verify_scan(&payload.code, at).await?;
        Ok(Json(result))
    }

    /// Reconciles a batch of offline-buffered scans.
    ///
    /// # Endpoint
    /// POST /attendance/sync-batch
    ///
    /// # Responses
    /// - 200 OK: `{inserted, duplicates, results}`
    /// - 401 Unauthorized: unknown trainer token
    /// - 403 Forbidden: revoked trainer token
    async fn sync_batch_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<SyncBatchRequest>,
    ) -> Result<Json<SyncReport>, AppError> {
        let report = state
            .reconciler
            .reconcile(payload.records, &payload.token)
            .await?;
        Ok(Json(report))
    }

    /// Trainer roster: every active student with today's attendance state
    /// and membership status.
    ///
    /// # Endpoint
    /// GET /attendance/today (trainer session JWT)
    async fn today_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
    ) -> Result<Json<Vec<RosterEntry>>, AppError> {
        let authorization = headers.get("authorization").and_then(|v| v.to_str().ok());
        state.auth.verify_bearer(authorization)?;

        let now = Utc::now();
        let today = now.date_naive();
        let midnight = Utc.from_utc_datetime(&today.and_hms_opt(0, 0, 0).unwrap());

        let students = state.store.list_active_students().await?;
        let attended = state.store.attendance_since(midnight).await?;

        let roster = students
            .into_iter()
            .map(|student| {
                let time = attended
                    .iter()
                    .filter(|r| r.student_id == student.id)
                    .map(|r| r.created_at)
                    .min();
                // Roster view flags only a dated, past-due expiry; students
                // with nothing on file are chased at scan time instead.
                let debe = matches!(
                    membership_state(student.valid_until, today),
                    Membership::Overdue(_)
                );
                RosterEntry {
                    id: student.id,
                    full_name: student.full_name,
                    schedule: student.schedule,
                    shift: student.shift,
                    present: time.is_some(),
                    time,
                    debe,
                    valid_until: student.valid_until,
                }
            })
            .collect();

        Ok(Json(roster))
    }

    // =====================
    // Trainer Panel
    // =====================

    /// Exchanges the trainer PIN for a session token.
    ///
    /// # Endpoint
    /// POST /trainer/login
    async fn trainer_login_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<TrainerLoginRequest>,
    ) -> Result<Json<TrainerLoginResponse>, AppError> {
        let access_token = state.auth.login(&payload.pin)?;
        Ok(Json(TrainerLoginResponse { access_token }))
    }

    /// Liveness probe.
    ///
    /// # Endpoint
    /// GET /status
    async fn status_handler() -> Json<Value> {
        Json(json!({ "status": "Backend funcionando 🚀" }))
    }
}
