// src/services/auth.rs
//! Trainer panel authentication.
//!
//! The trainer panel logs in with a shared numeric PIN and gets back a
//! short-lived JWT for the roster endpoints. This is deliberately a separate
//! trust boundary from both the signed QR scheme (keyed payload tags) and
//! the trainer registry tokens that gate issuance and batch sync.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use ring::constant_time;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session lifetime for a trainer panel login.
const SESSION_HOURS: i64 = 12;

/// Claims carried by a trainer session token.
#[derive(Serialize, Deserialize, Debug)]
pub struct TrainerClaims {
    pub sub: String,
    pub exp: usize,
}

/// PIN login and JWT session verification for the trainer panel.
pub struct TrainerAuth {
    pin: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TrainerAuth {
    pub fn new(pin: &str, jwt_secret: &str) -> Self {
        TrainerAuth {
            pin: pin.to_string(),
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    /// Exchanges the shared PIN for a session token.
    pub fn login(&self, pin: &str) -> Result<String, AppError> {
        let matches =
            constant_time::verify_slices_are_equal(pin.as_bytes(), self.pin.as_bytes()).is_ok();
        if !matches {
            return Err(AppError::Unauthorized(
                "Credenciales incorrectas".to_string(),
            ));
        }

        let claims = TrainerClaims {
            sub: "entrenador".to_string(),
            exp: (Utc::now() + Duration::hours(SESSION_HOURS)).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| AppError::Unauthorized("No se pudo emitir la sesión".to_string()))
    }

    /// Validates a `Bearer` authorization header value.
    pub fn verify_bearer(&self, authorization: Option<&str>) -> Result<TrainerClaims, AppError> {
        let header =
            authorization.ok_or_else(|| AppError::Unauthorized("Token requerido".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Token requerido".to_string()))?;

        decode::<TrainerClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Token inválido o expirado".to_string()))
    }
}
