// src/models/trainer.rs
//! Trainer registry record.

use serde::{Deserialize, Serialize};

/// A trainer as read from the trainer registry.
///
/// The `token` is an opaque bearer credential that authorizes trainer-scoped
/// operations (credential issuance, offline batch sync). It is a separate
/// trust boundary from the signed QR scheme: validity is a live registry
/// lookup, with `revoked` as the kill switch.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Trainer {
    pub id: String,

    pub full_name: String,

    pub token: String,

    #[serde(default)]
    pub revoked: bool,
}
