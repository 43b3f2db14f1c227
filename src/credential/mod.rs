// src/credential/mod.rs
//! Signed offline credential scheme.
//!
//! Self-contained, tamper-evident QR payloads: [`codec`] handles structure,
//! [`signer`] handles the keyed authentication tag, [`issuer`] derives
//! payloads from student records. Verification at scan time lives in
//! [`crate::services::scan_verifier`].

pub mod codec;
pub mod issuer;
pub mod signer;
