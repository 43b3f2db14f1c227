// src/lib.rs
//! # JR Stars Academy Backend
//!
//! Gym/academy management backend: student roster, attendance check-in via
//! scannable credentials, and trainer-gated operations.
//!
//! ## Architecture Overview
//! 1. **Credential Layer**: signed offline QR payloads (codec, signer, issuer)
//! 2. **Services Layer**: scan verification, dedup window, batch sync, API
//! 3. **Storage Layer**: narrow trait over the hosted relational backend
//!
//! The signed credential scheme is the heart of the system: a self-contained,
//! tamper-evident payload that lets attendance scanning work without a live
//! trust round trip, reconciled later through the offline batch-sync
//! protocol.

// Module declarations (organized by functional domain)
pub mod config; // Startup configuration
pub mod credential; // Signed payload codec, signer, issuer
pub mod error; // Error taxonomy and HTTP mapping
pub mod models; // Data structures
pub mod services; // Business logic and API
pub mod storage; // External store trait and adapters
pub mod utils; // Helper functions
