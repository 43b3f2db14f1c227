// src/utils/mod.rs
//! Helper functions.

pub mod dates;
