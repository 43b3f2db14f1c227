// src/models/mod.rs
//! Data structures shared across the backend.

pub mod attendance;
pub mod scan;
pub mod student;
pub mod trainer;
