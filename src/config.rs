// src/config.rs
//! Startup configuration.
//!
//! All settings come from the environment (a `.env` file is honored in
//! development via `dotenv`). Required values without defaults fail startup
//! with a readable message instead of limping along half-configured.
//!
//! ## Environment Variables
//! - `SIGNING_KEY`: credential signing secret — hex-encoded 32 bytes
//!   recommended; any other string is used as raw key bytes
//! - `SUPABASE_URL` / `SUPABASE_KEY`: hosted store project URL and service key
//! - `TRAINER_PIN`: shared PIN for the trainer panel login
//! - `JWT_SECRET`: signing secret for trainer session tokens
//! - `PORT`: listen port (default 8000)

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,

    pub signing_key: String,

    pub supabase_url: String,
    pub supabase_key: String,

    pub trainer_pin: String,
    pub jwt_secret: String,
}

fn default_port() -> u16 {
    8000
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }
}
