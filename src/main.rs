// src/main.rs
//! Main entry point for the academy backend.
//!
//! Loads configuration, wires the credential and attendance services to the
//! hosted store adapter, and starts the API server.

use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use log::info;

use jrstars_backend::config::Settings;
use jrstars_backend::credential::issuer::CredentialIssuer;
use jrstars_backend::credential::signer::Signer;
use jrstars_backend::services::api_server::ApiServer;
use jrstars_backend::services::auth::TrainerAuth;
use jrstars_backend::services::scan_verifier::ScanVerifier;
use jrstars_backend::services::sync::BatchReconciler;
use jrstars_backend::storage::supabase::SupabaseStore;
use jrstars_backend::storage::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let settings = Settings::load()?;

    // External store adapter, shared across services
    let store: Arc<dyn Store> =
        Arc::new(SupabaseStore::new(&settings.supabase_url, &settings.supabase_key)?);

    // Process-wide signing key, loaded once and immutable from here on
    let signer = Arc::new(Signer::new(&settings.signing_key));

    let issuer = CredentialIssuer::new(store.clone(), signer.clone());
    let verifier = ScanVerifier::new(store.clone(), signer);
    let reconciler = BatchReconciler::new(store.clone());
    let auth = TrainerAuth::new(&settings.trainer_pin, &settings.jwt_secret);

    let api_server = ApiServer::new(issuer, verifier, reconciler, auth, store);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!("starting academy backend on {}", addr);
    api_server.run(addr).await
}
