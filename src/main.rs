#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use shelfmark::{
    handlers::{
        finish_assertion, finish_registration, health, provision_user, revoke_credential,
        start_assertion, start_registration,
    },
    passkey::{
        CeremonyOrchestrator, ChallengeCache, CredentialLookup, CredentialStore,
        InMemoryChallengeCache, InMemoryCredentialStore, InMemoryUserDirectory,
        StoreCredentialLookup, StructuralVerifier, UserDirectory, VerificationEngine,
    },
    session::SessionManager,
    settings::ShelfmarkSettings,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = ShelfmarkSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    start_server(settings).await
}

/// Start the server with in-memory ceremony state
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(settings: ShelfmarkSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    // Wire the ceremony components; every collaborator is trait-object based
    // so deployments can swap in persistent backends
    let cache: Arc<dyn ChallengeCache> = Arc::new(InMemoryChallengeCache::new());
    let store: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
    let users: Arc<dyn UserDirectory> = Arc::new(InMemoryUserDirectory::new());
    let lookup: Arc<dyn CredentialLookup> = Arc::new(StoreCredentialLookup::new(
        Arc::clone(&store),
        Arc::clone(&users),
    ));
    let engine: Arc<dyn VerificationEngine> =
        Arc::new(StructuralVerifier::new(settings.passkeys.clone()));

    let orchestrator = web::Data::new(CeremonyOrchestrator::new(
        settings.passkeys.clone(),
        cache,
        Arc::clone(&store),
        Arc::clone(&users),
        lookup,
        engine,
    ));
    let sessions = web::Data::new(SessionManager::new(&settings.session));
    let directory: web::Data<dyn UserDirectory> = web::Data::from(users);

    // Configure CORS for the bookmark frontend
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(settings.clone()))
            .app_data(orchestrator.clone())
            .app_data(sessions.clone())
            .app_data(directory.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg
        // Passkey ceremony endpoints
        .route(
            "/auth/passkey/register/start",
            web::post().to(start_registration),
        )
        .route(
            "/auth/passkey/register/complete",
            web::post().to(finish_registration),
        )
        .route("/auth/passkey/auth/start", web::post().to(start_assertion))
        .route(
            "/auth/passkey/auth/complete",
            web::post().to(finish_assertion),
        )
        .route(
            "/auth/passkey/credentials/revoke",
            web::post().to(revoke_credential),
        )
        // Account provisioning from the bookmark application
        .route("/internal/users", web::post().to(provision_user))
        // Health endpoint
        .route("/ping", web::get().to(health));
}

fn print_startup_info(bind_address: &str, settings: &ShelfmarkSettings) {
    println!("Starting Shelfmark passkey service on http://{bind_address}");
    println!();
    println!("Passkey endpoints:");
    println!("  POST /auth/passkey/register/start - Start passkey registration");
    println!("  POST /auth/passkey/register/complete - Complete passkey registration");
    println!("  POST /auth/passkey/auth/start - Start passkey authentication");
    println!("  POST /auth/passkey/auth/complete - Complete passkey authentication");
    println!("  POST /auth/passkey/credentials/revoke - Revoke a registered credential");
    println!();
    println!("Relying party: {} ({})", settings.passkeys.rp_name, settings.passkeys.rp_id);
    println!("Origin: {}", settings.passkeys.rp_origin);
    if !settings.passkeys.enabled {
        println!();
        println!("⚠️  Passkeys are disabled; ceremony endpoints will return 503");
    }
}
