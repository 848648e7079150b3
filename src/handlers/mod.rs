// HTTP request handlers for the passkey service
pub mod passkey;

use actix_web::{HttpResponse, Result};
use serde::Serialize;

// Re-export the main handler functions
pub use passkey::{
    finish_assertion, finish_registration, provision_user, revoke_credential, start_assertion,
    start_registration,
};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    message: String,
}

/// Health check endpoint
///
/// # Errors
/// Never fails; always returns a 200 response.
pub async fn health() -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: "Shelfmark passkey service is running".to_string(),
    };
    Ok(HttpResponse::Ok().json(response))
}
