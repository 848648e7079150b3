//! Passkey ceremony endpoints
//!
//! HTTP surface for the registration and assertion ceremonies. All
//! authentication-class failures collapse into one generic rejection so a
//! caller cannot probe which account names or credential ids exist.

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use serde_json::json;

use crate::passkey::{
    AssertionResponse, CeremonyError, CeremonyOrchestrator, RegistrationResponse, UserDirectory,
    UserIdentity,
};
use crate::session::{SessionManager, SessionService};
use crate::settings::ShelfmarkSettings;

/// Account provisioning request from the bookmark application
#[derive(Deserialize)]
pub struct ProvisionUserRequest {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
}

/// Registration start request
#[derive(Deserialize)]
pub struct StartRegistrationRequest {
    pub user_id: String,
}

/// Registration finish request
#[derive(Deserialize)]
pub struct FinishRegistrationRequest {
    pub user_id: String,
    pub description: Option<String>,
    pub credential: RegistrationResponse,
}

/// Assertion start request; the identifier is caller-chosen and optional
#[derive(Deserialize)]
pub struct StartAssertionRequest {
    pub identifier: Option<String>,
}

/// Assertion finish request
#[derive(Deserialize)]
pub struct FinishAssertionRequest {
    pub identifier: String,
    pub credential: AssertionResponse,
}

/// Credential revocation request
#[derive(Deserialize)]
pub struct RevokeCredentialRequest {
    pub user_id: String,
    pub credential_id: String,
}

fn passkeys_disabled() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(json!({
        "error": "passkeys_disabled",
        "message": "Passkey support is not enabled"
    }))
}

/// Map ceremony errors to HTTP responses
///
/// Authentication failures share one body; the specific cause goes to the
/// log only. Infrastructure failures map to a retryable 5xx.
fn ceremony_error_response(err: &CeremonyError) -> HttpResponse {
    if err.is_authentication_failure() {
        log::warn!("Ceremony rejected: {err}");
        return HttpResponse::Unauthorized().json(json!({
            "error": "authentication_failed",
            "message": "Authentication failed"
        }));
    }
    if err.is_infrastructure() {
        log::error!("Ceremony dependency failure: {err}");
        return HttpResponse::BadGateway().json(json!({
            "error": "dependency_unavailable",
            "message": "A backing service is unavailable; retry later"
        }));
    }
    match err {
        CeremonyError::UnknownUser(user_id) => {
            log::warn!("Registration requested for unknown user {user_id}");
            HttpResponse::BadRequest().json(json!({
                "error": "unknown_user",
                "message": "No such account"
            }))
        }
        CeremonyError::Encoding(_) => HttpResponse::BadRequest().json(json!({
            "error": "invalid_request",
            "message": "Malformed ceremony payload"
        })),
        _ => HttpResponse::InternalServerError().json(json!({
            "error": "internal_error",
            "message": "Unexpected ceremony failure"
        })),
    }
}

/// Provision an account from the bookmark application
///
/// # Errors
/// Returns an error response if the directory rejects the account.
pub async fn provision_user(
    data: web::Json<ProvisionUserRequest>,
    directory: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse> {
    let request = data.into_inner();
    let user = UserIdentity {
        id: request.user_id,
        username: request.username,
        display_name: request.display_name,
        handle: None,
    };
    match directory.upsert(user) {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(err) => Ok(ceremony_error_response(&err)),
    }
}

/// Start passkey registration for an authenticated account
///
/// # Errors
/// Returns an error response if:
/// - Passkeys are not enabled
/// - The account is unknown
/// - The challenge cache is unavailable
pub async fn start_registration(
    data: web::Json<StartRegistrationRequest>,
    settings: web::Data<ShelfmarkSettings>,
    orchestrator: web::Data<CeremonyOrchestrator>,
) -> Result<HttpResponse> {
    if !settings.passkeys.enabled {
        return Ok(passkeys_disabled());
    }

    match orchestrator.start_registration(&data.user_id) {
        Ok(options) => Ok(HttpResponse::Ok().json(json!({
            "creation_options": options
        }))),
        Err(err) => Ok(ceremony_error_response(&err)),
    }
}

/// Complete passkey registration
///
/// Binds the attested credential to the account. No session is issued; the
/// account was already authenticated when the ceremony started.
///
/// # Errors
/// Returns an error response if:
/// - Passkeys are not enabled
/// - No pending ceremony exists for the account
/// - Attestation verification fails
pub async fn finish_registration(
    data: web::Json<FinishRegistrationRequest>,
    settings: web::Data<ShelfmarkSettings>,
    orchestrator: web::Data<CeremonyOrchestrator>,
) -> Result<HttpResponse> {
    if !settings.passkeys.enabled {
        return Ok(passkeys_disabled());
    }

    let request = data.into_inner();
    match orchestrator.finish_registration(&request.user_id, &request.credential, request.description)
    {
        Ok(record) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Registration completed successfully",
            "credential_id": record.credential_id,
            "user_handle": record.user_handle,
        }))),
        Err(err) => Ok(ceremony_error_response(&err)),
    }
}

/// Revoke a registered credential for an authenticated account
///
/// # Errors
/// Returns an error response if:
/// - Passkeys are not enabled
/// - The credential is unknown, already revoked, or owned by another account
pub async fn revoke_credential(
    data: web::Json<RevokeCredentialRequest>,
    settings: web::Data<ShelfmarkSettings>,
    orchestrator: web::Data<CeremonyOrchestrator>,
) -> Result<HttpResponse> {
    if !settings.passkeys.enabled {
        return Ok(passkeys_disabled());
    }

    match orchestrator.revoke_credential(&data.user_id, &data.credential_id) {
        Ok(record) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Credential revoked",
            "credential_id": record.credential_id,
        }))),
        Err(err) => Ok(ceremony_error_response(&err)),
    }
}

/// Start passkey assertion (login)
///
/// Accepts an optional caller-chosen identifier; when omitted an anonymous
/// key is generated for the discoverable flow and echoed back so the client
/// can correlate the finish call.
///
/// # Errors
/// Returns an error response if:
/// - Passkeys are not enabled
/// - The challenge cache is unavailable
pub async fn start_assertion(
    data: web::Json<StartAssertionRequest>,
    settings: web::Data<ShelfmarkSettings>,
    orchestrator: web::Data<CeremonyOrchestrator>,
) -> Result<HttpResponse> {
    if !settings.passkeys.enabled {
        return Ok(passkeys_disabled());
    }

    let identifier = data
        .into_inner()
        .identifier
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    match orchestrator.start_assertion(&identifier) {
        Ok(options) => Ok(HttpResponse::Ok().json(json!({
            "identifier": identifier,
            "assertion_options": options
        }))),
        Err(err) => Ok(ceremony_error_response(&err)),
    }
}

/// Complete passkey assertion and issue a session
///
/// # Errors
/// Returns an error response if:
/// - Passkeys are not enabled
/// - No pending ceremony exists for the identifier
/// - Assertion verification fails
/// - Session issuance fails
pub async fn finish_assertion(
    data: web::Json<FinishAssertionRequest>,
    settings: web::Data<ShelfmarkSettings>,
    orchestrator: web::Data<CeremonyOrchestrator>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    if !settings.passkeys.enabled {
        return Ok(passkeys_disabled());
    }

    let request = data.into_inner();
    let record = match orchestrator.finish_assertion(&request.identifier, &request.credential) {
        Ok(record) => record,
        Err(err) => return Ok(ceremony_error_response(&err)),
    };

    match sessions.login(&record.user_id) {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Authentication successful",
            "user_id": session.user_id,
            "session_token": session.token,
            "expires_at": session.expires_at,
        }))),
        Err(err) => {
            log::error!("Failed to issue session: {err}");
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "session_creation_failed",
                "message": "Failed to create user session"
            })))
        }
    }
}
