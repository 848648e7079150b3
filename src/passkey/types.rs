//! Passkey data types
//!
//! Serializable data structures for the registration and assertion
//! ceremonies, plus the durable credential and identity records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Shelfmark account as seen by the authentication service
///
/// The bookmark application owns account creation; this service only needs
/// enough identity to bind credentials to it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserIdentity {
    pub id: String,           // Opaque account id assigned by the bookmark app
    pub username: String,     // Login name (email-like)
    pub display_name: String, // Human-readable name
    /// Opaque 32-byte handle (Base64URL), assigned at first credential
    /// registration and never changed afterwards. Never derived from the id.
    pub handle: Option<String>,
}

/// A registered public-key credential
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CredentialRecord {
    pub credential_id: String, // Base64URL-encoded credential ID, unique system-wide
    pub user_id: String,       // Owning account id
    pub user_handle: String,   // Owning user handle (Base64URL)
    pub public_key: Vec<u8>,   // COSE-encoded public key
    pub counter: u32,          // Signature counter, monotonically non-decreasing
    pub description: Option<String>, // User-facing label ("Pixel 9", "YubiKey 5")
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub revoked: bool, // Soft-delete flag
}

/// Registration options sent to the client
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegistrationOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub rp: RelyingParty,
    pub user: UserEntity,
    #[serde(rename = "pubKeyCredParams")]
    pub public_key_params: Vec<PublicKeyCredentialParameters>,
    pub timeout: u32, // Milliseconds
    pub attestation: String,
    #[serde(rename = "authenticatorSelection")]
    pub authenticator_selection: AuthenticatorSelectionCriteria,
}

/// Assertion options sent to the client
///
/// `allow_credentials` may be empty: discoverable credentials let the
/// authenticator pick without a server-side hint.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssertionOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub timeout: u32,      // Milliseconds
    #[serde(rename = "rpId")]
    pub rp_id: String,
    #[serde(rename = "allowCredentials")]
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    #[serde(rename = "userVerification")]
    pub user_verification: String, // "required", "preferred", "discouraged"
}

/// Relying party information
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RelyingParty {
    pub id: String,   // Domain name (e.g., "shelfmark.app")
    pub name: String, // Display name
}

/// User entity disclosed inside registration options
///
/// Carries the opaque handle instead of the real account id.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserEntity {
    pub id: String,   // Base64URL-encoded user handle
    pub name: String, // Username (e.g., email)
    #[serde(rename = "displayName")]
    pub display_name: String, // Display name
}

/// Public key credential parameters
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    pub alg: i32, // Algorithm identifier (-7 for ES256, -257 for RS256)
}

/// Authenticator selection criteria
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthenticatorSelectionCriteria {
    #[serde(rename = "authenticatorAttachment")]
    pub authenticator_attachment: Option<String>, // "platform", "cross-platform"
    #[serde(rename = "requireResidentKey")]
    pub require_resident_key: bool,
    #[serde(rename = "userVerification")]
    pub user_verification: String, // "required", "preferred", "discouraged"
}

/// Public key credential descriptor
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    pub id: String, // Base64URL-encoded credential ID
}

/// Registration response from client
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegistrationResponse {
    pub id: String,     // Base64URL-encoded credential ID
    pub raw_id: String, // Base64URL-encoded raw credential ID
    pub response: AuthenticatorAttestationResponse,
    pub client_extension_results: Option<serde_json::Value>,
    pub r#type: String, // Always "public-key"
}

/// Assertion response from client
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssertionResponse {
    pub id: String,     // Base64URL-encoded credential ID
    pub raw_id: String, // Base64URL-encoded raw credential ID
    pub response: AuthenticatorAssertionResponse,
    pub client_extension_results: Option<serde_json::Value>,
    pub r#type: String, // Always "public-key"
}

/// Authenticator attestation response during registration
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthenticatorAttestationResponse {
    pub client_data_json: String,   // Base64URL-encoded client data JSON
    pub attestation_object: String, // Base64URL-encoded attestation object
}

/// Authenticator assertion response during authentication
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthenticatorAssertionResponse {
    pub client_data_json: String,    // Base64URL-encoded client data JSON
    pub authenticator_data: String,  // Base64URL-encoded authenticator data
    pub signature: String,           // Base64URL-encoded signature
    pub user_handle: Option<String>, // Base64URL-encoded user handle
}

impl CredentialRecord {
    /// Descriptor for inclusion in an assertion allow-list
    #[must_use]
    pub fn descriptor(&self) -> PublicKeyCredentialDescriptor {
        PublicKeyCredentialDescriptor {
            r#type: "public-key".to_string(),
            id: self.credential_id.clone(),
        }
    }
}
