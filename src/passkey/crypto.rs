//! Passkey cryptography helpers
//!
//! Random material for ceremonies comes from the system CSPRNG; this is a
//! hard requirement for both challenges and user handles.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::SecureRandom;

/// Byte length of server challenges
const CHALLENGE_LEN: usize = 32;

/// Byte length of user handles
const USER_HANDLE_LEN: usize = 32;

/// Generate a secure random challenge (256 bits, Base64URL)
#[must_use]
pub fn generate_challenge() -> String {
    let mut bytes = [0u8; CHALLENGE_LEN];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .expect("Failed to generate random challenge");
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a user handle
///
/// A fixed-length 32-byte opaque identifier, stable across credentials and
/// never derived from the account id.
#[must_use]
pub fn generate_user_handle() -> String {
    let mut bytes = [0u8; USER_HANDLE_LEN];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .expect("Failed to generate user handle");
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate an opaque bearer token for the session service
#[must_use]
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .expect("Failed to generate session token");
    URL_SAFE_NO_PAD.encode(bytes)
}
