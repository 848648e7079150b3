//! Ceremony error types
//!
//! Defines the error taxonomy for passkey ceremonies. Authentication-class
//! failures are reported to clients as one generic rejection so the response
//! never reveals whether a key, a challenge, or a credential was at fault.

use thiserror::Error;

/// Errors surfaced by the ceremony orchestrator and its collaborators
#[derive(Debug, Error)]
pub enum CeremonyError {
    /// No pending, unexpired challenge state for this key. The client must
    /// restart the ceremony; never retried automatically.
    #[error("no pending ceremony for this key")]
    CeremonyNotFound,

    /// Attestation verification failed during registration
    #[error("registration verification failed: {0}")]
    RegistrationVerification(String),

    /// Assertion verification failed during login
    #[error("assertion verification failed: {0}")]
    AssertionVerification(String),

    /// The asserted credential id matched no known credential
    #[error("credential not found")]
    CredentialNotFound,

    /// Registration was started for an account this service does not know
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Request or stored state could not be (de)serialized
    #[error("malformed ceremony payload: {0}")]
    Encoding(String),

    /// Challenge cache unreachable or failing
    #[error("challenge cache failure: {0}")]
    Cache(String),

    /// Credential store unreachable or failing
    #[error("credential store failure: {0}")]
    Store(String),
}

impl CeremonyError {
    /// True for failures that clients must see as a generic authentication
    /// rejection (prevents account and credential enumeration).
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            CeremonyError::CeremonyNotFound
                | CeremonyError::RegistrationVerification(_)
                | CeremonyError::AssertionVerification(_)
                | CeremonyError::CredentialNotFound
        )
    }

    /// True for dependency failures that map to a retryable 5xx outcome
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, CeremonyError::Cache(_) | CeremonyError::Store(_))
    }
}
