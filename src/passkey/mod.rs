//! Passkey authentication core
//!
//! Implements the passwordless credential ceremonies for Shelfmark: the
//! two-step registration and assertion protocols, the short-lived challenge
//! cache that carries state between the round-trips, and the credential
//! lookup contract the verification engine relies on.

mod cbor;
mod ceremony;
mod challenge_cache;
mod crypto;
mod engine;
mod errors;
mod lookup;
mod store;
mod types;
mod users;

pub use ceremony::CeremonyOrchestrator;
pub use challenge_cache::{CeremonyKind, ChallengeCache, ChallengeState, InMemoryChallengeCache};
pub use crypto::{generate_challenge, generate_opaque_token, generate_user_handle};
pub use engine::{
    AssertionVerdict, RegisteredCredential, StructuralVerifier, VerificationEngine,
    VerificationError,
};
pub use errors::CeremonyError;
pub use lookup::{CredentialLookup, StoreCredentialLookup};
pub use store::{CredentialStore, InMemoryCredentialStore};
pub use types::{
    AssertionOptions, AssertionResponse, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorSelectionCriteria, CredentialRecord,
    PublicKeyCredentialDescriptor, PublicKeyCredentialParameters, RegistrationOptions,
    RegistrationResponse, RelyingParty, UserEntity, UserIdentity,
};
pub use users::{InMemoryUserDirectory, UserDirectory};
