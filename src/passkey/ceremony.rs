//! Ceremony orchestrator
//!
//! Drives the registration and assertion ceremonies end-to-end: challenge
//! issuance, challenge-cache lifecycle, verification dispatch and credential
//! persistence. Per key the state machine is
//! `NoCeremony -> Pending -> {Consumed | Expired} -> NoCeremony`; Pending is
//! the only non-terminal state and is consumed exactly once.

use std::sync::Arc;

use chrono::Utc;

use super::challenge_cache::{CeremonyKind, ChallengeCache, ChallengeState};
use super::crypto;
use super::engine::{VerificationEngine, VerificationError};
use super::errors::CeremonyError;
use super::lookup::CredentialLookup;
use super::store::CredentialStore;
use super::types::{
    AssertionOptions, AssertionResponse, AuthenticatorSelectionCriteria, CredentialRecord,
    PublicKeyCredentialParameters, RegistrationOptions, RegistrationResponse, RelyingParty,
    UserEntity,
};
use super::users::UserDirectory;
use crate::settings::PasskeySettings;

/// Orchestrates both passkey ceremonies
pub struct CeremonyOrchestrator {
    settings: PasskeySettings,
    cache: Arc<dyn ChallengeCache>,
    store: Arc<dyn CredentialStore>,
    users: Arc<dyn UserDirectory>,
    lookup: Arc<dyn CredentialLookup>,
    engine: Arc<dyn VerificationEngine>,
}

impl CeremonyOrchestrator {
    #[must_use]
    pub fn new(
        settings: PasskeySettings,
        cache: Arc<dyn ChallengeCache>,
        store: Arc<dyn CredentialStore>,
        users: Arc<dyn UserDirectory>,
        lookup: Arc<dyn CredentialLookup>,
        engine: Arc<dyn VerificationEngine>,
    ) -> Self {
        Self {
            settings,
            cache,
            store,
            users,
            lookup,
            engine,
        }
    }

    /// Start a registration ceremony for an authenticated account
    ///
    /// Generates a fresh challenge, requires a discoverable (resident)
    /// credential, and stores the pending state under the user id. A prior
    /// pending registration for the same account is overwritten.
    ///
    /// # Errors
    /// Returns `CeremonyError::UnknownUser` if the account does not exist and
    /// infrastructure errors if the cache or directory is unavailable.
    pub fn start_registration(
        &self,
        user_id: &str,
    ) -> Result<RegistrationOptions, CeremonyError> {
        let user = self
            .users
            .find(user_id)?
            .ok_or_else(|| CeremonyError::UnknownUser(user_id.to_string()))?;
        let handle = self.users.assign_handle(user_id)?;

        let options = RegistrationOptions {
            challenge: crypto::generate_challenge(),
            rp: RelyingParty {
                id: self.settings.rp_id.clone(),
                name: self.settings.rp_name.clone(),
            },
            user: UserEntity {
                id: handle,
                name: user.username,
                display_name: user.display_name,
            },
            public_key_params: vec![
                PublicKeyCredentialParameters {
                    r#type: "public-key".to_string(),
                    alg: -7, // ES256
                },
                PublicKeyCredentialParameters {
                    r#type: "public-key".to_string(),
                    alg: -257, // RS256
                },
            ],
            timeout: self.settings.timeout_millis(),
            attestation: "none".to_string(),
            authenticator_selection: AuthenticatorSelectionCriteria {
                authenticator_attachment: self.settings.authenticator_attachment.clone(),
                require_resident_key: true,
                user_verification: self.settings.user_verification.clone(),
            },
        };

        self.put_state(CeremonyKind::Registration, user_id, &options)?;
        log::debug!("Registration ceremony started for user {user_id}");
        Ok(options)
    }

    /// Finish a registration ceremony
    ///
    /// Consumes the pending state, verifies the attestation and persists the
    /// new credential. No session is issued here; registration only binds a
    /// credential to an already-authenticated account.
    ///
    /// # Errors
    /// Returns `CeremonyError::CeremonyNotFound` if no unexpired state exists
    /// for the account and `CeremonyError::RegistrationVerification` if the
    /// attestation does not verify.
    pub fn finish_registration(
        &self,
        user_id: &str,
        response: &RegistrationResponse,
        description: Option<String>,
    ) -> Result<CredentialRecord, CeremonyError> {
        let state = self
            .cache
            .take(CeremonyKind::Registration, user_id)?
            .ok_or(CeremonyError::CeremonyNotFound)?;

        let registered = self
            .engine
            .verify_registration(&state, response)
            .map_err(|err| match err {
                VerificationError::Lookup(msg) => CeremonyError::Store(msg),
                other => CeremonyError::RegistrationVerification(other.to_string()),
            })?;

        let record = CredentialRecord {
            credential_id: registered.credential_id,
            user_id: user_id.to_string(),
            user_handle: registered.user_handle,
            public_key: registered.public_key,
            counter: registered.counter,
            description,
            created_at: Utc::now(),
            last_used: None,
            revoked: false,
        };
        self.store.save(record.clone())?;

        log::info!(
            "Registered credential {} for user {user_id}",
            record.credential_id
        );
        Ok(record)
    }

    /// Start an assertion ceremony
    ///
    /// The key is caller-chosen: a username-derived value for the identified
    /// flow or an anonymous token for the discoverable flow. When the key
    /// resolves to registered credentials they form the allow-list; otherwise
    /// the list is empty and any discoverable credential for this RP may
    /// answer. A prior pending assertion for the same key is overwritten.
    ///
    /// # Errors
    /// Returns infrastructure errors if the cache or store is unavailable.
    pub fn start_assertion(&self, identifier: &str) -> Result<AssertionOptions, CeremonyError> {
        let allow_credentials = self.lookup.credential_ids_for_user(identifier)?;

        let options = AssertionOptions {
            challenge: crypto::generate_challenge(),
            timeout: self.settings.timeout_millis(),
            rp_id: self.settings.rp_id.clone(),
            allow_credentials,
            user_verification: self.settings.user_verification.clone(),
        };

        self.put_state(CeremonyKind::Assertion, identifier, &options)?;
        log::debug!("Assertion ceremony started for key {identifier}");
        Ok(options)
    }

    /// Finish an assertion ceremony
    ///
    /// The pending state is consumed before verification, so a challenge is
    /// burned whether or not the assertion verifies. On success the matched
    /// credential's counter and last-used time are updated atomically and the
    /// record is returned for the caller to issue a session.
    ///
    /// # Errors
    /// Returns `CeremonyError::CeremonyNotFound` if no unexpired state exists
    /// for the key, `CeremonyError::AssertionVerification` if the assertion
    /// does not verify, and `CeremonyError::CredentialNotFound` if the
    /// asserted credential is unknown.
    pub fn finish_assertion(
        &self,
        identifier: &str,
        response: &AssertionResponse,
    ) -> Result<CredentialRecord, CeremonyError> {
        // One-time use: consume the state up front, regardless of outcome
        let state = self
            .cache
            .take(CeremonyKind::Assertion, identifier)?
            .ok_or(CeremonyError::CeremonyNotFound)?;

        let verdict = self
            .engine
            .verify_assertion(&state, response, self.lookup.as_ref())
            .map_err(|err| match err {
                VerificationError::UnknownCredential => CeremonyError::CredentialNotFound,
                VerificationError::Lookup(msg) => CeremonyError::Store(msg),
                other => CeremonyError::AssertionVerification(other.to_string()),
            })?;

        let updated = self
            .store
            .record_usage(&verdict.credential_id, verdict.counter, Utc::now())?
            .ok_or(CeremonyError::CredentialNotFound)?;

        log::info!(
            "Assertion verified for credential {} (counter {})",
            updated.credential_id,
            updated.counter
        );
        Ok(updated)
    }

    /// Revoke a registered credential
    ///
    /// Soft-delete: the record is kept but drops out of allow-lists and
    /// assertion lookups immediately. Only the owning account may revoke.
    ///
    /// # Errors
    /// Returns `CeremonyError::CredentialNotFound` if the credential does not
    /// exist, is already revoked, or belongs to another account.
    pub fn revoke_credential(
        &self,
        user_id: &str,
        credential_id: &str,
    ) -> Result<CredentialRecord, CeremonyError> {
        let mut record = self
            .store
            .find_by_credential_id(credential_id)?
            .into_iter()
            .find(|record| record.user_id == user_id && !record.revoked)
            .ok_or(CeremonyError::CredentialNotFound)?;
        record.revoked = true;
        self.store.update(record.clone())?;

        log::info!("Revoked credential {credential_id} for user {user_id}");
        Ok(record)
    }

    fn put_state<T: serde::Serialize>(
        &self,
        kind: CeremonyKind,
        key: &str,
        options: &T,
    ) -> Result<(), CeremonyError> {
        let serialized = serde_json::to_string(options)
            .map_err(|err| CeremonyError::Encoding(err.to_string()))?;
        self.cache
            .put(ChallengeState::new(kind, key.to_string(), serialized))
    }
}
