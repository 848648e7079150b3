//! Credential lookup provider
//!
//! Read-only adapter exposing the lookups a verification engine needs:
//! allow-list construction, handle resolution in both directions, and
//! credential resolution by id. Empty results are not errors.

use std::sync::Arc;

use super::errors::CeremonyError;
use super::store::CredentialStore;
use super::types::{CredentialRecord, PublicKeyCredentialDescriptor};
use super::users::UserDirectory;

/// Capability set required by a verification engine
pub trait CredentialLookup: Send + Sync {
    /// Descriptors for every active credential an account has registered
    ///
    /// Unknown accounts and accounts with no credentials yield an empty list.
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn credential_ids_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PublicKeyCredentialDescriptor>, CeremonyError>;

    /// Handle assigned to an account, if any
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn user_handle_for_user(&self, user_id: &str) -> Result<Option<String>, CeremonyError>;

    /// Account owning a handle, if known
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn user_for_handle(&self, handle: &str) -> Result<Option<String>, CeremonyError>;

    /// Resolve one credential by id, disambiguated by user handle
    ///
    /// Credential ids are unique system-wide, but the provider must handle
    /// zero, one, or many candidates without raising.
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn lookup(
        &self,
        credential_id: &str,
        user_handle: &str,
    ) -> Result<Option<CredentialRecord>, CeremonyError>;

    /// Every active credential matching an id
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn lookup_all(&self, credential_id: &str) -> Result<Vec<CredentialRecord>, CeremonyError>;
}

/// Lookup provider backed by the credential store and user directory
pub struct StoreCredentialLookup {
    store: Arc<dyn CredentialStore>,
    users: Arc<dyn UserDirectory>,
}

impl StoreCredentialLookup {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }
}

impl CredentialLookup for StoreCredentialLookup {
    fn credential_ids_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PublicKeyCredentialDescriptor>, CeremonyError> {
        Ok(self
            .store
            .find_by_user_id(user_id)?
            .iter()
            .filter(|record| !record.revoked)
            .map(CredentialRecord::descriptor)
            .collect())
    }

    fn user_handle_for_user(&self, user_id: &str) -> Result<Option<String>, CeremonyError> {
        self.users.handle_for_user(user_id)
    }

    fn user_for_handle(&self, handle: &str) -> Result<Option<String>, CeremonyError> {
        self.users.user_for_handle(handle)
    }

    fn lookup(
        &self,
        credential_id: &str,
        user_handle: &str,
    ) -> Result<Option<CredentialRecord>, CeremonyError> {
        Ok(self
            .lookup_all(credential_id)?
            .into_iter()
            .find(|record| record.user_handle == user_handle))
    }

    fn lookup_all(&self, credential_id: &str) -> Result<Vec<CredentialRecord>, CeremonyError> {
        Ok(self
            .store
            .find_by_credential_id(credential_id)?
            .into_iter()
            .filter(|record| !record.revoked)
            .collect())
    }
}
