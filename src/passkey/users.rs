//! User directory
//!
//! Read-mostly view of Shelfmark accounts plus user-handle assignment. The
//! bookmark application provisions accounts; this service assigns each one an
//! opaque handle the first time it registers a credential.

use dashmap::DashMap;

use super::crypto;
use super::errors::CeremonyError;
use super::types::UserIdentity;

/// Account lookup and handle assignment contract
pub trait UserDirectory: Send + Sync {
    /// Resolve an account by id
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn find(&self, user_id: &str) -> Result<Option<UserIdentity>, CeremonyError>;

    /// Create or refresh an account entry, preserving any assigned handle
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn upsert(&self, user: UserIdentity) -> Result<(), CeremonyError>;

    /// Handle for an account, if one has been assigned
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn handle_for_user(&self, user_id: &str) -> Result<Option<String>, CeremonyError>;

    /// Account owning a handle
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn user_for_handle(&self, handle: &str) -> Result<Option<String>, CeremonyError>;

    /// Get the account's handle, generating one on first use
    ///
    /// Handles are immutable once assigned: repeated calls return the same
    /// value for the lifetime of the account.
    ///
    /// # Errors
    /// Returns `CeremonyError::UnknownUser` if the account does not exist and
    /// `CeremonyError::Store` if the backing store is unavailable.
    fn assign_handle(&self, user_id: &str) -> Result<String, CeremonyError>;
}

/// Thread-safe in-memory user directory
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, UserIdentity>,
    handle_index: DashMap<String, String>, // handle -> user id
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find(&self, user_id: &str) -> Result<Option<UserIdentity>, CeremonyError> {
        Ok(self.users.get(user_id).map(|entry| entry.value().clone()))
    }

    fn upsert(&self, mut user: UserIdentity) -> Result<(), CeremonyError> {
        if let Some(existing) = self.users.get(&user.id) {
            // Handles are immutable once assigned
            if existing.handle.is_some() {
                user.handle.clone_from(&existing.handle);
            }
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    fn handle_for_user(&self, user_id: &str) -> Result<Option<String>, CeremonyError> {
        Ok(self
            .users
            .get(user_id)
            .and_then(|entry| entry.value().handle.clone()))
    }

    fn user_for_handle(&self, handle: &str) -> Result<Option<String>, CeremonyError> {
        Ok(self.handle_index.get(handle).map(|entry| entry.value().clone()))
    }

    fn assign_handle(&self, user_id: &str) -> Result<String, CeremonyError> {
        let Some(mut entry) = self.users.get_mut(user_id) else {
            return Err(CeremonyError::UnknownUser(user_id.to_string()));
        };
        if let Some(handle) = &entry.handle {
            return Ok(handle.clone());
        }
        let handle = crypto::generate_user_handle();
        entry.handle = Some(handle.clone());
        self.handle_index.insert(handle.clone(), user_id.to_string());
        Ok(handle)
    }
}
