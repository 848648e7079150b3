//! Credential store
//!
//! Durable mapping from credential id to registered credential record. The
//! bookmark application persists these rows in its relational database; the
//! in-memory implementation backs the standalone binary and the test suite.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::errors::CeremonyError;
use super::types::CredentialRecord;

/// Persistence contract for registered credentials
pub trait CredentialStore: Send + Sync {
    /// Persist a newly registered credential
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn save(&self, record: CredentialRecord) -> Result<(), CeremonyError>;

    /// All records matching a credential id
    ///
    /// Credential ids are unique system-wide, so this returns zero or one
    /// record in practice; callers must still tolerate many.
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn find_by_credential_id(
        &self,
        credential_id: &str,
    ) -> Result<Vec<CredentialRecord>, CeremonyError>;

    /// All credentials registered to an account
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn find_by_user_id(&self, user_id: &str) -> Result<Vec<CredentialRecord>, CeremonyError>;

    /// Replace a stored record
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn update(&self, record: CredentialRecord) -> Result<(), CeremonyError>;

    /// Atomically record a successful assertion
    ///
    /// Updates the signature counter and last-used time in one step, keyed by
    /// credential id. This is the serialization point for racing assertions:
    /// the counter check and the write happen under one entry lock, so a
    /// stale counter verified against a since-updated record cannot be
    /// applied. Returns the updated record, or `None` if the credential id is
    /// unknown or the counter does not advance past the stored value.
    ///
    /// # Errors
    /// Returns `CeremonyError::Store` if the backing store is unavailable.
    fn record_usage(
        &self,
        credential_id: &str,
        counter: u32,
        last_used: DateTime<Utc>,
    ) -> Result<Option<CredentialRecord>, CeremonyError>;
}

/// Thread-safe in-memory credential store
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: DashMap<String, CredentialRecord>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn save(&self, record: CredentialRecord) -> Result<(), CeremonyError> {
        self.records.insert(record.credential_id.clone(), record);
        Ok(())
    }

    fn find_by_credential_id(
        &self,
        credential_id: &str,
    ) -> Result<Vec<CredentialRecord>, CeremonyError> {
        Ok(self
            .records
            .get(credential_id)
            .map(|entry| vec![entry.value().clone()])
            .unwrap_or_default())
    }

    fn find_by_user_id(&self, user_id: &str) -> Result<Vec<CredentialRecord>, CeremonyError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn update(&self, record: CredentialRecord) -> Result<(), CeremonyError> {
        self.records.insert(record.credential_id.clone(), record);
        Ok(())
    }

    fn record_usage(
        &self,
        credential_id: &str,
        counter: u32,
        last_used: DateTime<Utc>,
    ) -> Result<Option<CredentialRecord>, CeremonyError> {
        let Some(mut entry) = self.records.get_mut(credential_id) else {
            return Ok(None);
        };
        // Counters only move forward; a stale write from a racing assertion
        // would reopen a replay window for the skipped values
        if counter <= entry.counter {
            return Ok(None);
        }
        entry.counter = counter;
        entry.last_used = Some(last_used);
        Ok(Some(entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(credential_id: &str, user_id: &str, counter: u32) -> CredentialRecord {
        CredentialRecord {
            credential_id: credential_id.to_string(),
            user_id: user_id.to_string(),
            user_handle: "handle".to_string(),
            public_key: vec![1, 2, 3],
            counter,
            description: None,
            created_at: Utc::now(),
            last_used: None,
            revoked: false,
        }
    }

    #[test]
    fn test_save_and_find() {
        let store = InMemoryCredentialStore::new();
        store.save(record("cred-1", "u1", 0)).unwrap();
        store.save(record("cred-2", "u1", 0)).unwrap();
        store.save(record("cred-3", "u2", 0)).unwrap();

        assert_eq!(store.find_by_credential_id("cred-1").unwrap().len(), 1);
        assert!(store.find_by_credential_id("missing").unwrap().is_empty());
        assert_eq!(store.find_by_user_id("u1").unwrap().len(), 2);
    }

    #[test]
    fn test_record_usage_updates_counter_and_last_used() {
        let store = InMemoryCredentialStore::new();
        store.save(record("cred-1", "u1", 4)).unwrap();

        let now = Utc::now();
        let updated = store.record_usage("cred-1", 5, now).unwrap().unwrap();
        assert_eq!(updated.counter, 5);
        assert_eq!(updated.last_used, Some(now));

        let stored = store.find_by_credential_id("cred-1").unwrap();
        assert_eq!(stored[0].counter, 5);
    }

    #[test]
    fn test_record_usage_rejects_non_advancing_counter() {
        let store = InMemoryCredentialStore::new();
        store.save(record("cred-1", "u1", 0)).unwrap();
        store.record_usage("cred-1", 7, Utc::now()).unwrap();

        // A racing assertion that verified against the old counter loses here
        let first_used = store.find_by_credential_id("cred-1").unwrap()[0].last_used;
        assert!(store.record_usage("cred-1", 5, Utc::now()).unwrap().is_none());
        assert!(store.record_usage("cred-1", 7, Utc::now()).unwrap().is_none());

        let stored = store.find_by_credential_id("cred-1").unwrap();
        assert_eq!(stored[0].counter, 7);
        assert_eq!(stored[0].last_used, first_used);
    }

    #[test]
    fn test_record_usage_unknown_credential() {
        let store = InMemoryCredentialStore::new();
        assert!(store
            .record_usage("ghost", 1, Utc::now())
            .unwrap()
            .is_none());
    }
}
