//! Short-lived challenge state cache
//!
//! Holds in-flight ceremony state between the start and finish round-trips.
//! Entries expire after five minutes; loss of an entry is equivalent to
//! expiry and simply forces the client to restart the ceremony.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::errors::CeremonyError;

/// Maximum age for challenge states
const CHALLENGE_TTL_SECS: i64 = 300;

/// Which ceremony a challenge state belongs to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CeremonyKind {
    Registration,
    Assertion,
}

/// In-flight ceremony state
///
/// `options` is the serialized options payload sent to the client, including
/// the server challenge the finish step must be verified against.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChallengeState {
    pub kind: CeremonyKind,
    pub key: String,     // User id for registration, caller-chosen key for assertion
    pub options: String, // Serialized options payload
    pub created_at: DateTime<Utc>,
}

impl ChallengeState {
    #[must_use]
    pub fn new(kind: CeremonyKind, key: String, options: String) -> Self {
        Self {
            kind,
            key,
            options,
            created_at: Utc::now(),
        }
    }
}

/// Challenge cache contract
///
/// `put` overwrites any pending state for the same `(kind, key)` pair, so at
/// most one ceremony is in flight per key. `take` is an atomic read+remove:
/// under concurrent finish calls at most one caller observes the state.
pub trait ChallengeCache: Send + Sync {
    /// Store ceremony state, replacing any pending state for the same key
    ///
    /// # Errors
    /// Returns `CeremonyError::Cache` if the backing store is unavailable.
    fn put(&self, state: ChallengeState) -> Result<(), CeremonyError>;

    /// Atomically retrieve and remove ceremony state
    ///
    /// Returns `None` for absent or expired entries; an expired entry is
    /// indistinguishable from one that never existed.
    ///
    /// # Errors
    /// Returns `CeremonyError::Cache` if the backing store is unavailable.
    fn take(&self, kind: CeremonyKind, key: &str) -> Result<Option<ChallengeState>, CeremonyError>;
}

/// Thread-safe in-memory challenge cache with lazy expiry
pub struct InMemoryChallengeCache {
    entries: DashMap<(CeremonyKind, String), ChallengeState>,
    ttl: Duration,
}

impl InMemoryChallengeCache {
    /// Create a cache with the standard five-minute TTL
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(CHALLENGE_TTL_SECS))
    }

    /// Create a cache with a custom TTL
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }
}

impl Default for InMemoryChallengeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeCache for InMemoryChallengeCache {
    fn put(&self, state: ChallengeState) -> Result<(), CeremonyError> {
        self.entries
            .insert((state.kind, state.key.clone()), state);
        Ok(())
    }

    fn take(&self, kind: CeremonyKind, key: &str) -> Result<Option<ChallengeState>, CeremonyError> {
        let Some((_, state)) = self.entries.remove(&(kind, key.to_string())) else {
            return Ok(None);
        };
        if Utc::now().signed_duration_since(state.created_at) >= self.ttl {
            return Ok(None); // Expired
        }
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(kind: CeremonyKind, key: &str, options: &str) -> ChallengeState {
        ChallengeState::new(kind, key.to_string(), options.to_string())
    }

    #[test]
    fn test_put_take_roundtrip() {
        let cache = InMemoryChallengeCache::new();
        cache
            .put(state(CeremonyKind::Registration, "u1", "opts"))
            .unwrap();

        let taken = cache.take(CeremonyKind::Registration, "u1").unwrap();
        assert_eq!(taken.unwrap().options, "opts");
    }

    #[test]
    fn test_take_is_one_time() {
        let cache = InMemoryChallengeCache::new();
        cache
            .put(state(CeremonyKind::Assertion, "u1", "opts"))
            .unwrap();

        assert!(cache.take(CeremonyKind::Assertion, "u1").unwrap().is_some());
        assert!(cache.take(CeremonyKind::Assertion, "u1").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites_pending_state() {
        let cache = InMemoryChallengeCache::new();
        cache
            .put(state(CeremonyKind::Registration, "u1", "first"))
            .unwrap();
        cache
            .put(state(CeremonyKind::Registration, "u1", "second"))
            .unwrap();

        let taken = cache.take(CeremonyKind::Registration, "u1").unwrap();
        assert_eq!(taken.unwrap().options, "second");
        assert!(cache
            .take(CeremonyKind::Registration, "u1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_kinds_are_isolated() {
        let cache = InMemoryChallengeCache::new();
        cache
            .put(state(CeremonyKind::Registration, "u1", "reg"))
            .unwrap();
        cache
            .put(state(CeremonyKind::Assertion, "u1", "auth"))
            .unwrap();

        assert_eq!(
            cache
                .take(CeremonyKind::Assertion, "u1")
                .unwrap()
                .unwrap()
                .options,
            "auth"
        );
        assert_eq!(
            cache
                .take(CeremonyKind::Registration, "u1")
                .unwrap()
                .unwrap()
                .options,
            "reg"
        );
    }

    #[test]
    fn test_expired_entry_behaves_as_absent() {
        let cache = InMemoryChallengeCache::with_ttl(Duration::zero());
        cache
            .put(state(CeremonyKind::Assertion, "u1", "opts"))
            .unwrap();

        assert!(cache.take(CeremonyKind::Assertion, "u1").unwrap().is_none());
    }
}
