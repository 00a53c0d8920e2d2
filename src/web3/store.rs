//! Challenge persistence.
//!
//! The store is the only mutable shared resource in the protocol. Any keyed
//! backend works as long as `consume` is an atomic compare-and-set on a
//! single record; the Postgres implementation lives with the rest of the
//! database helpers in the API layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::address::WalletAddress;
use super::challenge::WalletChallenge;

/// Store failures surface as transient; they never map to a verification
/// failure reason.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("challenge store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

/// Result of the one-time consume transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeResult {
    /// This caller won the compare-and-set.
    Consumed,
    /// The matching challenge was already consumed.
    AlreadyConsumed,
    /// No challenge with this address and nonce exists anymore.
    Gone,
}

#[async_trait::async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Persist a challenge, overwriting any pending one for the same address.
    async fn put(&self, challenge: &WalletChallenge) -> Result<(), StoreError>;

    async fn get(&self, address: &WalletAddress) -> Result<Option<WalletChallenge>, StoreError>;

    /// Atomically flip `consumed` for the challenge matching `(address, nonce)`.
    ///
    /// Exactly one concurrent caller observes `Consumed`; the nonce guard
    /// keeps a replaced challenge from being consumed through a stale read.
    async fn consume(
        &self,
        address: &WalletAddress,
        nonce: &str,
    ) -> Result<ConsumeResult, StoreError>;

    async fn remove(&self, address: &WalletAddress) -> Result<(), StoreError>;

    /// TTL garbage collection; returns the number of records removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// In-process store backed by a mutex-guarded map.
///
/// Used by the test suite and suitable for single-instance deployments; the
/// lock serializes concurrent consume attempts per process.
#[derive(Debug, Default)]
pub struct MemoryChallengeStore {
    challenges: Mutex<HashMap<WalletAddress, WalletChallenge>>,
}

impl MemoryChallengeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put(&self, challenge: &WalletChallenge) -> Result<(), StoreError> {
        let mut challenges = self.challenges.lock().await;
        challenges.insert(challenge.address, challenge.clone());
        Ok(())
    }

    async fn get(&self, address: &WalletAddress) -> Result<Option<WalletChallenge>, StoreError> {
        let challenges = self.challenges.lock().await;
        Ok(challenges.get(address).cloned())
    }

    async fn consume(
        &self,
        address: &WalletAddress,
        nonce: &str,
    ) -> Result<ConsumeResult, StoreError> {
        let mut challenges = self.challenges.lock().await;
        match challenges.get_mut(address) {
            Some(challenge) if challenge.nonce == nonce => {
                if challenge.consumed {
                    Ok(ConsumeResult::AlreadyConsumed)
                } else {
                    challenge.consumed = true;
                    Ok(ConsumeResult::Consumed)
                }
            }
            _ => Ok(ConsumeResult::Gone),
        }
    }

    async fn remove(&self, address: &WalletAddress) -> Result<(), StoreError> {
        let mut challenges = self.challenges.lock().await;
        challenges.remove(address);
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut challenges = self.challenges.lock().await;
        let before = challenges.len();
        challenges.retain(|_, challenge| !challenge.is_expired(now));
        Ok((before - challenges.len()) as u64)
    }
}
