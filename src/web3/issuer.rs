//! Challenge issuance.

use std::sync::Arc;

use tracing::debug;

use super::address::{InvalidAddress, WalletAddress};
use super::challenge::{ChallengeConfig, WalletChallenge};
use super::store::{ChallengeStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("failed to build challenge: {0}")]
    Internal(#[source] anyhow::Error),
}

/// Issues single-use signing challenges and persists them keyed by address.
pub struct ChallengeIssuer {
    store: Arc<dyn ChallengeStore>,
    config: ChallengeConfig,
}

impl ChallengeIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn ChallengeStore>, config: ChallengeConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ChallengeConfig {
        &self.config
    }

    /// Issue a fresh challenge for `address`.
    ///
    /// The address is validated and normalized before any store access, and
    /// the write overwrites any pending challenge so at most one unconsumed
    /// challenge exists per address.
    ///
    /// # Errors
    /// `InvalidAddress` for malformed input, `Storage` when the store is
    /// unavailable.
    pub async fn issue(&self, address: &str) -> Result<WalletChallenge, IssueError> {
        let address: WalletAddress = address.parse()?;
        let challenge =
            WalletChallenge::issue(address, &self.config).map_err(IssueError::Internal)?;
        self.store.put(&challenge).await?;
        debug!(address = %address, expires_at = %challenge.expires_at, "issued wallet challenge");
        Ok(challenge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web3::store::MemoryChallengeStore;
    use pretty_assertions::assert_eq;

    const ADDRESS: &str = "0x0000000000000000000000000000000000000001";

    fn issuer() -> ChallengeIssuer {
        ChallengeIssuer::new(
            Arc::new(MemoryChallengeStore::new()),
            ChallengeConfig::new(),
        )
    }

    #[tokio::test]
    async fn issue_persists_challenge() {
        let issuer = issuer();
        let challenge = issuer.issue(ADDRESS).await.expect("issue");
        let stored = issuer
            .store
            .get(&challenge.address)
            .await
            .expect("get")
            .expect("stored");
        assert_eq!(stored.nonce, challenge.nonce);
        assert_eq!(stored.message, challenge.message);
        assert!(!stored.consumed);
    }

    #[tokio::test]
    async fn issue_rejects_malformed_address_before_storage() {
        let issuer = issuer();
        let result = issuer.issue("0x1234").await;
        assert!(matches!(result, Err(IssueError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn issue_accepts_any_case_for_same_address() {
        let issuer = issuer();
        let lower = issuer.issue(&ADDRESS.to_lowercase()).await.expect("lower");
        let upper = issuer
            .issue(&ADDRESS.to_uppercase().replace("0X", "0x"))
            .await
            .expect("upper");
        assert_eq!(lower.address, upper.address);
    }
}
