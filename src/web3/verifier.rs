//! Signature verification and challenge consumption.
//!
//! Checks run in a fixed order so a malformed address is rejected before any
//! store lookup, and the signature is only examined once a live challenge is
//! known to exist. The final consume is a compare-and-set in the store, so
//! two concurrent verifications of the same challenge cannot both succeed.

use std::sync::Arc;

use alloy_primitives::{Address, eip191_hash_message};
use k256::ecdsa::{RecoveryId, Signature as RecoverableSignature, VerifyingKey};
use tracing::debug;

use super::address::{InvalidAddress, WalletAddress};
use super::outcome::{FailureReason, LoginAttemptOutcome};
use super::store::{ChallengeStore, ConsumeResult, StoreError};

const SIGNATURE_LENGTH: usize = 65;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Verifies wallet signatures against pending challenges and consumes them.
pub struct SignatureVerifier {
    store: Arc<dyn ChallengeStore>,
}

impl SignatureVerifier {
    #[must_use]
    pub fn new(store: Arc<dyn ChallengeStore>) -> Self {
        Self { store }
    }

    /// Verify a signature over the pending challenge for `address` and, on a
    /// match, consume the challenge exactly once.
    ///
    /// Verification failures are outcomes, not errors; only a malformed
    /// address or an unavailable store produces an `Err`.
    ///
    /// # Errors
    /// `InvalidAddress` for malformed input (checked before any lookup),
    /// `Storage` when the challenge store is unavailable.
    pub async fn verify_and_consume(
        &self,
        address: &str,
        signature: &[u8],
    ) -> Result<LoginAttemptOutcome, VerifyError> {
        let address: WalletAddress = address.parse()?;

        let Some(challenge) = self.store.get(&address).await? else {
            return Ok(failure(address, FailureReason::NoPendingChallenge));
        };

        if challenge.consumed {
            return Ok(failure(address, FailureReason::ChallengeAlreadyConsumed));
        }

        if challenge.is_expired(chrono::Utc::now()) {
            // Cleanup-on-access; the reaper handles anything never looked at.
            self.store.remove(&address).await?;
            return Ok(failure(address, FailureReason::ChallengeExpired));
        }

        let Some(recovered) = recover_signer(&challenge.message, signature) else {
            return Ok(failure(address, FailureReason::MalformedSignature));
        };

        if recovered != address {
            // The challenge stays unconsumed; a correct signature may still
            // arrive before expiry.
            debug!(address = %address, recovered = %recovered, "recovered signer mismatch");
            return Ok(failure(address, FailureReason::SignatureMismatch));
        }

        match self.store.consume(&address, &challenge.nonce).await? {
            ConsumeResult::Consumed => Ok(LoginAttemptOutcome::Success {
                address,
                user_id: None,
            }),
            ConsumeResult::AlreadyConsumed => {
                Ok(failure(address, FailureReason::ChallengeAlreadyConsumed))
            }
            // Replaced or reaped between lookup and consume.
            ConsumeResult::Gone => Ok(failure(address, FailureReason::NoPendingChallenge)),
        }
    }
}

const fn failure(address: WalletAddress, reason: FailureReason) -> LoginAttemptOutcome {
    LoginAttemptOutcome::Failure { address, reason }
}

/// Recover the signer address from an EIP-191 personal-sign signature.
///
/// Accepts the 65-byte `r || s || v` layout with `v` as either 0/1 or the
/// legacy 27/28. Returns `None` for anything that cannot be parsed.
fn recover_signer(message: &str, signature: &[u8]) -> Option<WalletAddress> {
    if signature.len() != SIGNATURE_LENGTH {
        return None;
    }
    let v = signature[SIGNATURE_LENGTH - 1];
    let recovery_byte = if v >= 27 { v.checked_sub(27)? } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte)?;
    let parsed = RecoverableSignature::from_slice(&signature[..SIGNATURE_LENGTH - 1]).ok()?;
    let digest = eip191_hash_message(message.as_bytes());
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &parsed, recovery_id).ok()?;
    Some(WalletAddress::from_inner(Address::from_public_key(&key)))
}
