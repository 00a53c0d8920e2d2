//! Login attempt outcomes and observers.
//!
//! Outcomes are events, not persisted state. The handler layer fans each one
//! out to a statically registered list of observers; the externally visible
//! HTTP response never carries the failure reason.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::address::WalletAddress;

/// Why a verification attempt failed.
///
/// The distinction only ever reaches internal audit logs; clients get one
/// generic failure regardless of the variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoPendingChallenge,
    ChallengeExpired,
    ChallengeAlreadyConsumed,
    SignatureMismatch,
    MalformedSignature,
}

impl FailureReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoPendingChallenge => "no_pending_challenge",
            Self::ChallengeExpired => "challenge_expired",
            Self::ChallengeAlreadyConsumed => "challenge_already_consumed",
            Self::SignatureMismatch => "signature_mismatch",
            Self::MalformedSignature => "malformed_signature",
        }
    }
}

/// Result of one verify-and-consume call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginAttemptOutcome {
    Success {
        address: WalletAddress,
        /// Filled in by the outcome handler once the local user is resolved.
        user_id: Option<Uuid>,
    },
    Failure {
        address: WalletAddress,
        reason: FailureReason,
    },
}

impl LoginAttemptOutcome {
    #[must_use]
    pub const fn address(&self) -> &WalletAddress {
        match self {
            Self::Success { address, .. } | Self::Failure { address, .. } => address,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Observer function invoked for every login outcome.
pub type LoginObserver = Arc<dyn Fn(&LoginAttemptOutcome) + Send + Sync>;

/// Default observer: structured audit log through `tracing`.
#[must_use]
pub fn tracing_observer() -> LoginObserver {
    Arc::new(|outcome| match outcome {
        LoginAttemptOutcome::Success { address, user_id } => {
            info!(
                address = %address,
                user_id = ?user_id,
                "wallet login succeeded"
            );
        }
        LoginAttemptOutcome::Failure { address, reason } => {
            warn!(
                address = %address,
                reason = reason.as_str(),
                "wallet login failed"
            );
        }
    })
}
