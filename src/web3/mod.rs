//! Web3 challenge-login protocol.
//!
//! Proof of address ownership happens in two round trips: the issuer hands
//! out a single-use, time-bounded message embedding a random nonce, and the
//! verifier recovers the signer from the wallet's signature over that exact
//! message, consuming the challenge atomically on a match.
//!
//! The challenge store is the only shared mutable state; issuer and verifier
//! are otherwise pure over their inputs. Anything user-facing (sessions,
//! provisioning, the generic failure response) lives in the API layer.

pub mod address;
pub mod challenge;
pub mod issuer;
pub mod outcome;
pub mod reaper;
pub mod store;
pub mod verifier;

pub use address::{InvalidAddress, WalletAddress};
pub use challenge::{ChallengeConfig, WalletChallenge};
pub use issuer::{ChallengeIssuer, IssueError};
pub use outcome::{FailureReason, LoginAttemptOutcome, LoginObserver, tracing_observer};
pub use store::{ChallengeStore, ConsumeResult, MemoryChallengeStore, StoreError};
pub use verifier::{SignatureVerifier, VerifyError};
