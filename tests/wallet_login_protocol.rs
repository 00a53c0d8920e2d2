//! End-to-end tests for the wallet challenge-login protocol.
//!
//! This suite drives the public issuer/verifier API over the in-memory
//! challenge store with real secp256k1 keys:
//! 1. Issue a challenge for an address.
//! 2. Sign the challenge message the way a wallet would (EIP-191).
//! 3. Verify and consume, asserting outcomes and replay behavior.

use aliro::web3::{
    ChallengeConfig, ChallengeIssuer, ChallengeStore, FailureReason, LoginAttemptOutcome,
    MemoryChallengeStore, SignatureVerifier, VerifyError, WalletAddress,
};
use alloy_primitives::{Address, eip191_hash_message};
use k256::ecdsa::SigningKey;
use std::sync::Arc;

/// A wallet with a deterministic key, used in place of MetaMask.
struct TestWallet {
    key: SigningKey,
    address: WalletAddress,
}

impl TestWallet {
    fn new(seed: u8) -> Self {
        let key = SigningKey::from_slice(&[seed; 32]).expect("signing key");
        let address = WalletAddress::from_inner(Address::from_public_key(key.verifying_key()));
        Self { key, address }
    }

    fn sign(&self, message: &str) -> Vec<u8> {
        let digest = eip191_hash_message(message.as_bytes());
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .expect("sign");
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        bytes
    }
}

fn setup() -> (Arc<MemoryChallengeStore>, ChallengeIssuer, SignatureVerifier) {
    let store = Arc::new(MemoryChallengeStore::new());
    let issuer = ChallengeIssuer::new(store.clone(), ChallengeConfig::new());
    let verifier = SignatureVerifier::new(store.clone());
    (store, issuer, verifier)
}

#[tokio::test]
async fn full_login_round_trip() {
    let (_store, issuer, verifier) = setup();
    let wallet = TestWallet::new(7);

    let challenge = issuer
        .issue(&wallet.address.checksummed())
        .await
        .expect("challenge");
    assert!(challenge.message.contains(&challenge.nonce));

    let signature = wallet.sign(&challenge.message);
    let outcome = verifier
        .verify_and_consume(&wallet.address.checksummed(), &signature)
        .await
        .expect("verify");

    assert_eq!(
        outcome,
        LoginAttemptOutcome::Success {
            address: wallet.address,
            user_id: None,
        }
    );
}

#[tokio::test]
async fn lowercase_address_logs_in_like_checksummed() {
    let (_store, issuer, verifier) = setup();
    let wallet = TestWallet::new(9);
    let lowercase = wallet.address.checksummed().to_lowercase();

    let challenge = issuer.issue(&lowercase).await.expect("challenge");
    let signature = wallet.sign(&challenge.message);

    let outcome = verifier
        .verify_and_consume(&lowercase, &signature)
        .await
        .expect("verify");
    assert!(outcome.is_success());
    // The outcome always carries the normalized form.
    assert_eq!(outcome.address(), &wallet.address);
}

#[tokio::test]
async fn replayed_signature_is_rejected() {
    let (_store, issuer, verifier) = setup();
    let wallet = TestWallet::new(11);

    let challenge = issuer
        .issue(&wallet.address.checksummed())
        .await
        .expect("challenge");
    let signature = wallet.sign(&challenge.message);

    let first = verifier
        .verify_and_consume(&wallet.address.checksummed(), &signature)
        .await
        .expect("first verify");
    assert!(first.is_success());

    let second = verifier
        .verify_and_consume(&wallet.address.checksummed(), &signature)
        .await
        .expect("second verify");
    assert_eq!(
        second,
        LoginAttemptOutcome::Failure {
            address: wallet.address,
            reason: FailureReason::ChallengeAlreadyConsumed,
        }
    );
}

#[tokio::test]
async fn reissue_invalidates_old_signature() {
    let (_store, issuer, verifier) = setup();
    let wallet = TestWallet::new(13);

    let old = issuer
        .issue(&wallet.address.checksummed())
        .await
        .expect("old challenge");
    let old_signature = wallet.sign(&old.message);

    // A fresh challenge replaces the pending one.
    let fresh = issuer
        .issue(&wallet.address.checksummed())
        .await
        .expect("fresh challenge");
    assert_ne!(old.nonce, fresh.nonce);

    let outcome = verifier
        .verify_and_consume(&wallet.address.checksummed(), &old_signature)
        .await
        .expect("verify");
    assert_eq!(
        outcome,
        LoginAttemptOutcome::Failure {
            address: wallet.address,
            reason: FailureReason::SignatureMismatch,
        }
    );
}

#[tokio::test]
async fn wrong_wallet_signature_leaves_challenge_pending() {
    let (store, issuer, verifier) = setup();
    let wallet = TestWallet::new(17);
    let imposter = TestWallet::new(18);

    let challenge = issuer
        .issue(&wallet.address.checksummed())
        .await
        .expect("challenge");

    let outcome = verifier
        .verify_and_consume(
            &wallet.address.checksummed(),
            &imposter.sign(&challenge.message),
        )
        .await
        .expect("verify");
    assert_eq!(
        outcome,
        LoginAttemptOutcome::Failure {
            address: wallet.address,
            reason: FailureReason::SignatureMismatch,
        }
    );

    // The real wallet can still log in with the same challenge.
    let outcome = verifier
        .verify_and_consume(&wallet.address.checksummed(), &wallet.sign(&challenge.message))
        .await
        .expect("verify");
    assert!(outcome.is_success());

    let stored = store.get(&wallet.address).await.expect("get");
    assert!(stored.expect("challenge row").consumed);
}

#[tokio::test]
async fn expired_challenge_fails_and_is_removed() {
    let store = Arc::new(MemoryChallengeStore::new());
    let issuer = ChallengeIssuer::new(
        store.clone(),
        ChallengeConfig::new().with_ttl_seconds(-1),
    );
    let verifier = SignatureVerifier::new(store.clone());
    let wallet = TestWallet::new(21);

    let challenge = issuer
        .issue(&wallet.address.checksummed())
        .await
        .expect("challenge");
    let signature = wallet.sign(&challenge.message);

    let outcome = verifier
        .verify_and_consume(&wallet.address.checksummed(), &signature)
        .await
        .expect("verify");
    assert_eq!(
        outcome,
        LoginAttemptOutcome::Failure {
            address: wallet.address,
            reason: FailureReason::ChallengeExpired,
        }
    );

    // Expired rows are purged on access.
    assert!(store.get(&wallet.address).await.expect("get").is_none());
}

#[tokio::test]
async fn login_without_challenge_fails() {
    let (_store, _issuer, verifier) = setup();
    let wallet = TestWallet::new(23);

    let outcome = verifier
        .verify_and_consume(&wallet.address.checksummed(), &wallet.sign("anything"))
        .await
        .expect("verify");
    assert_eq!(
        outcome,
        LoginAttemptOutcome::Failure {
            address: wallet.address,
            reason: FailureReason::NoPendingChallenge,
        }
    );
}

#[tokio::test]
async fn malformed_address_is_an_error_not_an_outcome() {
    let (_store, issuer, verifier) = setup();

    assert!(issuer.issue("0xnot-an-address").await.is_err());
    let result = verifier.verify_and_consume("deadbeef", &[0u8; 65]).await;
    assert!(matches!(result, Err(VerifyError::InvalidAddress(_))));
}

#[tokio::test]
async fn concurrent_logins_consume_exactly_once() {
    let (_store, issuer, verifier) = setup();
    let verifier = Arc::new(verifier);
    let wallet = Arc::new(TestWallet::new(29));

    let challenge = issuer
        .issue(&wallet.address.checksummed())
        .await
        .expect("challenge");
    let signature = Arc::new(wallet.sign(&challenge.message));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let verifier = verifier.clone();
        let wallet = wallet.clone();
        let signature = signature.clone();
        handles.push(tokio::spawn(async move {
            verifier
                .verify_and_consume(&wallet.address.checksummed(), &signature)
                .await
                .expect("verify")
        }));
    }

    let mut successes = 0;
    let mut replays = 0;
    for handle in handles {
        match handle.await.expect("join") {
            LoginAttemptOutcome::Success { .. } => successes += 1,
            LoginAttemptOutcome::Failure {
                reason: FailureReason::ChallengeAlreadyConsumed,
                ..
            } => replays += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(replays, 7);
}
