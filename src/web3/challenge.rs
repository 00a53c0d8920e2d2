//! Single-use signing challenges.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use super::address::WalletAddress;

const DEFAULT_TTL_SECONDS: i64 = 5 * 60;
const DEFAULT_SERVICE_NAME: &str = "aliro.dev";
const NONCE_BYTES: usize = 32;

/// Deployment constants for challenge issuance.
///
/// The message template is part of the user-facing contract: wallets display
/// it verbatim, so it stays stable within a deployment.
#[derive(Clone, Debug)]
pub struct ChallengeConfig {
    service_name: String,
    ttl: Duration,
}

impl ChallengeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            ttl: Duration::seconds(DEFAULT_TTL_SECONDS),
        }
    }

    #[must_use]
    pub fn with_service_name(mut self, service_name: String) -> Self {
        self.service_name = service_name;
        self
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl = Duration::seconds(seconds);
        self
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The exact text the wallet signs.
    #[must_use]
    pub fn message_for(&self, nonce: &str) -> String {
        format!(
            "Sign this message to authenticate with {}: {nonce}",
            self.service_name
        )
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A single-use, time-bounded signing challenge.
///
/// At most one unconsumed, unexpired challenge exists per address; issuing a
/// new one overwrites any pending one. Only the store's compare-and-set flips
/// `consumed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletChallenge {
    pub address: WalletAddress,
    pub nonce: String,
    pub message: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl WalletChallenge {
    /// Create a fresh challenge for `address` with a new random nonce.
    ///
    /// # Errors
    /// Returns an error if the system randomness source fails.
    pub fn issue(address: WalletAddress, config: &ChallengeConfig) -> Result<Self> {
        let nonce = generate_nonce()?;
        let message = config.message_for(&nonce);
        let issued_at = Utc::now();
        Ok(Self {
            address,
            nonce,
            message,
            issued_at,
            expires_at: issued_at + config.ttl(),
            consumed: false,
        })
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// 32 random bytes, base64 URL-safe without padding.
///
/// The raw value only ever appears inside the challenge message; nothing is
/// derived from it, so no hashing is needed before storage.
fn generate_nonce() -> Result<String> {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate challenge nonce")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
