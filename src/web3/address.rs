//! Wallet address value type.
//!
//! All comparisons happen on the underlying 20 bytes, so two spellings of the
//! same address (lowercase, uppercase, mixed) are always equal. Display and
//! serialization use the EIP-55 checksummed form.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when an address string fails syntactic validation.
///
/// Raised before any storage access so a malformed input never reaches
/// the challenge store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid wallet address: {input}")]
pub struct InvalidAddress {
    pub input: String,
}

/// A validated, checksum-normalized account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WalletAddress(Address);

impl WalletAddress {
    /// Build from raw bytes, mainly for recovered signer addresses.
    #[must_use]
    pub const fn from_inner(address: Address) -> Self {
        Self(address)
    }

    #[must_use]
    pub const fn inner(&self) -> &Address {
        &self.0
    }

    /// Canonical EIP-55 checksummed string.
    #[must_use]
    pub fn checksummed(&self) -> String {
        self.0.to_checksum(None)
    }
}

impl FromStr for WalletAddress {
    type Err = InvalidAddress;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        // Require the conventional `0x` + 40 hex digits shape; `Address::parse`
        // alone would also accept un-prefixed input.
        let hex = trimmed.strip_prefix("0x").ok_or_else(|| InvalidAddress {
            input: input.to_string(),
        })?;
        if hex.len() != 40 || !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(InvalidAddress {
                input: input.to_string(),
            });
        }
        trimmed
            .parse::<Address>()
            .map(Self)
            .map_err(|_| InvalidAddress {
                input: input.to_string(),
            })
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.checksummed())
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.checksummed())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
