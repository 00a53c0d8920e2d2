//! Request/response types for wallet auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct WalletChallengeRequest {
    pub address: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct WalletChallengeResponse {
    /// Checksummed form of the requested address.
    pub address: String,
    /// The exact text the wallet must sign.
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct WalletLoginRequest {
    pub address: String,
    /// 65-byte `r || s || v` signature, hex-encoded with `0x` prefix.
    pub signature: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use pretty_assertions::assert_eq;

    #[test]
    fn wallet_login_request_round_trips() -> Result<()> {
        let request = WalletLoginRequest {
            address: "0x0000000000000000000000000000000000000001".to_string(),
            signature: "0xdeadbeef".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let address = value
            .get("address")
            .and_then(serde_json::Value::as_str)
            .context("missing address")?;
        assert_eq!(address, "0x0000000000000000000000000000000000000001");
        let decoded: WalletLoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.signature, "0xdeadbeef");
        Ok(())
    }

    #[test]
    fn challenge_response_serializes_expiry() -> Result<()> {
        let response = WalletChallengeResponse {
            address: "0x0000000000000000000000000000000000000001".to_string(),
            message: "Sign this message to authenticate with aliro.dev: nonce".to_string(),
            expires_at: Utc::now(),
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("expires_at").is_some());
        Ok(())
    }
}
