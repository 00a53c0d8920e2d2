//! Wallet challenge and login endpoints.
//!
//! The login response is deliberately uniform: every verification failure
//! maps to the same 401 body so the endpoint cannot be used as an oracle for
//! which addresses have pending challenges or registered users. The real
//! reason only reaches observers and logs.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument, warn};

use crate::web3::{IssueError, LoginAttemptOutcome, VerifyError, WalletAddress};

use super::{
    rate_limit::{RateLimitAction, RateLimitDecision},
    session::session_cookie,
    state::AuthState,
    storage::{create_user, find_user_by_address, insert_session},
    types::{SessionResponse, WalletChallengeRequest, WalletChallengeResponse, WalletLoginRequest},
    utils::{decode_signature_hex, extract_client_ip},
};

const GENERIC_LOGIN_FAILURE: &str = "Authentication failed";

#[utoipa::path(
    post,
    path = "/v1/auth/wallet/challenge",
    request_body = WalletChallengeRequest,
    responses(
        (status = 200, description = "Challenge issued", body = WalletChallengeResponse),
        (status = 400, description = "Malformed address", body = String),
        (status = 429, description = "Rate limited", body = String),
        (status = 503, description = "Challenge store unavailable", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn wallet_challenge(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<WalletChallengeRequest>>,
) -> impl IntoResponse {
    let request: WalletChallengeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Challenge)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match auth_state.issuer().issue(&request.address).await {
        Ok(challenge) => {
            let response = WalletChallengeResponse {
                address: challenge.address.checksummed(),
                message: challenge.message,
                expires_at: challenge.expires_at,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(IssueError::InvalidAddress(_)) => {
            (StatusCode::BAD_REQUEST, "Invalid address".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to issue wallet challenge: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Temporarily unavailable".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/wallet/login",
    request_body = WalletLoginRequest,
    responses(
        (status = 200, description = "Login success", body = SessionResponse),
        (status = 400, description = "Malformed request", body = String),
        (status = 401, description = "Authentication failed", body = String),
        (status = 429, description = "Rate limited", body = String),
        (status = 503, description = "Challenge store unavailable", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn wallet_login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<WalletLoginRequest>>,
) -> impl IntoResponse {
    let request: WalletLoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    // Rate-limit before any lookup or signature work.
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Login)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }
    if auth_state
        .rate_limiter()
        .check_address(&request.address, RateLimitAction::Login)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    let signature = match decode_signature_hex(&request.signature) {
        Ok(bytes) => bytes,
        Err(err) => return (StatusCode::BAD_REQUEST, err).into_response(),
    };

    let outcome = match auth_state
        .verifier()
        .verify_and_consume(&request.address, &signature)
        .await
    {
        Ok(outcome) => outcome,
        Err(VerifyError::InvalidAddress(_)) => {
            return (StatusCode::BAD_REQUEST, "Invalid address".to_string()).into_response();
        }
        Err(VerifyError::Storage(err)) => {
            error!("Challenge store unavailable during login: {err}");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Temporarily unavailable".to_string(),
            )
                .into_response();
        }
    };

    handle_outcome(&pool, &auth_state, outcome).await
}

/// Resolve the verified address to a local user, establish the session, and
/// notify observers. Failures never create or modify user records.
async fn handle_outcome(
    pool: &PgPool,
    auth_state: &AuthState,
    outcome: LoginAttemptOutcome,
) -> axum::response::Response {
    let address = match outcome {
        LoginAttemptOutcome::Success { address, .. } => address,
        LoginAttemptOutcome::Failure { .. } => {
            auth_state.notify(&outcome);
            return (StatusCode::UNAUTHORIZED, GENERIC_LOGIN_FAILURE.to_string()).into_response();
        }
    };

    match establish_session(pool, auth_state, address).await {
        Ok(Some((response, cookie))) => {
            auth_state.notify(&LoginAttemptOutcome::Success {
                address,
                user_id: response.user_id.parse().ok(),
            });
            let mut response_headers = HeaderMap::new();
            response_headers.insert(SET_COOKIE, cookie);
            (StatusCode::OK, response_headers, Json(response)).into_response()
        }
        Ok(None) => {
            // Provisioning disabled and no user bound to this address. The
            // signature was valid and the challenge is spent either way, but
            // the caller still only sees the generic failure.
            warn!(address = %address, "verified wallet has no user and auto-provision is off");
            auth_state.notify(&LoginAttemptOutcome::Success {
                address,
                user_id: None,
            });
            (StatusCode::UNAUTHORIZED, GENERIC_LOGIN_FAILURE.to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to establish wallet session: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response()
        }
    }
}

async fn establish_session(
    pool: &PgPool,
    auth_state: &AuthState,
    address: WalletAddress,
) -> anyhow::Result<Option<(SessionResponse, axum::http::HeaderValue)>> {
    let user = match find_user_by_address(pool, &address).await? {
        Some(user) => user,
        None if auth_state.config().auto_provision() => create_user(pool, &address).await?,
        None => return Ok(None),
    };

    let token = insert_session(
        pool,
        user.user_id,
        auth_state.config().session_ttl_seconds(),
    )
    .await?;
    let cookie = session_cookie(auth_state, &token)
        .map_err(|err| anyhow::anyhow!("invalid session cookie value: {err}"))?;

    Ok(Some((
        SessionResponse {
            user_id: user.user_id.to_string(),
            address: address.checksummed(),
        },
        cookie,
    )))
}
