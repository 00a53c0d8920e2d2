//! Public profile endpoint for the authenticated user.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;

use super::auth::session::authenticate_session;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Profile {
    pub user_id: String,
    /// Checksummed wallet address bound to this account.
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Profile for the authenticated user", body = Profile),
        (status = 401, description = "Not authenticated")
    ),
    tag = "me"
)]
pub async fn me(headers: HeaderMap, pool: Extension<PgPool>) -> impl IntoResponse {
    let record = match authenticate_session(&headers, &pool).await {
        Ok(Some(record)) => record,
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(status) => return status.into_response(),
    };

    let profile = Profile {
        user_id: record.user_id.to_string(),
        address: record.address,
        created_at: record.created_at,
    };
    (StatusCode::OK, Json(profile)).into_response()
}
