//! Database helpers for users, sessions, and the Postgres challenge store.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::web3::{
    ChallengeStore, ConsumeResult, StoreError, WalletAddress, WalletChallenge,
};

use super::utils::{generate_session_token, hash_session_token, is_unique_violation};

/// Minimal data returned for a valid session cookie.
pub(crate) struct SessionRecord {
    pub(crate) user_id: Uuid,
    pub(crate) address: String,
    pub(crate) created_at: DateTime<Utc>,
}

/// Local user bound to a wallet address.
pub(super) struct UserRecord {
    pub(super) user_id: Uuid,
}

/// Look up the user provisioned for a verified address.
pub(super) async fn find_user_by_address(
    pool: &PgPool,
    address: &WalletAddress,
) -> Result<Option<UserRecord>> {
    let query = "SELECT id FROM users WHERE wallet_address = $1 AND status = 'active'";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(address.checksummed())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by address")?;
    Ok(row.map(|row| UserRecord {
        user_id: row.get("id"),
    }))
}

/// Provision a new user for a verified address (registration-via-wallet).
///
/// A concurrent provision for the same address loses the unique-constraint
/// race and falls back to the existing row.
pub(super) async fn create_user(pool: &PgPool, address: &WalletAddress) -> Result<UserRecord> {
    let query = r"
        INSERT INTO users (wallet_address)
        VALUES ($1)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(address.checksummed())
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(UserRecord {
            user_id: row.get("id"),
        }),
        Err(err) if is_unique_violation(&err) => find_user_by_address(pool, address)
            .await?
            .ok_or_else(|| anyhow!("user vanished after unique violation")),
        Err(err) => Err(err).context("failed to create user"),
    }
}

pub(super) async fn insert_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    // Generate a random token, store only its hash, and return the raw value
    // so the caller can set the session cookie.
    let query = r"
        INSERT INTO user_sessions (user_id, session_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

pub(crate) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>> {
    // Only accept active users and unexpired sessions.
    let query = r"
        SELECT users.id, users.wallet_address, users.created_at
        FROM user_sessions
        JOIN users ON users.id = user_sessions.user_id
        WHERE user_sessions.session_hash = $1
          AND user_sessions.expires_at > NOW()
          AND users.status = 'active'
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    let Some(row) = row else {
        return Ok(None);
    };

    // Record activity for audit without extending the session TTL.
    let query = r"
        UPDATE user_sessions
        SET last_seen_at = NOW()
        WHERE session_hash = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update session last_seen_at")?;

    Ok(Some(SessionRecord {
        user_id: row.get("id"),
        address: row.get("wallet_address"),
        created_at: row.get("created_at"),
    }))
}

pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM user_sessions WHERE session_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

/// Challenge store backed by the `wallet_challenges` table.
///
/// Consume relies on a conditional `UPDATE ... RETURNING`, so the
/// unconsumed-to-consumed transition is decided by a single row write even
/// across service instances.
pub struct PgChallengeStore {
    pool: PgPool,
}

impl PgChallengeStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(err: sqlx::Error, what: &'static str) -> StoreError {
    StoreError::Unavailable(anyhow::Error::new(err).context(what))
}

#[async_trait::async_trait]
impl ChallengeStore for PgChallengeStore {
    async fn put(&self, challenge: &WalletChallenge) -> Result<(), StoreError> {
        // The upsert enforces at most one pending challenge per address.
        let query = r"
            INSERT INTO wallet_challenges
                (address, nonce, message, issued_at, expires_at, consumed)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            ON CONFLICT (address) DO UPDATE
            SET nonce = EXCLUDED.nonce,
                message = EXCLUDED.message,
                issued_at = EXCLUDED.issued_at,
                expires_at = EXCLUDED.expires_at,
                consumed = FALSE
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(challenge.address.checksummed())
            .bind(&challenge.nonce)
            .bind(&challenge.message)
            .bind(challenge.issued_at)
            .bind(challenge.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_err(err, "failed to upsert wallet challenge"))?;
        Ok(())
    }

    async fn get(&self, address: &WalletAddress) -> Result<Option<WalletChallenge>, StoreError> {
        let query = r"
            SELECT address, nonce, message, issued_at, expires_at, consumed
            FROM wallet_challenges
            WHERE address = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(address.checksummed())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_err(err, "failed to fetch wallet challenge"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let stored: String = row.get("address");
        let address: WalletAddress = stored.parse().map_err(|err| {
            StoreError::Unavailable(
                anyhow::Error::new(err).context("stored wallet address is malformed"),
            )
        })?;
        Ok(Some(WalletChallenge {
            address,
            nonce: row.get("nonce"),
            message: row.get("message"),
            issued_at: row.get("issued_at"),
            expires_at: row.get("expires_at"),
            consumed: row.get("consumed"),
        }))
    }

    async fn consume(
        &self,
        address: &WalletAddress,
        nonce: &str,
    ) -> Result<ConsumeResult, StoreError> {
        // Compare-and-set: only one caller flips consumed for this nonce.
        let query = r"
            UPDATE wallet_challenges
            SET consumed = TRUE
            WHERE address = $1
              AND nonce = $2
              AND consumed = FALSE
            RETURNING address
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(address.checksummed())
            .bind(nonce)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_err(err, "failed to consume wallet challenge"))?;

        if row.is_some() {
            return Ok(ConsumeResult::Consumed);
        }

        // Lost the race or the challenge was replaced; disambiguate for the
        // verifier's outcome mapping.
        let query = "SELECT consumed FROM wallet_challenges WHERE address = $1 AND nonce = $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(address.checksummed())
            .bind(nonce)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_err(err, "failed to re-check wallet challenge"))?;

        match row {
            Some(_) => Ok(ConsumeResult::AlreadyConsumed),
            None => Ok(ConsumeResult::Gone),
        }
    }

    async fn remove(&self, address: &WalletAddress) -> Result<(), StoreError> {
        let query = "DELETE FROM wallet_challenges WHERE address = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(address.checksummed())
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_err(err, "failed to delete wallet challenge"))?;
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let query = "DELETE FROM wallet_challenges WHERE expires_at < $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_err(err, "failed to delete expired wallet challenges"))?;
        Ok(result.rows_affected())
    }
}
