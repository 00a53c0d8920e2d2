//! Wallet auth handlers and supporting modules.
//!
//! Login is a two-step challenge/response flow:
//!
//! 1. `POST /v1/auth/wallet/challenge` issues a single-use message for the
//!    wallet to sign.
//! 2. `POST /v1/auth/wallet/login` verifies the signature, consumes the
//!    challenge, resolves or provisions the local user, and sets the session
//!    cookie.
//!
//! Every verification failure collapses into one generic 401; the detailed
//! reason only reaches the registered login observers and the audit log.

mod rate_limit;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod types;
mod utils;
pub(crate) mod wallet;

pub use rate_limit::{NoopRateLimiter, RateLimiter, SlidingWindowRateLimiter};
pub use state::{AuthConfig, AuthState};
pub use storage::PgChallengeStore;
