//! Auth state and configuration.

use std::sync::Arc;

use crate::web3::{
    ChallengeConfig, ChallengeIssuer, ChallengeStore, LoginObserver, SignatureVerifier,
};

use super::rate_limit::RateLimiter;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    /// When false, a verified signature from an unknown address is rejected
    /// instead of provisioning a new user.
    auto_provision: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            auto_provision: true,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn with_auto_provision(mut self, auto_provision: bool) -> Self {
        self.auto_provision = auto_provision;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) const fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(super) const fn auto_provision(&self) -> bool {
        self.auto_provision
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Shared state for the wallet auth handlers.
///
/// Observers are registered once at construction; there is no runtime
/// handler discovery.
pub struct AuthState {
    config: AuthConfig,
    issuer: ChallengeIssuer,
    verifier: SignatureVerifier,
    rate_limiter: Arc<dyn RateLimiter>,
    observers: Vec<LoginObserver>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        challenge_config: ChallengeConfig,
        store: Arc<dyn ChallengeStore>,
        rate_limiter: Arc<dyn RateLimiter>,
        observers: Vec<LoginObserver>,
    ) -> Self {
        Self {
            config,
            issuer: ChallengeIssuer::new(store.clone(), challenge_config),
            verifier: SignatureVerifier::new(store),
            rate_limiter,
            observers,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn issuer(&self) -> &ChallengeIssuer {
        &self.issuer
    }

    #[must_use]
    pub const fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub(super) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    /// Fan an outcome out to every registered observer.
    pub(super) fn notify(&self, outcome: &crate::web3::LoginAttemptOutcome) {
        for observer in &self.observers {
            observer(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web3::{LoginAttemptOutcome, MemoryChallengeStore};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://aliro.dev".to_string());
        assert_eq!(config.frontend_base_url(), "https://aliro.dev");
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert!(config.auto_provision());
        assert!(config.session_cookie_secure());

        let config = config
            .with_session_ttl_seconds(600)
            .with_auto_provision(false);
        assert_eq!(config.session_ttl_seconds(), 600);
        assert!(!config.auto_provision());
    }

    #[test]
    fn insecure_frontend_disables_secure_cookie() {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        assert!(!config.session_cookie_secure());
    }

    #[tokio::test]
    async fn notify_reaches_all_observers() {
        let seen: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let observers: Vec<LoginObserver> = (0..3)
            .map(|_| {
                let sink = seen.clone();
                let observer: LoginObserver = Arc::new(move |_outcome| {
                    *sink.lock().expect("lock") += 1;
                });
                observer
            })
            .collect();

        let state = AuthState::new(
            AuthConfig::new("http://localhost:5173".to_string()),
            ChallengeConfig::new(),
            Arc::new(MemoryChallengeStore::new()),
            Arc::new(super::super::rate_limit::NoopRateLimiter),
            observers,
        );

        let address = "0x0000000000000000000000000000000000000001"
            .parse()
            .expect("address");
        state.notify(&LoginAttemptOutcome::Success {
            address,
            user_id: None,
        });
        assert_eq!(*seen.lock().expect("lock"), 3);
    }
}
