use crate::{
    api::{self, handlers::auth::AuthConfig},
    cli::telemetry,
    web3::ChallengeConfig,
};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub service_name: String,
    pub challenge_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub auto_provision: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_auto_provision(args.auto_provision);

    let challenge_config = ChallengeConfig::new()
        .with_service_name(args.service_name)
        .with_ttl_seconds(args.challenge_ttl_seconds);

    let result = api::new(args.port, args.dsn, auth_config, challenge_config).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        service_name = %args.service_name,
        challenge_ttl_seconds = args.challenge_ttl_seconds,
        session_ttl_seconds = args.session_ttl_seconds,
        auto_provision = args.auto_provision,
        "Starting server"
    );
}
