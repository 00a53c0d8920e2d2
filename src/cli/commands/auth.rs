use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SERVICE_NAME: &str = "service-name";
pub const ARG_CHALLENGE_TTL_SECONDS: &str = "challenge-ttl-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_NO_AUTO_PROVISION: &str = "no-auto-provision";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL, used for CORS and cookie security")
                .env("ALIRO_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_SERVICE_NAME)
                .long(ARG_SERVICE_NAME)
                .help("Service name embedded in challenge messages")
                .env("ALIRO_SERVICE_NAME")
                .default_value("aliro.dev"),
        )
        .arg(
            Arg::new(ARG_CHALLENGE_TTL_SECONDS)
                .long(ARG_CHALLENGE_TTL_SECONDS)
                .help("Login challenge TTL in seconds")
                .env("ALIRO_CHALLENGE_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("ALIRO_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_NO_AUTO_PROVISION)
                .long(ARG_NO_AUTO_PROVISION)
                .help("Reject logins from addresses without an existing user")
                .env("ALIRO_NO_AUTO_PROVISION")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub service_name: String,
    pub challenge_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub auto_provision: bool,
}

impl Options {
    /// Extract auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .context("missing required argument: --frontend-base-url")?;
        let service_name = matches
            .get_one::<String>(ARG_SERVICE_NAME)
            .cloned()
            .context("missing required argument: --service-name")?;
        let challenge_ttl_seconds = matches
            .get_one::<i64>(ARG_CHALLENGE_TTL_SECONDS)
            .copied()
            .context("missing required argument: --challenge-ttl-seconds")?;
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .context("missing required argument: --session-ttl-seconds")?;
        let auto_provision = !matches.get_flag(ARG_NO_AUTO_PROVISION);

        Ok(Self {
            frontend_base_url,
            service_name,
            challenge_ttl_seconds,
            session_ttl_seconds,
            auto_provision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;
    use pretty_assertions::assert_eq;

    fn command() -> Command {
        with_args(Command::new("test"))
    }

    #[test]
    fn defaults() {
        let matches = temp_env::with_vars(
            [
                ("ALIRO_FRONTEND_BASE_URL", None::<&str>),
                ("ALIRO_SERVICE_NAME", None),
                ("ALIRO_CHALLENGE_TTL_SECONDS", None),
                ("ALIRO_SESSION_TTL_SECONDS", None),
                ("ALIRO_NO_AUTO_PROVISION", None),
            ],
            || command().get_matches_from(vec!["test"]),
        );
        let options = Options::parse(&matches).expect("options");
        assert_eq!(options.frontend_base_url, "http://localhost:5173");
        assert_eq!(options.service_name, "aliro.dev");
        assert_eq!(options.challenge_ttl_seconds, 300);
        assert_eq!(options.session_ttl_seconds, 43_200);
        assert!(options.auto_provision);
    }

    #[test]
    fn env_overrides() {
        let matches = temp_env::with_vars(
            [
                ("ALIRO_FRONTEND_BASE_URL", Some("https://app.aliro.dev")),
                ("ALIRO_SERVICE_NAME", Some("aliro.example")),
                ("ALIRO_CHALLENGE_TTL_SECONDS", Some("60")),
                ("ALIRO_SESSION_TTL_SECONDS", Some("600")),
                ("ALIRO_NO_AUTO_PROVISION", Some("true")),
            ],
            || command().get_matches_from(vec!["test"]),
        );
        let options = Options::parse(&matches).expect("options");
        assert_eq!(options.frontend_base_url, "https://app.aliro.dev");
        assert_eq!(options.service_name, "aliro.example");
        assert_eq!(options.challenge_ttl_seconds, 60);
        assert_eq!(options.session_ttl_seconds, 600);
        assert!(!options.auto_provision);
    }

    #[test]
    fn flag_disables_auto_provision() {
        let matches = temp_env::with_var("ALIRO_NO_AUTO_PROVISION", None::<&str>, || {
            command().get_matches_from(vec!["test", "--no-auto-provision"])
        });
        let options = Options::parse(&matches).expect("options");
        assert!(!options.auto_provision);
    }
}
