//! `idsec` command line surface.

use clap::{Parser, Subcommand};
use idsec_auth::{AuthenticateRequest, current_time_ms};
use idsec_core::{AuthMethod, Profile};
use idsec_identity::IDENTITY_AUTHENTICATOR;
use idsec_store::{ProfileError, ProfileStore};
use secrecy::SecretString;
use tracing::info;

use crate::{
    AppConfig, AppError, ENV_SECRET, auth_profile_from_env, build_registry, build_session,
    describe_token, profile_store, redact_sensitive,
};

/// Identity Security Platform authentication tool.
#[derive(Parser, Debug)]
#[command(name = "idsec", version = crate::APP_VERSION, about = "Identity Security Platform login")]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Log in and cache the token
    Login {
        /// Profile name (defaults to IDSEC_PROFILE or `idsec`)
        #[arg(long)]
        profile: Option<String>,
        /// Auth method; builds the auth profile from IDSEC_* variables
        #[arg(long, value_parser = parse_method)]
        method: Option<AuthMethod>,
        /// Ignore any cached token
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Refresh the cached token
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
    /// Show the cached session
    Status {
        /// Profile name (defaults to IDSEC_PROFILE or `idsec`)
        #[arg(long)]
        profile: Option<String>,
        /// Refresh when inside the grace window
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
    /// Print the version
    Version,
}

fn parse_method(raw: &str) -> Result<AuthMethod, String> {
    raw.parse::<AuthMethod>().map_err(|error| error.to_string())
}

/// Runs `command` and returns the lines to print.
///
/// # Errors
/// Returns [`AppError`] for configuration, profile, or authentication
/// failures.
pub fn run(command: Command) -> Result<Vec<String>, AppError> {
    match command {
        Command::Version => Ok(vec![format!("idsec {}", crate::app_version())]),
        Command::Login {
            profile,
            method,
            force,
            refresh,
        } => {
            let config = AppConfig::from_env()?;
            let profile = login_profile(&config, profile.as_deref(), method)?;
            let secret = std::env::var(ENV_SECRET).ok().map(SecretString::new);

            let registry = build_registry(&config)?;
            let mut session = build_session(&registry, &config)?;
            let now_ms = current_time_ms();
            let mut request = AuthenticateRequest::new()
                .profile(&profile)
                .force(force)
                .refresh_auth(refresh);
            if let Some(secret) = secret.as_ref() {
                request = request.secret(secret);
            }
            let token = session.authenticate(request, now_ms)?;
            info!(profile = %profile.profile_name, "login complete");

            Ok(vec![redact_sensitive(&describe_token(&token, now_ms))])
        }
        Command::Status { profile, refresh } => {
            let config = AppConfig::from_env()?;
            let store = profile_store(&config);
            let profile = match profile {
                Some(name) => store.load_profile(&name)?,
                None => store.load_default_profile()?,
            };

            let registry = build_registry(&config)?;
            let mut session = build_session(&registry, &config)?;
            let now_ms = current_time_ms();
            match session.load_authentication(Some(&profile), refresh, now_ms)? {
                Some(token) => Ok(vec![redact_sensitive(&describe_token(&token, now_ms))]),
                None => Ok(vec![format!(
                    "profile {} is not authenticated",
                    profile.profile_name
                )]),
            }
        }
    }
}

/// Resolves the login profile.
///
/// With `method`, the auth profile comes from `IDSEC_*` variables and the
/// resulting profile is saved so later runs find it. Without, the profile must
/// already exist in the store.
fn login_profile(
    config: &AppConfig,
    name: Option<&str>,
    method: Option<AuthMethod>,
) -> Result<Profile, AppError> {
    let store = profile_store(config);
    let name = name.unwrap_or(&config.default_profile);
    let Some(method) = method else {
        return Ok(store.load_profile(name)?);
    };

    let base = match store.load_profile(name) {
        Ok(profile) => profile,
        Err(ProfileError::NotFound(_)) => Profile::new(name),
        Err(error) => return Err(error.into()),
    };
    let profile = base.with_auth_profile(IDENTITY_AUTHENTICATOR.name, auth_profile_from_env(method)?);
    store.save_profile(&profile)?;
    Ok(profile)
}
