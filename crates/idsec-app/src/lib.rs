#![warn(missing_docs)]
//! # idsec-app
//!
//! ## Purpose
//! Boots the authentication stack for the `idsec` command line tool.
//!
//! ## Responsibilities
//! - Resolve [`AppConfig`] from `IDSEC_*` environment variables.
//! - Install the `tracing` subscriber.
//! - Build the authenticator registry and file-backed sessions.
//! - Render tokens for terminal output without leaking secrets.
//!
//! ## Data flow
//! Environment -> [`AppConfig`] -> [`build_registry`] -> [`build_session`] ->
//! `authenticate` / `load_authentication` -> [`describe_token`] ->
//! [`redact_sensitive`] -> stdout.
//!
//! ## Ownership and lifetimes
//! Configuration is resolved once and borrowed by the builders; sessions own
//! their authenticator and share the file cache through `Arc`.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`].
//!
//! ## Security and privacy notes
//! - The login secret is read from `IDSEC_SECRET` only, never from argv.
//! - Caching can be disabled with `IDSEC_CACHE_AUTHENTICATION=false`.
//! - Output passes through [`redact_sensitive`].

pub mod cli;
mod config;

use std::sync::Arc;
use std::time::Duration;

use idsec_auth::{AuthError, AuthSession, AuthenticatorRegistry};
use idsec_core::{CoreError, Token};
use idsec_identity::{HttpIdentityTransport, IDENTITY_AUTHENTICATOR, register_identity_authenticator};
use idsec_store::{FileProfileStore, FileTokenCache, ProfileError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub use config::{
    AppConfig, ENV_CACHE_AUTHENTICATION, ENV_CACHE_DIR, ENV_DEPLOY_ENV, ENV_GRACE_PERIOD_SECS,
    ENV_HTTP_TIMEOUT_SECS, ENV_IDENTITY_URL_TEMPLATE, ENV_PROFILE, ENV_PROFILES_DIR,
    auth_profile_from_env, auth_profile_from_lookup, cache_authentication_from,
    cache_authentication_from_env,
};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("IDSEC_VERSION");

/// Variable holding the tracing filter directives.
pub const ENV_LOG: &str = "IDSEC_LOG";

/// Variable holding the login secret.
pub const ENV_SECRET: &str = "IDSEC_SECRET";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Installs a stderr `fmt` subscriber filtered by `IDSEC_LOG` (default `info`).
///
/// A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Registers every authenticator this binary ships.
///
/// # Errors
/// Returns [`AppError::Auth`] when the HTTP client cannot be built.
pub fn build_registry(config: &AppConfig) -> Result<AuthenticatorRegistry, AppError> {
    let transport = HttpIdentityTransport::new(Duration::from_secs(config.http_timeout_secs))?;
    let mut registry = AuthenticatorRegistry::new();
    register_identity_authenticator(&mut registry, Arc::new(transport), config.identity_config())?;
    Ok(registry)
}

/// Profile store rooted at the configured directory.
pub fn profile_store(config: &AppConfig) -> FileProfileStore {
    FileProfileStore::new(&config.profiles_dir, &config.default_profile)
}

/// Creates an `isp` session wired to the file cache and profile store.
///
/// # Errors
/// Returns [`AppError::Auth`] when `isp` is not registered.
pub fn build_session(
    registry: &AuthenticatorRegistry,
    config: &AppConfig,
) -> Result<AuthSession, AppError> {
    let session = registry
        .create_session(IDENTITY_AUTHENTICATOR.name)?
        .with_token_cache(Arc::new(FileTokenCache::new(&config.cache_dir)))
        .with_profile_store(Arc::new(profile_store(config)))
        .with_cache_authentication(config.cache_authentication)
        .with_grace_period_ms(config.grace_period_ms());
    Ok(session)
}

/// One-line token summary for terminal output.
///
/// Never includes the token, refresh token, or cookie values.
pub fn describe_token(token: &Token, now_ms: u64) -> String {
    let remaining_secs = token.expires_at_ms.saturating_sub(now_ms) / 1_000;
    let mut line = format!(
        "user={} method={} endpoint={} expires_in={}s",
        token.username, token.auth_method, token.endpoint, remaining_secs
    );
    if let Some(tenant_id) = token.metadata.get("tenant_id") {
        line.push_str(&format!(" tenant_id={tenant_id}"));
    }
    if token.has_refresh_token() {
        line.push_str(" refreshable=yes");
    }
    line
}

const SENSITIVE_KEYS: [&str; 6] = [
    "password",
    "secret",
    "token",
    "authorization",
    "bearer",
    "cookie",
];

const REDACTED: &str = "<redacted>";

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|marker| key.contains(marker))
}

fn is_auth_scheme(word: &str) -> bool {
    word.eq_ignore_ascii_case("bearer") || word.eq_ignore_ascii_case("basic")
}

/// Redacts secret values in log-safe output.
///
/// Values of `key=value` / `key: value` pairs whose key names a secret, and
/// the credential following a `Bearer` or `Basic` scheme, are replaced.
/// Marker words in plain prose are kept, so error causes stay readable.
pub fn redact_sensitive(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut redact_next = false;

    for chunk in input.split_inclusive(char::is_whitespace) {
        let word = chunk.trim_end();
        let trailing = &chunk[word.len()..];
        if word.is_empty() {
            output.push_str(chunk);
            continue;
        }

        if redact_next {
            output.push_str(REDACTED);
            redact_next = is_auth_scheme(word);
        } else if is_auth_scheme(word) {
            output.push_str(word);
            redact_next = true;
        } else if let Some((split, _)) = word
            .match_indices(['=', ':'])
            .find(|(position, _)| is_sensitive_key(&word[..*position]))
        {
            let (key, value) = word.split_at(split + 1);
            output.push_str(key);
            if value.is_empty() {
                redact_next = true;
            } else {
                output.push_str(REDACTED);
                redact_next = is_auth_scheme(value);
            }
        } else {
            output.push_str(word);
        }
        output.push_str(trailing);
    }
    output
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or malformed.
    #[error("config error: {0}")]
    Config(String),
    /// Auth subsystem error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    /// Profile store error.
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),
    /// Core model error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
