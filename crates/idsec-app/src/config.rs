//! Environment-driven process configuration.

use std::path::PathBuf;

use idsec_core::{
    AuthMethod, AuthMethodSettings, AuthProfile, DirectEndpointSettings, InteractiveSettings,
    ServiceAccountSettings,
};
use idsec_identity::{DEFAULT_DEPLOY_ENV, DEFAULT_IDENTITY_URL_TEMPLATE, IdentityConfig};
use idsec_store::DEFAULT_PROFILE_NAME;

use crate::AppError;

/// Profile store directory.
pub const ENV_PROFILES_DIR: &str = "IDSEC_PROFILES_DIR";
/// Token cache directory.
pub const ENV_CACHE_DIR: &str = "IDSEC_CACHE_DIR";
/// Default profile name.
pub const ENV_PROFILE: &str = "IDSEC_PROFILE";
/// Deployment environment tag.
pub const ENV_DEPLOY_ENV: &str = "IDSEC_DEPLOY_ENV";
/// Refresh grace window in seconds.
pub const ENV_GRACE_PERIOD_SECS: &str = "IDSEC_GRACE_PERIOD_SECS";
/// Token caching kill switch.
pub const ENV_CACHE_AUTHENTICATION: &str = "IDSEC_CACHE_AUTHENTICATION";
/// Transport timeout in seconds.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "IDSEC_HTTP_TIMEOUT_SECS";
/// Identity URL template.
pub const ENV_IDENTITY_URL_TEMPLATE: &str = "IDSEC_IDENTITY_URL_TEMPLATE";

const DEFAULT_GRACE_PERIOD_SECS: u64 = 60;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Profile store directory.
    pub profiles_dir: PathBuf,
    /// Token cache directory.
    pub cache_dir: PathBuf,
    /// Profile used when none is named.
    pub default_profile: String,
    /// Environment tag written to token metadata.
    pub deploy_env: String,
    /// Refresh grace window.
    pub grace_period_secs: u64,
    /// Whether tokens are cached between runs.
    pub cache_authentication: bool,
    /// Identity transport timeout.
    pub http_timeout_secs: u64,
    /// Template deriving identity URLs from tenant subdomains.
    pub identity_url_template: String,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    /// See [`Self::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for unparsable numbers, and when a
    /// directory is unset and no home directory is known.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let home = value("HOME").or_else(|| value("USERPROFILE"));
        let dir = |key: &str, leaf: &str| -> Result<PathBuf, AppError> {
            match (value(key), &home) {
                (Some(dir), _) => Ok(PathBuf::from(dir)),
                (None, Some(home)) => Ok(PathBuf::from(home).join(".idsec").join(leaf)),
                (None, None) => Err(AppError::Config(format!(
                    "{key} is unset and no home directory is known"
                ))),
            }
        };

        Ok(Self {
            profiles_dir: dir(ENV_PROFILES_DIR, "profiles")?,
            cache_dir: dir(ENV_CACHE_DIR, "cache")?,
            default_profile: value(ENV_PROFILE)
                .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string()),
            deploy_env: value(ENV_DEPLOY_ENV).unwrap_or_else(|| DEFAULT_DEPLOY_ENV.to_string()),
            grace_period_secs: parse_secs(
                ENV_GRACE_PERIOD_SECS,
                value(ENV_GRACE_PERIOD_SECS),
                DEFAULT_GRACE_PERIOD_SECS,
            )?,
            cache_authentication: cache_authentication_from(
                value(ENV_CACHE_AUTHENTICATION).as_deref(),
            ),
            http_timeout_secs: parse_secs(
                ENV_HTTP_TIMEOUT_SECS,
                value(ENV_HTTP_TIMEOUT_SECS),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?,
            identity_url_template: value(ENV_IDENTITY_URL_TEMPLATE)
                .unwrap_or_else(|| DEFAULT_IDENTITY_URL_TEMPLATE.to_string()),
        })
    }

    /// Grace window in milliseconds.
    pub fn grace_period_ms(&self) -> u64 {
        self.grace_period_secs.saturating_mul(1_000)
    }

    /// Settings handed to the identity authenticator.
    pub fn identity_config(&self) -> IdentityConfig {
        IdentityConfig {
            env: self.deploy_env.clone(),
            identity_url_template: self.identity_url_template.clone(),
        }
    }
}

fn parse_secs(key: &str, raw: Option<String>, default: u64) -> Result<u64, AppError> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|error| AppError::Config(format!("{key}={raw:?}: {error}"))),
        None => Ok(default),
    }
}

/// Interprets the caching kill switch.
///
/// Semantics:
/// - Unset => caching enabled.
/// - `0`, `false`, `off` (case-insensitive) => caching disabled.
/// - Any other value => caching enabled.
pub fn cache_authentication_from(value: Option<&str>) -> bool {
    match value {
        Some(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !(normalized == "0" || normalized == "false" || normalized == "off")
        }
        None => true,
    }
}

/// Reads the caching kill switch from `IDSEC_CACHE_AUTHENTICATION`.
pub fn cache_authentication_from_env() -> bool {
    cache_authentication_from(std::env::var(ENV_CACHE_AUTHENTICATION).ok().as_deref())
}

/// Builds an auth profile for `method` from `IDSEC_*` variables.
///
/// # Errors
/// See [`auth_profile_from_lookup`].
pub fn auth_profile_from_env(method: AuthMethod) -> Result<AuthProfile, AppError> {
    auth_profile_from_lookup(method, |key| std::env::var(key).ok())
}

/// Builds an auth profile for `method` through `lookup`.
///
/// Reads `IDSEC_USERNAME`, `IDSEC_IDENTITY_URL`, `IDSEC_TENANT_SUBDOMAIN`,
/// `IDSEC_MFA_METHOD`, `IDSEC_MFA_INTERACTIVE`, `IDSEC_ENDPOINT`, and
/// `IDSEC_AUTHORIZATION_APPLICATION`.
///
/// # Errors
/// Returns [`AppError::Config`] when `IDSEC_MFA_INTERACTIVE` is not a boolean.
pub fn auth_profile_from_lookup(
    method: AuthMethod,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AuthProfile, AppError> {
    let value = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let settings = match method {
        AuthMethod::Interactive => {
            let mut settings = InteractiveSettings {
                identity_mfa_method: value("IDSEC_MFA_METHOD"),
                identity_url: value("IDSEC_IDENTITY_URL"),
                identity_tenant_subdomain: value("IDSEC_TENANT_SUBDOMAIN"),
                ..InteractiveSettings::default()
            };
            if let Some(raw) = value("IDSEC_MFA_INTERACTIVE") {
                settings.identity_mfa_interactive = parse_bool("IDSEC_MFA_INTERACTIVE", &raw)?;
            }
            AuthMethodSettings::Interactive(settings)
        }
        AuthMethod::ServiceAccount => {
            let mut settings = ServiceAccountSettings {
                identity_url: value("IDSEC_IDENTITY_URL"),
                identity_tenant_subdomain: value("IDSEC_TENANT_SUBDOMAIN"),
                ..ServiceAccountSettings::default()
            };
            if let Some(application) = value("IDSEC_AUTHORIZATION_APPLICATION") {
                settings.identity_authorization_application = application;
            }
            AuthMethodSettings::ServiceAccount(settings)
        }
        AuthMethod::DirectEndpoint => AuthMethodSettings::DirectEndpoint(DirectEndpointSettings {
            endpoint: value("IDSEC_ENDPOINT"),
            interactive: false,
        }),
        AuthMethod::Default | AuthMethod::Other => method.default_settings(),
    };

    Ok(AuthProfile::new(
        value("IDSEC_USERNAME").unwrap_or_default(),
        settings,
    ))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(AppError::Config(format!("{key}={raw:?} is not a boolean"))),
    }
}
