//! Authentication methods and their settings payloads.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Default OAuth application used by service-account logins.
pub const DEFAULT_AUTHORIZATION_APPLICATION: &str = "__idaptive_cybr_user_oidc";

/// Methods that cannot run without a username.
pub const AUTH_METHODS_REQUIRING_CREDENTIALS: &[AuthMethod] =
    &[AuthMethod::Interactive, AuthMethod::ServiceAccount];

/// Closed set of login strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Interactive personal login, possibly with an MFA challenge.
    Interactive,
    /// Non-interactive service-account login with a client secret.
    ServiceAccount,
    /// Credentials presented directly to a product endpoint.
    DirectEndpoint,
    /// Placeholder resolved to the authenticator's default method.
    Default,
    /// Method owned by a third-party authenticator.
    Other,
}

impl AuthMethod {
    /// Every method, in declaration order.
    pub const ALL: [AuthMethod; 5] = [
        AuthMethod::Interactive,
        AuthMethod::ServiceAccount,
        AuthMethod::DirectEndpoint,
        AuthMethod::Default,
        AuthMethod::Other,
    ];

    /// Stable snake_case name used in profiles and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Interactive => "interactive",
            AuthMethod::ServiceAccount => "service_account",
            AuthMethod::DirectEndpoint => "direct_endpoint",
            AuthMethod::Default => "default",
            AuthMethod::Other => "other",
        }
    }

    /// Human-readable label.
    pub fn description(&self) -> &'static str {
        match self {
            AuthMethod::Interactive => "Identity Personal User",
            AuthMethod::ServiceAccount => "Identity Service User",
            AuthMethod::DirectEndpoint => "Direct Endpoint Access",
            AuthMethod::Default => "Default Authenticator Method",
            AuthMethod::Other => "Other",
        }
    }

    /// Returns `true` when a username is mandatory for this method.
    pub fn requires_credentials(&self) -> bool {
        AUTH_METHODS_REQUIRING_CREDENTIALS.contains(self)
    }

    /// Default settings payload for this method.
    pub fn default_settings(&self) -> AuthMethodSettings {
        match self {
            AuthMethod::Interactive => {
                AuthMethodSettings::Interactive(InteractiveSettings::default())
            }
            AuthMethod::ServiceAccount => {
                AuthMethodSettings::ServiceAccount(ServiceAccountSettings::default())
            }
            AuthMethod::DirectEndpoint => {
                AuthMethodSettings::DirectEndpoint(DirectEndpointSettings::default())
            }
            AuthMethod::Default => AuthMethodSettings::Default,
            AuthMethod::Other => AuthMethodSettings::Other(BTreeMap::new()),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        AuthMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownAuthMethod(raw.to_string()))
    }
}

/// Settings for [`AuthMethod::Interactive`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractiveSettings {
    /// Preferred MFA mechanism (`pf`, `sms`, `email`, `otp`), if any.
    pub identity_mfa_method: Option<String>,
    /// Whether an MFA prompt may block on user interaction.
    pub identity_mfa_interactive: bool,
    /// Explicit identity tenant URL.
    pub identity_url: Option<String>,
    /// Tenant subdomain used to derive the identity URL.
    pub identity_tenant_subdomain: Option<String>,
}

impl Default for InteractiveSettings {
    fn default() -> Self {
        Self {
            identity_mfa_method: None,
            identity_mfa_interactive: true,
            identity_url: None,
            identity_tenant_subdomain: None,
        }
    }
}

/// Settings for [`AuthMethod::ServiceAccount`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceAccountSettings {
    /// OAuth application the service user is authorized for.
    pub identity_authorization_application: String,
    /// Explicit identity tenant URL.
    pub identity_url: Option<String>,
    /// Tenant subdomain used to derive the identity URL.
    pub identity_tenant_subdomain: Option<String>,
}

impl Default for ServiceAccountSettings {
    fn default() -> Self {
        Self {
            identity_authorization_application: DEFAULT_AUTHORIZATION_APPLICATION.to_string(),
            identity_url: None,
            identity_tenant_subdomain: None,
        }
    }
}

/// Settings for [`AuthMethod::DirectEndpoint`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectEndpointSettings {
    /// Product endpoint receiving the credentials.
    pub endpoint: Option<String>,
    /// Whether the endpoint login may prompt the user.
    pub interactive: bool,
}

/// Method-specific settings, tagged by method.
///
/// The method of a profile is derived from the variant, so a settings payload
/// can never disagree with its declared method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "settings", rename_all = "snake_case")]
pub enum AuthMethodSettings {
    /// Interactive personal login.
    Interactive(InteractiveSettings),
    /// Service-account login.
    ServiceAccount(ServiceAccountSettings),
    /// Direct endpoint credentials.
    DirectEndpoint(DirectEndpointSettings),
    /// Resolved by the authenticator at login time.
    Default,
    /// Opaque settings for third-party methods.
    Other(BTreeMap<String, String>),
}

impl AuthMethodSettings {
    /// Method this payload belongs to.
    pub fn method(&self) -> AuthMethod {
        match self {
            AuthMethodSettings::Interactive(_) => AuthMethod::Interactive,
            AuthMethodSettings::ServiceAccount(_) => AuthMethod::ServiceAccount,
            AuthMethodSettings::DirectEndpoint(_) => AuthMethod::DirectEndpoint,
            AuthMethodSettings::Default => AuthMethod::Default,
            AuthMethodSettings::Other(_) => AuthMethod::Other,
        }
    }
}
