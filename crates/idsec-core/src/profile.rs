//! Auth profiles, named profiles, and cache-key derivation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{AuthMethod, AuthMethodSettings, CoreError};

/// Credential configuration driving one login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProfile {
    /// Login name. May be empty for methods that do not require credentials.
    #[serde(default)]
    pub username: String,
    /// Method-specific settings; also determines the method.
    pub settings: AuthMethodSettings,
}

impl AuthProfile {
    /// Creates an auth profile.
    pub fn new(username: impl Into<String>, settings: AuthMethodSettings) -> Self {
        Self {
            username: username.into(),
            settings,
        }
    }

    /// Method selected by this profile.
    pub fn auth_method(&self) -> AuthMethod {
        self.settings.method()
    }
}

/// Named bundle of auth profiles keyed by authenticator name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name, also the first half of every cache key.
    pub profile_name: String,
    /// Free-form description.
    #[serde(default)]
    pub profile_description: String,
    /// One auth profile per authenticator name.
    #[serde(default)]
    pub auth_profiles: BTreeMap<String, AuthProfile>,
}

impl Profile {
    /// Creates an empty profile.
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            profile_description: String::new(),
            auth_profiles: BTreeMap::new(),
        }
    }

    /// Adds or replaces the auth profile for `authenticator_name`.
    pub fn with_auth_profile(
        mut self,
        authenticator_name: impl Into<String>,
        auth_profile: AuthProfile,
    ) -> Self {
        self.auth_profiles
            .insert(authenticator_name.into(), auth_profile);
        self
    }

    /// Returns the auth profile configured for `authenticator_name`.
    pub fn auth_profile(&self, authenticator_name: &str) -> Option<&AuthProfile> {
        self.auth_profiles.get(authenticator_name)
    }

    /// Serializes the profile to pretty JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec_pretty(self).map_err(CoreError::Codec)
    }

    /// Deserializes and validates a profile document.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] for invalid JSON and
    /// [`CoreError::InvalidProfile`] when `profile_name` is blank.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        let profile: Profile = serde_json::from_slice(raw).map_err(CoreError::Codec)?;
        if profile.profile_name.trim().is_empty() {
            return Err(CoreError::InvalidProfile(
                "profile_name is empty".to_string(),
            ));
        }
        Ok(profile)
    }
}

/// Derives the token-cache key postfix for an auth profile.
///
/// # Semantics
/// The postfix is the username. Direct-endpoint profiles with a configured
/// endpoint append `_<host>[:<port>]` so one username can hold independent
/// tokens for several endpoints. Scheme and path never take part in the key.
pub fn cache_key_postfix(auth_profile: &AuthProfile) -> String {
    let mut postfix = auth_profile.username.clone();
    if let AuthMethodSettings::DirectEndpoint(settings) = &auth_profile.settings
        && let Some(endpoint) = settings.endpoint.as_deref()
        && !endpoint.trim().is_empty()
    {
        postfix.push('_');
        postfix.push_str(&endpoint_host(endpoint.trim()));
    }
    postfix
}

fn endpoint_host(endpoint: &str) -> String {
    let parsed = Url::parse(endpoint)
        .ok()
        .filter(|url| url.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{endpoint}")).ok());

    match parsed.as_ref().and_then(|url| url.host_str().map(|host| (host, url.port()))) {
        Some((host, Some(port))) => format!("{host}:{port}"),
        Some((host, None)) => host.to_string(),
        None => endpoint.to_string(),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache-key derivation and profile validation.

    use super::*;
    use crate::{DirectEndpointSettings, InteractiveSettings};

    fn direct(endpoint: Option<&str>) -> AuthProfile {
        AuthProfile::new(
            "user",
            AuthMethodSettings::DirectEndpoint(DirectEndpointSettings {
                endpoint: endpoint.map(str::to_string),
                interactive: false,
            }),
        )
    }

    #[test]
    fn direct_endpoint_postfix_keeps_host_and_port_only() {
        assert_eq!(
            cache_key_postfix(&direct(Some("https://test.example.com:8080/path"))),
            "user_test.example.com:8080"
        );
        assert_eq!(
            cache_key_postfix(&direct(Some("https://test.example.com/path?q=1"))),
            "user_test.example.com"
        );
    }

    #[test]
    fn direct_endpoint_without_scheme_still_yields_host() {
        assert_eq!(
            cache_key_postfix(&direct(Some("vault.example.com:9443"))),
            "user_vault.example.com:9443"
        );
    }

    #[test]
    fn direct_endpoint_without_endpoint_uses_username() {
        assert_eq!(cache_key_postfix(&direct(None)), "user");
        assert_eq!(cache_key_postfix(&direct(Some("  "))), "user");
    }

    #[test]
    fn non_direct_postfix_is_username() {
        let profile = AuthProfile::new(
            "user",
            AuthMethodSettings::Interactive(InteractiveSettings {
                identity_url: Some("https://tenant.example.com:8443".to_string()),
                ..InteractiveSettings::default()
            }),
        );
        assert_eq!(cache_key_postfix(&profile), "user");
    }

    #[test]
    fn rejects_profiles_without_name() {
        let raw = br#"{"profile_name":"  ","auth_profiles":{}}"#;
        assert!(matches!(
            Profile::from_json_bytes(raw),
            Err(CoreError::InvalidProfile(_))
        ));
    }
}
