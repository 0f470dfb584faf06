//! The `isp` authenticator.

use std::collections::BTreeMap;
use std::sync::Arc;

use idsec_auth::{AuthError, Authenticator, AuthenticatorDescriptor, AuthenticatorRegistry};
use idsec_core::{
    AuthMethod, AuthMethodSettings, AuthProfile, DEFAULT_AUTHORIZATION_APPLICATION, Profile,
    Token, TokenType,
};
use secrecy::SecretString;
use tracing::{info, warn};

use crate::{
    CookieJar, IdentitySession, IdentityTransport, InteractiveLoginRequest, RefreshRequest,
    ServiceLoginRequest, decode_unverified,
};

/// Lifetime assumed when an interactive login reports none.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3_600;

/// Template turning a tenant subdomain into an identity URL.
pub const DEFAULT_IDENTITY_URL_TEMPLATE: &str = "https://{subdomain}.id.cyberark.cloud";

/// Environment tag written to token metadata by default.
pub const DEFAULT_DEPLOY_ENV: &str = "prod";

/// Descriptor of [`IdentityAuthenticator`].
pub const IDENTITY_AUTHENTICATOR: AuthenticatorDescriptor = AuthenticatorDescriptor {
    name: "isp",
    human_readable_name: "Identity Security Platform",
    supported_methods: &[
        AuthMethod::Interactive,
        AuthMethod::ServiceAccount,
        AuthMethod::Default,
    ],
    default_method: AuthMethod::Interactive,
};

/// Process-level settings shared by every identity login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Deployment environment tag (`prod`, `gov-prod`, ...).
    pub env: String,
    /// Identity URL template containing `{subdomain}`.
    pub identity_url_template: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            env: DEFAULT_DEPLOY_ENV.to_string(),
            identity_url_template: DEFAULT_IDENTITY_URL_TEMPLATE.to_string(),
        }
    }
}

/// Logs in against the Identity Security Platform.
pub struct IdentityAuthenticator {
    transport: Arc<dyn IdentityTransport>,
    config: IdentityConfig,
}

impl IdentityAuthenticator {
    /// Creates an authenticator over `transport`.
    pub fn new(transport: Arc<dyn IdentityTransport>, config: IdentityConfig) -> Self {
        Self { transport, config }
    }

    /// Returns the process-level settings.
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Resolves the identity URL from an explicit URL or a tenant subdomain.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidSettings`] when neither is set.
    pub fn resolve_identity_url(
        &self,
        identity_url: Option<&str>,
        tenant_subdomain: Option<&str>,
    ) -> Result<String, AuthError> {
        if let Some(url) = identity_url.map(str::trim).filter(|url| !url.is_empty()) {
            return Ok(url.trim_end_matches('/').to_string());
        }
        if let Some(subdomain) = tenant_subdomain.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(self
                .config
                .identity_url_template
                .replace("{subdomain}", subdomain));
        }
        Err(AuthError::InvalidSettings(
            "identity_url or identity_tenant_subdomain must be set".to_string(),
        ))
    }

    fn issue_token(
        &self,
        session: IdentitySession,
        username: &str,
        identity_url: &str,
        method: AuthMethod,
        expires_at_ms: u64,
    ) -> Result<Token, AuthError> {
        let metadata = self.metadata(&session.token, &session.cookies)?;
        Ok(Token {
            token: session.token,
            token_type: TokenType::Jwt,
            username: username.to_string(),
            endpoint: identity_url.to_string(),
            auth_method: method,
            expires_at_ms,
            refresh_token: session.refresh_token,
            metadata,
        })
    }

    fn metadata(
        &self,
        token: &str,
        cookies: &CookieJar,
    ) -> Result<BTreeMap<String, String>, AuthError> {
        let mut metadata = BTreeMap::from([
            ("env".to_string(), self.config.env.clone()),
            (
                "cookies".to_string(),
                cookies.to_base64().map_err(|error| {
                    AuthError::InvalidResponse(format!("cookie snapshot failed: {error}"))
                })?,
            ),
        ]);

        if let Some(claims) = decode_unverified(token) {
            if let Some(tenant_id) = claims.tenant_id {
                metadata.insert("tenant_id".to_string(), tenant_id);
            }
            if let Some(subdomain) = claims.subdomain {
                metadata.insert("subdomain".to_string(), subdomain);
            }
        }
        Ok(metadata)
    }

    fn unsupported(method: AuthMethod) -> AuthError {
        AuthError::UnsupportedMethod {
            authenticator: IDENTITY_AUTHENTICATOR.name.to_string(),
            method,
        }
    }
}

fn expiry_after(now_ms: u64, lifetime_secs: u64) -> u64 {
    now_ms.saturating_add(lifetime_secs.saturating_mul(1_000))
}

impl Authenticator for IdentityAuthenticator {
    fn descriptor(&self) -> AuthenticatorDescriptor {
        IDENTITY_AUTHENTICATOR
    }

    fn perform_authentication(
        &mut self,
        _profile: Option<&Profile>,
        auth_profile: &AuthProfile,
        secret: Option<&SecretString>,
        force: bool,
        now_ms: u64,
    ) -> Result<Token, AuthError> {
        match &auth_profile.settings {
            AuthMethodSettings::Interactive(settings) => {
                let identity_url = self.resolve_identity_url(
                    settings.identity_url.as_deref(),
                    settings.identity_tenant_subdomain.as_deref(),
                )?;
                let session = self.transport.interactive_login(&InteractiveLoginRequest {
                    identity_url: &identity_url,
                    application: DEFAULT_AUTHORIZATION_APPLICATION,
                    username: &auth_profile.username,
                    secret,
                    mfa_method: settings.identity_mfa_method.as_deref(),
                    mfa_interactive: settings.identity_mfa_interactive,
                    force,
                })?;

                let lifetime = session
                    .token_lifetime_secs
                    .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
                info!(
                    authenticator = IDENTITY_AUTHENTICATOR.name,
                    username = %auth_profile.username,
                    lifetime_secs = lifetime,
                    "interactive identity login complete"
                );
                self.issue_token(
                    session,
                    &auth_profile.username,
                    &identity_url,
                    AuthMethod::Interactive,
                    expiry_after(now_ms, lifetime),
                )
            }
            AuthMethodSettings::ServiceAccount(settings) => {
                let secret = secret.ok_or(AuthError::CredentialsRequired {
                    method: AuthMethod::ServiceAccount,
                    missing: "secret",
                })?;
                let identity_url = self.resolve_identity_url(
                    settings.identity_url.as_deref(),
                    settings.identity_tenant_subdomain.as_deref(),
                )?;
                let session = self.transport.service_login(&ServiceLoginRequest {
                    identity_url: &identity_url,
                    application: &settings.identity_authorization_application,
                    username: &auth_profile.username,
                    secret,
                })?;

                let lifetime = session.token_lifetime_secs.ok_or_else(|| {
                    AuthError::InvalidResponse(
                        "service account login reported no token lifetime".to_string(),
                    )
                })?;
                info!(
                    authenticator = IDENTITY_AUTHENTICATOR.name,
                    username = %auth_profile.username,
                    lifetime_secs = lifetime,
                    "service account identity login complete"
                );
                self.issue_token(
                    session,
                    &auth_profile.username,
                    &identity_url,
                    AuthMethod::ServiceAccount,
                    expiry_after(now_ms, lifetime),
                )
            }
            AuthMethodSettings::DirectEndpoint(_)
            | AuthMethodSettings::Default
            | AuthMethodSettings::Other(_) => Err(Self::unsupported(auth_profile.auth_method())),
        }
    }

    fn perform_refresh_authentication(
        &mut self,
        _profile: Option<&Profile>,
        auth_profile: &AuthProfile,
        token: &Token,
        now_ms: u64,
    ) -> Result<Option<Token>, AuthError> {
        match &auth_profile.settings {
            AuthMethodSettings::Interactive(settings) => {
                let Some(refresh_token) = token
                    .refresh_token
                    .as_deref()
                    .filter(|refresh| !refresh.trim().is_empty())
                else {
                    return Ok(None);
                };

                let identity_url = if token.endpoint.trim().is_empty() {
                    self.resolve_identity_url(
                        settings.identity_url.as_deref(),
                        settings.identity_tenant_subdomain.as_deref(),
                    )?
                } else {
                    token.endpoint.clone()
                };

                let cookies = match token.metadata.get("cookies") {
                    Some(snapshot) => CookieJar::from_base64(snapshot).unwrap_or_else(|error| {
                        warn!(%error, "cached cookie snapshot unreadable; refreshing without cookies");
                        CookieJar::new()
                    }),
                    None => CookieJar::new(),
                };

                let mut session = self.transport.refresh(&RefreshRequest {
                    identity_url: &identity_url,
                    application: DEFAULT_AUTHORIZATION_APPLICATION,
                    refresh_token,
                    cookies: &cookies,
                })?;
                if session.refresh_token.is_none() {
                    session.refresh_token = Some(refresh_token.to_string());
                }

                let lifetime = session
                    .token_lifetime_secs
                    .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
                info!(
                    authenticator = IDENTITY_AUTHENTICATOR.name,
                    username = %token.username,
                    "identity token refreshed"
                );
                self.issue_token(
                    session,
                    &token.username,
                    &identity_url,
                    AuthMethod::Interactive,
                    expiry_after(now_ms, lifetime),
                )
                .map(Some)
            }
            AuthMethodSettings::ServiceAccount(_) => Ok(Some(token.clone())),
            AuthMethodSettings::DirectEndpoint(_)
            | AuthMethodSettings::Default
            | AuthMethodSettings::Other(_) => Err(Self::unsupported(auth_profile.auth_method())),
        }
    }
}

/// Registers the `isp` authenticator, sharing `transport` across instances.
///
/// # Errors
/// Returns [`AuthError::DuplicateAuthenticator`] when `isp` is already
/// registered.
pub fn register_identity_authenticator(
    registry: &mut AuthenticatorRegistry,
    transport: Arc<dyn IdentityTransport>,
    config: IdentityConfig,
) -> Result<(), AuthError> {
    registry.register(IDENTITY_AUTHENTICATOR, move || -> Box<dyn Authenticator> {
        Box::new(IdentityAuthenticator::new(
            Arc::clone(&transport),
            config.clone(),
        ))
    })
}
