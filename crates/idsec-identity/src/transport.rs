use idsec_auth::AuthError;
use secrecy::SecretString;

use crate::CookieJar;

/// Interactive personal login.
#[derive(Debug, Clone, Copy)]
pub struct InteractiveLoginRequest<'a> {
    /// Identity tenant base URL.
    pub identity_url: &'a str,
    /// OAuth application the token endpoint belongs to.
    pub application: &'a str,
    /// Login name.
    pub username: &'a str,
    /// Password, when the caller supplied one.
    pub secret: Option<&'a SecretString>,
    /// Preferred MFA mechanism.
    pub mfa_method: Option<&'a str>,
    /// Whether the transport may block on an MFA prompt.
    pub mfa_interactive: bool,
    /// Caller asked to bypass any session reuse.
    pub force: bool,
}

/// Service-account login with a client secret.
#[derive(Debug, Clone, Copy)]
pub struct ServiceLoginRequest<'a> {
    /// Identity tenant base URL.
    pub identity_url: &'a str,
    /// OAuth application the service user is authorized for.
    pub application: &'a str,
    /// Service user name.
    pub username: &'a str,
    /// Service user secret.
    pub secret: &'a SecretString,
}

/// Refresh-token exchange.
#[derive(Debug, Clone, Copy)]
pub struct RefreshRequest<'a> {
    /// Identity tenant base URL.
    pub identity_url: &'a str,
    /// OAuth application the token endpoint belongs to.
    pub application: &'a str,
    /// Refresh token issued by the previous login.
    pub refresh_token: &'a str,
    /// Cookies captured by the previous login.
    pub cookies: &'a CookieJar,
}

/// Result of a successful identity exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentitySession {
    /// Issued access token.
    pub token: String,
    /// Refresh token, when issued.
    pub refresh_token: Option<String>,
    /// Token lifetime reported by the identity service.
    pub token_lifetime_secs: Option<u64>,
    /// Cookies the identity service set during the exchange.
    pub cookies: CookieJar,
}

impl std::fmt::Debug for IdentitySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySession")
            .field("token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("cookies", &self.cookies)
            .finish()
    }
}

/// Network seam between [`crate::IdentityAuthenticator`] and the identity
/// service.
pub trait IdentityTransport: Send + Sync {
    /// Performs an interactive login, including any MFA exchange.
    ///
    /// # Errors
    /// Returns [`AuthError::Transport`] on network or status failures.
    fn interactive_login(
        &self,
        request: &InteractiveLoginRequest<'_>,
    ) -> Result<IdentitySession, AuthError>;

    /// Performs a service-account login.
    ///
    /// # Errors
    /// Returns [`AuthError::Transport`] on network or status failures.
    fn service_login(&self, request: &ServiceLoginRequest<'_>) -> Result<IdentitySession, AuthError>;

    /// Exchanges a refresh token for a new session.
    ///
    /// # Errors
    /// Returns [`AuthError::Transport`] on network or status failures.
    fn refresh(&self, request: &RefreshRequest<'_>) -> Result<IdentitySession, AuthError>;
}
