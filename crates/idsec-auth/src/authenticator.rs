use idsec_core::{AuthMethod, AuthMethodSettings, AuthProfile, Profile, Token};
use secrecy::SecretString;

use crate::AuthError;

/// Static identity of an authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorDescriptor {
    /// Registered name; also the auth-profile key inside a [`Profile`].
    pub name: &'static str,
    /// Name shown to users.
    pub human_readable_name: &'static str,
    /// Methods the authenticator can perform.
    pub supported_methods: &'static [AuthMethod],
    /// Method [`AuthMethod::Default`] resolves to.
    pub default_method: AuthMethod,
}

impl AuthenticatorDescriptor {
    /// Returns `true` when `method` is accepted as input.
    ///
    /// [`AuthMethod::Default`] is always accepted because it is rewritten to
    /// [`Self::default_method`] before use.
    pub fn supports(&self, method: AuthMethod) -> bool {
        method == AuthMethod::Default || self.supported_methods.contains(&method)
    }
}

/// Method-specific login primitives driven by [`crate::AuthSession`].
///
/// Implementations never touch the token cache; caching, expiry checks, and
/// fallback policy belong to the session.
pub trait Authenticator: Send {
    /// Returns the static identity of this authenticator.
    fn descriptor(&self) -> AuthenticatorDescriptor;

    /// Settings used when an auth profile asks for [`AuthMethod::Default`].
    fn default_method_settings(&self) -> AuthMethodSettings {
        self.descriptor().default_method.default_settings()
    }

    /// Performs a full login.
    ///
    /// `auth_profile` never carries [`AuthMethod::Default`]; the session
    /// resolves it first.
    ///
    /// # Errors
    /// Returns [`AuthError`] when the login fails or the method settings are
    /// unusable.
    fn perform_authentication(
        &mut self,
        profile: Option<&Profile>,
        auth_profile: &AuthProfile,
        secret: Option<&SecretString>,
        force: bool,
        now_ms: u64,
    ) -> Result<Token, AuthError>;

    /// Refreshes `token`.
    ///
    /// # Returns
    /// - `Ok(Some(token))` with the refreshed token.
    /// - `Ok(None)` when refresh is declined and a full login is needed.
    ///
    /// # Errors
    /// Returns [`AuthError`] when the refresh call fails.
    fn perform_refresh_authentication(
        &mut self,
        profile: Option<&Profile>,
        auth_profile: &AuthProfile,
        token: &Token,
        now_ms: u64,
    ) -> Result<Option<Token>, AuthError>;
}
