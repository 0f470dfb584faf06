//! Token lifecycle state machine shared by every authenticator.

use std::fmt;
use std::sync::Arc;

use idsec_core::{AuthMethod, AuthProfile, Profile, Token, cache_key_postfix};
use idsec_store::{ProfileStore, TokenCache};
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::{AuthError, Authenticator, AuthenticatorDescriptor};

/// Refresh window applied by [`AuthSession::load_authentication`].
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 60_000;

/// Inputs of one [`AuthSession::authenticate`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticateRequest<'a> {
    /// Profile selecting the auth profile and cache namespace.
    pub profile: Option<&'a Profile>,
    /// Explicit auth profile; wins over the profile's entry.
    pub auth_profile: Option<&'a AuthProfile>,
    /// Secret handed to the authenticator on full login.
    pub secret: Option<&'a SecretString>,
    /// Skip the cache read and log in again.
    pub force: bool,
    /// Refresh the cached token instead of reusing it as is.
    pub refresh_auth: bool,
}

impl<'a> AuthenticateRequest<'a> {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the profile.
    pub fn profile(mut self, profile: &'a Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Sets the explicit auth profile.
    pub fn auth_profile(mut self, auth_profile: &'a AuthProfile) -> Self {
        self.auth_profile = Some(auth_profile);
        self
    }

    /// Sets the login secret.
    pub fn secret(mut self, secret: &'a SecretString) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Sets the force flag.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets the refresh flag.
    pub fn refresh_auth(mut self, refresh_auth: bool) -> Self {
        self.refresh_auth = refresh_auth;
        self
    }
}

/// Snapshot of the session's credential state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No token is held.
    Unauthenticated,
    /// A token is held and has not expired.
    Authenticated(Token),
    /// The held token expired; a new login or refresh is required.
    ReauthRequired,
}

/// One authenticator plus the session state it drives.
///
/// Mutating operations take `&mut self`; a session is used from one thread
/// at a time. Share caches between sessions instead of sessions between
/// threads.
pub struct AuthSession {
    authenticator: Box<dyn Authenticator>,
    descriptor: AuthenticatorDescriptor,
    token: Option<Token>,
    active_profile: Option<Profile>,
    active_auth_profile: Option<AuthProfile>,
    cache_authentication: bool,
    token_cache: Option<Arc<dyn TokenCache>>,
    profile_store: Option<Arc<dyn ProfileStore>>,
    grace_period_ms: u64,
}

impl AuthSession {
    /// Creates a session with caching enabled but no cache attached.
    pub fn new(authenticator: Box<dyn Authenticator>) -> Self {
        let descriptor = authenticator.descriptor();
        Self {
            authenticator,
            descriptor,
            token: None,
            active_profile: None,
            active_auth_profile: None,
            cache_authentication: true,
            token_cache: None,
            profile_store: None,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
        }
    }

    /// Attaches the token cache.
    pub fn with_token_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.token_cache = Some(cache);
        self
    }

    /// Attaches the profile store used to resolve a default profile.
    pub fn with_profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profile_store = Some(store);
        self
    }

    /// Enables or disables token caching.
    pub fn with_cache_authentication(mut self, enabled: bool) -> Self {
        self.cache_authentication = enabled;
        self
    }

    /// Sets the refresh grace window.
    pub fn with_grace_period_ms(mut self, grace_period_ms: u64) -> Self {
        self.grace_period_ms = grace_period_ms;
        self
    }

    /// Returns a valid token, reusing the cache, refreshing, or logging in.
    ///
    /// # Errors
    /// - [`AuthError::MissingInput`] when neither profile nor auth profile is given.
    /// - [`AuthError::AuthProfileNotConfigured`] when the profile lacks an
    ///   entry for this authenticator.
    /// - [`AuthError::UnsupportedMethod`] / [`AuthError::CredentialsRequired`]
    ///   for unusable auth profiles.
    /// - [`AuthError::Cache`] on cache load or save failure.
    /// - Any login error from the authenticator, and refresh errors for
    ///   tokens that had not expired yet.
    pub fn authenticate(
        &mut self,
        request: AuthenticateRequest<'_>,
        now_ms: u64,
    ) -> Result<Token, AuthError> {
        let name = self.descriptor.name;
        let auth_profile = match (request.auth_profile, request.profile) {
            (Some(auth_profile), _) => auth_profile.clone(),
            (None, Some(profile)) => profile.auth_profile(name).cloned().ok_or_else(|| {
                AuthError::AuthProfileNotConfigured {
                    authenticator: name.to_string(),
                    human_readable_name: self.descriptor.human_readable_name.to_string(),
                    profile: profile.profile_name.clone(),
                }
            })?,
            (None, None) => return Err(AuthError::MissingInput),
        };

        let profile = match request.profile {
            Some(profile) => Some(profile.clone()),
            None => self.default_profile_lenient(),
        };

        let method = auth_profile.auth_method();
        if !self.descriptor.supports(method) {
            return Err(AuthError::UnsupportedMethod {
                authenticator: name.to_string(),
                method,
            });
        }
        let auth_profile = self.resolve_default_method(auth_profile);
        let method = auth_profile.auth_method();
        if method.requires_credentials() && auth_profile.username.trim().is_empty() {
            return Err(AuthError::CredentialsRequired {
                method,
                missing: "username",
            });
        }

        let key_postfix = cache_key_postfix(&auth_profile);
        let cache = if self.cache_authentication {
            self.token_cache.clone()
        } else {
            None
        };

        let mut token = None;
        let mut needs_save = false;
        if !request.force
            && let Some(cache) = cache.as_deref()
            && let Some(profile) = profile.as_ref()
            && let Some(loaded) = cache.load_token(profile, &key_postfix)?
        {
            if !loaded.is_expired(now_ms) {
                debug!(authenticator = name, profile = %profile.profile_name, "cached token is valid");
                let (current, refreshed) = if request.refresh_auth {
                    self.refresh_valid_token(profile, &auth_profile, loaded, now_ms)?
                } else {
                    (loaded, false)
                };
                needs_save = refreshed;
                token = Some(current);
            } else if request.refresh_auth && loaded.has_refresh_token() {
                match self.authenticator.perform_refresh_authentication(
                    Some(profile),
                    &auth_profile,
                    &loaded,
                    now_ms,
                ) {
                    Ok(Some(refreshed)) => {
                        info!(authenticator = name, profile = %profile.profile_name, "refreshed expired token");
                        token = Some(refreshed);
                        needs_save = true;
                    }
                    Ok(None) => {
                        info!(authenticator = name, "refresh declined; falling back to login");
                    }
                    Err(error) => {
                        warn!(authenticator = name, %error, "refresh failed; falling back to login");
                    }
                }
            } else {
                debug!(authenticator = name, profile = %profile.profile_name, "cached token expired");
            }
        }

        let token = match token {
            Some(token) => token,
            None => {
                let issued = self.authenticator.perform_authentication(
                    profile.as_ref(),
                    &auth_profile,
                    request.secret,
                    request.force,
                    now_ms,
                )?;
                info!(
                    authenticator = name,
                    method = %method,
                    username = %auth_profile.username,
                    "login succeeded"
                );
                needs_save = true;
                issued
            }
        };

        if needs_save
            && let Some(cache) = cache.as_deref()
            && let Some(profile) = profile.as_ref()
        {
            cache.save_token(profile, &token, &key_postfix)?;
            debug!(authenticator = name, profile = %profile.profile_name, "token cached");
        }

        self.token = Some(token.clone());
        if let Some(profile) = profile {
            self.active_profile = Some(profile);
        }
        self.active_auth_profile = Some(auth_profile);
        Ok(token)
    }

    /// Re-hydrates session state from the cache, optionally refreshing.
    ///
    /// # Returns
    /// - `Ok(Some(token))` when an unexpired token is held afterwards.
    /// - `Ok(None)` when no profile, auth profile, or usable token exists.
    ///
    /// # Errors
    /// Returns [`AuthError::Profile`] when the default profile cannot be
    /// loaded and [`AuthError::Cache`] on cache load or save failure. Refresh
    /// failures are logged and ignored.
    pub fn load_authentication(
        &mut self,
        profile: Option<&Profile>,
        refresh_auth: bool,
        now_ms: u64,
    ) -> Result<Option<Token>, AuthError> {
        let name = self.descriptor.name;
        let profile = match profile.cloned().or_else(|| self.active_profile.clone()) {
            Some(profile) => profile,
            None => match &self.profile_store {
                Some(store) => store.load_default_profile()?,
                None => return Ok(None),
            },
        };

        let Some(auth_profile) = self
            .active_auth_profile
            .clone()
            .or_else(|| profile.auth_profile(name).cloned())
        else {
            debug!(authenticator = name, profile = %profile.profile_name, "no auth profile to load");
            return Ok(None);
        };
        let auth_profile = self.resolve_default_method(auth_profile);
        let key_postfix = cache_key_postfix(&auth_profile);

        if let Some(cache) = self.token_cache.as_deref() {
            self.token = cache.load_token(&profile, &key_postfix)?;
        }

        if refresh_auth && let Some(current) = self.token.clone() {
            if current.within_grace(now_ms, self.grace_period_ms) {
                debug!(authenticator = name, "token did not pass grace expiration; refresh skipped");
            } else {
                match self.authenticator.perform_refresh_authentication(
                    Some(&profile),
                    &auth_profile,
                    &current,
                    now_ms,
                ) {
                    Ok(Some(refreshed)) => {
                        if self.cache_authentication
                            && let Some(cache) = self.token_cache.as_deref()
                        {
                            cache.save_token(&profile, &refreshed, &key_postfix)?;
                        }
                        info!(authenticator = name, profile = %profile.profile_name, "refreshed loaded token");
                        self.token = Some(refreshed);
                    }
                    Ok(None) => debug!(authenticator = name, "refresh declined for loaded token"),
                    Err(error) => warn!(authenticator = name, %error, "refresh of loaded token failed"),
                }
            }
        }

        if self.token.as_ref().is_some_and(|token| token.is_expired(now_ms)) {
            debug!(authenticator = name, "loaded token expired");
            self.token = None;
        }

        self.active_profile = Some(profile);
        self.active_auth_profile = Some(auth_profile);
        Ok(self.token.clone())
    }

    /// Returns `true` when a token is held or cached for `profile`.
    ///
    /// The cache lookup keys on the bare username. Cache failures read as
    /// `false`; expiry is not checked.
    pub fn is_authenticated(&self, profile: &Profile) -> bool {
        if self.token.is_some() {
            return true;
        }
        let Some(cache) = self.token_cache.as_deref() else {
            return false;
        };
        let Some(auth_profile) = profile
            .auth_profile(self.descriptor.name)
            .or(self.active_auth_profile.as_ref())
        else {
            return false;
        };

        match cache.load_token(profile, &auth_profile.username) {
            Ok(token) => token.is_some(),
            Err(error) => {
                warn!(authenticator = self.descriptor.name, %error, "token cache lookup failed");
                false
            }
        }
    }

    /// Classifies the held token at `now_ms`.
    pub fn state(&self, now_ms: u64) -> AuthState {
        match &self.token {
            None => AuthState::Unauthenticated,
            Some(token) if token.is_expired(now_ms) => AuthState::ReauthRequired,
            Some(token) => AuthState::Authenticated(token.clone()),
        }
    }

    /// Token from the last successful call.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Profile from the last successful call.
    pub fn active_profile(&self) -> Option<&Profile> {
        self.active_profile.as_ref()
    }

    /// Auth profile from the last successful call, with defaults resolved.
    pub fn active_auth_profile(&self) -> Option<&AuthProfile> {
        self.active_auth_profile.as_ref()
    }

    /// Descriptor of the wrapped authenticator.
    pub fn authenticator(&self) -> AuthenticatorDescriptor {
        self.descriptor
    }

    /// Refresh grace window in milliseconds.
    pub fn grace_period_ms(&self) -> u64 {
        self.grace_period_ms
    }

    /// Whether tokens are read from and written to the cache.
    pub fn cache_authentication(&self) -> bool {
        self.cache_authentication
    }

    fn default_profile_lenient(&self) -> Option<Profile> {
        let store = self.profile_store.as_deref()?;
        match store.load_default_profile() {
            Ok(profile) => Some(profile),
            Err(error) => {
                warn!(authenticator = self.descriptor.name, %error, "default profile unavailable");
                None
            }
        }
    }

    fn resolve_default_method(&self, mut auth_profile: AuthProfile) -> AuthProfile {
        if auth_profile.auth_method() == AuthMethod::Default {
            auth_profile.settings = self.authenticator.default_method_settings();
            debug!(
                authenticator = self.descriptor.name,
                method = %auth_profile.auth_method(),
                "resolved default auth method"
            );
        }
        auth_profile
    }

    fn refresh_valid_token(
        &mut self,
        profile: &Profile,
        auth_profile: &AuthProfile,
        loaded: Token,
        now_ms: u64,
    ) -> Result<(Token, bool), AuthError> {
        match self.authenticator.perform_refresh_authentication(
            Some(profile),
            auth_profile,
            &loaded,
            now_ms,
        )? {
            Some(refreshed) => {
                info!(
                    authenticator = self.descriptor.name,
                    profile = %profile.profile_name,
                    "refreshed cached token"
                );
                Ok((refreshed, true))
            }
            None => Ok((loaded, false)),
        }
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("authenticator", &self.descriptor.name)
            .field("token", &self.token)
            .field(
                "active_profile",
                &self.active_profile.as_ref().map(|profile| &profile.profile_name),
            )
            .field("cache_authentication", &self.cache_authentication)
            .field("has_token_cache", &self.token_cache.is_some())
            .field("has_profile_store", &self.profile_store.is_some())
            .field("grace_period_ms", &self.grace_period_ms)
            .finish()
    }
}
