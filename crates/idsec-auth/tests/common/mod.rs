//! Shared fakes for auth integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use idsec_auth::{AuthError, AuthSession, Authenticator, AuthenticatorDescriptor};
use idsec_core::{
    AuthMethod, AuthMethodSettings, AuthProfile, InteractiveSettings, Profile, Token, TokenType,
};
use idsec_store::{CacheError, MemoryTokenCache, ProfileError, ProfileStore, TokenCache};
use secrecy::SecretString;

/// Fixed clock used across scenarios.
#[allow(dead_code)]
pub const NOW_MS: u64 = 1_700_000_000_000;

/// Lifetime of tokens minted by [`ScriptedAuthenticator`].
#[allow(dead_code)]
pub const LIFETIME_MS: u64 = 3_600_000;

/// Descriptor of the scripted authenticator.
#[allow(dead_code)]
pub const SCRIPTED: AuthenticatorDescriptor = AuthenticatorDescriptor {
    name: "scripted",
    human_readable_name: "Scripted Platform",
    supported_methods: &[
        AuthMethod::Interactive,
        AuthMethod::ServiceAccount,
        AuthMethod::DirectEndpoint,
    ],
    default_method: AuthMethod::Interactive,
};

/// How [`ScriptedAuthenticator`] answers refresh calls.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Mint a new token.
    Rotate,
    /// Return `Ok(None)`.
    Decline,
    /// Return a transport error.
    Fail,
}

/// Call log shared between the fake and the test body.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct Calls {
    pub logins: usize,
    pub refreshes: usize,
    pub forced_logins: usize,
    pub secrets_seen: usize,
    pub login_methods: Vec<AuthMethod>,
}

/// Authenticator answering from a script instead of a network.
#[allow(dead_code)]
pub struct ScriptedAuthenticator {
    calls: Arc<Mutex<Calls>>,
    refresh: RefreshOutcome,
    fail_login: bool,
}

#[allow(dead_code)]
impl ScriptedAuthenticator {
    pub fn new(refresh: RefreshOutcome) -> (Self, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        (
            Self {
                calls: Arc::clone(&calls),
                refresh,
                fail_login: false,
            },
            calls,
        )
    }

    pub fn failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }
}

impl Authenticator for ScriptedAuthenticator {
    fn descriptor(&self) -> AuthenticatorDescriptor {
        SCRIPTED
    }

    fn perform_authentication(
        &mut self,
        _profile: Option<&Profile>,
        auth_profile: &AuthProfile,
        secret: Option<&SecretString>,
        force: bool,
        now_ms: u64,
    ) -> Result<Token, AuthError> {
        let mut calls = self.calls.lock().expect("calls lock");
        if self.fail_login {
            return Err(AuthError::Transport("identity unreachable".to_string()));
        }
        calls.logins += 1;
        calls.forced_logins += usize::from(force);
        calls.secrets_seen += usize::from(secret.is_some());
        calls.login_methods.push(auth_profile.auth_method());

        let serial = calls.logins;
        Ok(token_for(
            &auth_profile.username,
            auth_profile.auth_method(),
            &format!("login-{serial}"),
            now_ms + LIFETIME_MS,
        ))
    }

    fn perform_refresh_authentication(
        &mut self,
        _profile: Option<&Profile>,
        auth_profile: &AuthProfile,
        token: &Token,
        now_ms: u64,
    ) -> Result<Option<Token>, AuthError> {
        let mut calls = self.calls.lock().expect("calls lock");
        calls.refreshes += 1;
        match self.refresh {
            RefreshOutcome::Rotate => Ok(Some(token_for(
                &token.username,
                auth_profile.auth_method(),
                &format!("refreshed-{}", calls.refreshes),
                now_ms + LIFETIME_MS,
            ))),
            RefreshOutcome::Decline => Ok(None),
            RefreshOutcome::Fail => Err(AuthError::Transport("refresh rejected".to_string())),
        }
    }
}

/// Token cache wrapper counting calls and injecting failures.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingCache {
    inner: MemoryTokenCache,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
    pub fail_load: AtomicBool,
    pub fail_save: AtomicBool,
    pub saved_postfixes: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stores `token` without counting it as a save.
    pub fn seed(&self, profile: &Profile, token: &Token, key_postfix: &str) {
        self.inner
            .save_token(profile, token, key_postfix)
            .expect("seed should succeed");
    }

    pub fn peek(&self, profile: &Profile, key_postfix: &str) -> Option<Token> {
        self.inner
            .load_token(profile, key_postfix)
            .expect("peek should succeed")
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TokenCache for RecordingCache {
    fn load_token(
        &self,
        profile: &Profile,
        key_postfix: &str,
    ) -> Result<Option<Token>, CacheError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("keyring locked".to_string()));
        }
        self.inner.load_token(profile, key_postfix)
    }

    fn save_token(
        &self,
        profile: &Profile,
        token: &Token,
        key_postfix: &str,
    ) -> Result<(), CacheError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("keyring read-only".to_string()));
        }
        self.saved_postfixes
            .lock()
            .expect("postfix lock")
            .push(key_postfix.to_string());
        self.inner.save_token(profile, token, key_postfix)
    }
}

/// Profile store returning a fixed default or failing.
#[allow(dead_code)]
pub struct StaticProfileStore {
    pub default_profile: Option<Profile>,
}

impl ProfileStore for StaticProfileStore {
    fn load_profile(&self, name: &str) -> Result<Profile, ProfileError> {
        self.default_profile
            .clone()
            .filter(|profile| profile.profile_name == name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    fn load_default_profile(&self) -> Result<Profile, ProfileError> {
        self.default_profile
            .clone()
            .ok_or_else(|| ProfileError::NotFound("default".to_string()))
    }
}

#[allow(dead_code)]
pub fn token_for(username: &str, method: AuthMethod, value: &str, expires_at_ms: u64) -> Token {
    Token {
        token: value.to_string(),
        token_type: TokenType::Jwt,
        username: username.to_string(),
        endpoint: "https://tenant.id.example.com".to_string(),
        auth_method: method,
        expires_at_ms,
        refresh_token: Some(format!("{value}-refresh")),
        metadata: BTreeMap::new(),
    }
}

#[allow(dead_code)]
pub fn interactive_auth_profile(username: &str) -> AuthProfile {
    AuthProfile::new(
        username,
        AuthMethodSettings::Interactive(InteractiveSettings::default()),
    )
}

#[allow(dead_code)]
pub fn profile_with(auth_profile: AuthProfile) -> Profile {
    Profile::new("work").with_auth_profile(SCRIPTED.name, auth_profile)
}

/// Session over a scripted authenticator and a recording cache.
#[allow(dead_code)]
pub fn scripted_session(
    refresh: RefreshOutcome,
) -> (AuthSession, Arc<RecordingCache>, Arc<Mutex<Calls>>) {
    let (authenticator, calls) = ScriptedAuthenticator::new(refresh);
    let cache = RecordingCache::new();
    let session = AuthSession::new(Box::new(authenticator))
        .with_token_cache(Arc::clone(&cache) as Arc<dyn TokenCache>);
    (session, cache, calls)
}
