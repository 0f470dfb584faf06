#![warn(missing_docs)]
//! # idsec-auth
//!
//! ## Purpose
//! Implements the authentication core every `idsec` service depends on: a
//! cacheable, auto-refreshing token lifecycle manager over pluggable
//! authenticators.
//!
//! ## Responsibilities
//! - Validate and normalize profile/auth-profile inputs before any login.
//! - Decide between cached token, refresh, and fresh login.
//! - Persist newly issued tokens through [`idsec_store::TokenCache`].
//! - Re-hydrate sessions in new processes ([`AuthSession::load_authentication`]).
//! - Keep an explicit [`AuthenticatorRegistry`] of available authenticators.
//!
//! ## Data flow
//! Caller builds an [`AuthenticateRequest`] -> [`AuthSession::authenticate`]
//! resolves the auth profile -> cache lookup -> [`Authenticator`] refresh or
//! login -> token saved to cache -> session state updated.
//!
//! ## Ownership and lifetimes
//! A session owns its authenticator and clones of the active profile and auth
//! profile, so callers may drop their inputs after a call returns. Caches and
//! profile stores are shared through `Arc`.
//!
//! ## Error model
//! Every fatal condition is a single attempt surfaced as [`AuthError`]. No
//! retries happen here; callers retry with `force` to bypass a poisoned cache
//! entry.
//!
//! ## Security and privacy notes
//! This crate does not log token values, refresh tokens, or secrets. Secrets
//! travel as [`secrecy::SecretString`].
//!
//! ## Example
//! ```rust
//! use idsec_auth::{AuthState, AuthSession, AuthenticatorRegistry};
//!
//! let registry = AuthenticatorRegistry::new();
//! assert!(registry.names().is_empty());
//! # let _ = AuthState::Unauthenticated;
//! # let _: Option<AuthSession> = None;
//! ```

mod authenticator;
mod error;
mod registry;
mod session;

use std::time::{SystemTime, UNIX_EPOCH};

pub use authenticator::{Authenticator, AuthenticatorDescriptor};
pub use error::AuthError;
pub use registry::AuthenticatorRegistry;
pub use session::{AuthSession, AuthState, AuthenticateRequest, DEFAULT_GRACE_PERIOD_MS};

/// Returns the current Unix epoch time in milliseconds.
///
/// Clocks before the epoch read as `0`.
pub fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
