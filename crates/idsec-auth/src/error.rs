use idsec_core::AuthMethod;
use idsec_store::{CacheError, ProfileError};
use thiserror::Error;

/// Errors produced by the authentication core and its authenticators.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Neither a profile nor an auth profile was supplied.
    #[error("either a profile or an auth profile must be supplied")]
    MissingInput,
    /// The profile has no auth profile for this authenticator.
    #[error(
        "{human_readable_name} [{authenticator}] is not configured in profile {profile:?}"
    )]
    AuthProfileNotConfigured {
        /// Registered authenticator name.
        authenticator: String,
        /// Human-readable authenticator name.
        human_readable_name: String,
        /// Profile that was searched.
        profile: String,
    },
    /// The authenticator does not implement the requested method.
    #[error("{authenticator} does not support auth method {method}")]
    UnsupportedMethod {
        /// Registered authenticator name.
        authenticator: String,
        /// Requested method.
        method: AuthMethod,
    },
    /// A credential mandatory for the method is missing.
    #[error("auth method {method} requires a {missing}")]
    CredentialsRequired {
        /// Method being attempted.
        method: AuthMethod,
        /// Which credential is missing (`username`, `secret`).
        missing: &'static str,
    },
    /// Method settings cannot be turned into a login target.
    #[error("invalid auth settings: {0}")]
    InvalidSettings(String),
    /// Token cache read or write failed.
    #[error("token cache failure: {0}")]
    Cache(#[from] CacheError),
    /// Profile store failed.
    #[error("profile store failure: {0}")]
    Profile(#[from] ProfileError),
    /// Transport failure from the identity backend.
    #[error("auth transport failure: {0}")]
    Transport(String),
    /// Response payload violated auth contract expectations.
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
    /// No authenticator is registered under this name.
    #[error("unknown authenticator: {0}")]
    UnknownAuthenticator(String),
    /// An authenticator with this name is already registered.
    #[error("authenticator already registered: {0}")]
    DuplicateAuthenticator(String),
}
