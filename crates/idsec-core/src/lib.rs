#![warn(missing_docs)]
//! # idsec-core
//!
//! ## Purpose
//! Defines the pure data model shared by every `idsec` crate.
//!
//! ## Responsibilities
//! - Represent authentication methods and their method-specific settings.
//! - Represent auth profiles, named profiles, and issued tokens.
//! - Encode/decode token blobs and profile documents for persistence.
//! - Derive the cache-key postfix used to address cached tokens.
//!
//! ## Data flow
//! Profile documents decode into [`Profile`] values holding one
//! [`AuthProfile`] per authenticator name. Authenticators turn an
//! [`AuthProfile`] into a [`Token`], which the token cache persists using
//! [`Token::to_json_bytes`] under [`cache_key_postfix`].
//!
//! ## Ownership and lifetimes
//! All model values own their strings so they can outlive the profile store,
//! the cache backend, and the transport that produced them.
//!
//! ## Error model
//! Codec and profile validation failures return [`CoreError`].
//!
//! ## Security and privacy notes
//! [`Token`] carries bearer material. Its `Debug` output redacts the token and
//! refresh token so model values can appear in logs safely.
//!
//! ## Example
//! ```rust
//! use idsec_core::{AuthMethodSettings, AuthProfile, DirectEndpointSettings, cache_key_postfix};
//!
//! let profile = AuthProfile::new(
//!     "user",
//!     AuthMethodSettings::DirectEndpoint(DirectEndpointSettings {
//!         endpoint: Some("https://test.example.com:8080/path".to_string()),
//!         interactive: false,
//!     }),
//! );
//! assert_eq!(cache_key_postfix(&profile), "user_test.example.com:8080");
//! ```

mod method;
mod profile;
mod token;

pub use method::{
    AUTH_METHODS_REQUIRING_CREDENTIALS, AuthMethod, AuthMethodSettings,
    DEFAULT_AUTHORIZATION_APPLICATION, DirectEndpointSettings, InteractiveSettings,
    ServiceAccountSettings,
};
pub use profile::{AuthProfile, Profile, cache_key_postfix};
pub use token::{Token, TokenType};

use thiserror::Error;

/// Error type for model validation and codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON encoding/decoding error.
    #[error("model codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    /// Decoded profile violates model invariants.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    /// Unknown authentication method name.
    #[error("unknown auth method: {0}")]
    UnknownAuthMethod(String),
}
