#![warn(missing_docs)]
//! # idsec-identity
//!
//! ## Purpose
//! Provides the Identity Security Platform authenticator (`isp`) and the
//! transport it logs in through.
//!
//! ## Responsibilities
//! - Dispatch interactive and service-account logins by method settings.
//! - Resolve the identity tenant URL from settings.
//! - Build the token metadata bag (environment, cookies, tenant claims).
//! - Talk OAuth2 form posts over blocking HTTPS ([`HttpIdentityTransport`]).
//!
//! ## Data flow
//! `AuthSession` -> [`IdentityAuthenticator`] -> [`IdentityTransport`] ->
//! [`IdentitySession`] -> `Token` with metadata.
//!
//! ## Ownership and lifetimes
//! Transport requests borrow their inputs; sessions returned by the transport
//! are owned and moved into the issued token.
//!
//! ## Error model
//! All failures surface as [`idsec_auth::AuthError`]. Claim extraction never
//! fails a login; unreadable tokens just omit tenant metadata.
//!
//! ## Security and privacy notes
//! Passwords, client secrets, tokens, and cookie values are never logged.
//! Identity URLs must use `https`.
//!
//! ## Example
//! ```rust
//! use idsec_identity::{CookieJar, IDENTITY_AUTHENTICATOR};
//!
//! assert_eq!(IDENTITY_AUTHENTICATOR.name, "isp");
//! let mut jar = CookieJar::new();
//! jar.capture_set_cookie("sid=abc; Path=/", "tenant.id.example.com");
//! assert_eq!(jar.header_value().as_deref(), Some("sid=abc"));
//! ```

mod authenticator;
mod claims;
mod cookies;
mod http;
mod transport;

pub use authenticator::{
    DEFAULT_DEPLOY_ENV, DEFAULT_IDENTITY_URL_TEMPLATE, DEFAULT_TOKEN_LIFETIME_SECS,
    IDENTITY_AUTHENTICATOR, IdentityAuthenticator, IdentityConfig, register_identity_authenticator,
};
pub use claims::{TokenClaims, decode_unverified, platform_service_url};
pub use cookies::{CookieJar, CookieJarError, StoredCookie};
pub use http::{HttpIdentityTransport, parse_token_response, validate_identity_url};
pub use transport::{
    IdentitySession, IdentityTransport, InteractiveLoginRequest, RefreshRequest,
    ServiceLoginRequest,
};
