//! Issued tokens and their persistence codec.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AuthMethod, CoreError};

/// Kind of credential carried by a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Signed JSON Web Token.
    Jwt,
    /// Session cookies.
    Cookies,
    /// Opaque bearer token.
    Token,
    /// Token minted for in-process use only.
    Internal,
}

/// Credential issued by a login or refresh.
///
/// Tokens are never mutated after issue; a refresh produces a new value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer material presented to downstream services.
    pub token: String,
    /// Credential kind.
    pub token_type: TokenType,
    /// User the token was issued to.
    pub username: String,
    /// Endpoint that issued the token.
    pub endpoint: String,
    /// Method used to obtain the token.
    pub auth_method: AuthMethod,
    /// Absolute Unix epoch milliseconds when the token expires.
    pub expires_at_ms: u64,
    /// Refresh token, when the issuer supports rotation.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Best-effort auxiliary data (environment, cookies, tenant claims).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Token {
    /// Returns `true` when the token has expired at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Returns `true` while expiry is still more than `grace_ms` away.
    ///
    /// A token inside the grace window is fresh enough to skip a refresh.
    pub fn within_grace(&self, now_ms: u64, grace_ms: u64) -> bool {
        self.expires_at_ms > now_ms.saturating_add(grace_ms)
    }

    /// Returns `true` when the issuer handed out a usable refresh token.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|refresh| !refresh.trim().is_empty())
    }

    /// Serializes the token to the cache blob format.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }

    /// Deserializes a token from the cache blob format.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON decoding fails.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("username", &self.username)
            .field("endpoint", &self.endpoint)
            .field("auth_method", &self.auth_method)
            .field("expires_at_ms", &self.expires_at_ms)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("metadata_keys", &self.metadata.keys().collect::<Vec<_>>())
            .finish()
    }
}
