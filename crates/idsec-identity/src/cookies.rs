//! Serializable cookie jar snapshots carried in token metadata.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One captured cookie.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain the cookie is scoped to.
    pub domain: String,
    /// Path the cookie is scoped to.
    pub path: String,
}

impl fmt::Debug for StoredCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .finish()
    }
}

/// Ordered cookie list, replayed on refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar {
    cookies: Vec<StoredCookie>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cookies held.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns `true` when the jar holds no cookies.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Iterates cookies in capture order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredCookie> {
        self.cookies.iter()
    }

    /// First cookie called `name`.
    pub fn get(&self, name: &str) -> Option<&StoredCookie> {
        self.cookies.iter().find(|cookie| cookie.name == name)
    }

    /// Records one `Set-Cookie` header value.
    ///
    /// A cookie with the same name, domain, and path is replaced in place.
    /// Returns `false` when the header carries no `name=value` pair.
    pub fn capture_set_cookie(&mut self, header: &str, default_domain: &str) -> bool {
        let mut parts = header.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return false;
        };
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        let mut domain = default_domain.to_string();
        let mut path = "/".to_string();
        for attribute in parts {
            if let Some((key, attr_value)) = attribute.split_once('=') {
                let attr_value = attr_value.trim();
                match key.trim().to_ascii_lowercase().as_str() {
                    "domain" if !attr_value.is_empty() => {
                        domain = attr_value.trim_start_matches('.').to_string();
                    }
                    "path" if !attr_value.is_empty() => path = attr_value.to_string(),
                    _ => {}
                }
            }
        }

        let cookie = StoredCookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            domain,
            path,
        };
        match self.cookies.iter_mut().find(|existing| {
            existing.name == cookie.name
                && existing.domain == cookie.domain
                && existing.path == cookie.path
        }) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
        true
    }

    /// `Cookie` request header value, or `None` for an empty jar.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|cookie| format!("{}={}", cookie.name, cookie.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Encodes the jar as base64 of its JSON snapshot.
    ///
    /// # Errors
    /// Returns [`CookieJarError::Codec`] when JSON encoding fails.
    pub fn to_base64(&self) -> Result<String, CookieJarError> {
        let raw = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(raw))
    }

    /// Decodes a snapshot produced by [`Self::to_base64`].
    ///
    /// # Errors
    /// Returns [`CookieJarError`] for invalid base64 or JSON.
    pub fn from_base64(encoded: &str) -> Result<Self, CookieJarError> {
        let raw = STANDARD.decode(encoded.trim())?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Cookie snapshot codec failures.
#[derive(Debug, Error)]
pub enum CookieJarError {
    /// Snapshot is not valid base64.
    #[error("cookie snapshot is not base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// Snapshot JSON is malformed.
    #[error("cookie snapshot codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
