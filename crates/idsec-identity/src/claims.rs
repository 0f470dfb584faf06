//! Best-effort reading of identity token claims.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Claims the platform reads from issued tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Issuer URL.
    #[serde(default)]
    pub iss: Option<String>,
    /// Tenant identifier.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Tenant subdomain.
    #[serde(default)]
    pub subdomain: Option<String>,
}

/// Decodes claims without verifying the signature.
///
/// The result is informational only and must never drive an authorization
/// decision. Any parse failure yields `None`.
pub fn decode_unverified(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(error) => {
            debug!(%error, "token claims unreadable");
            None
        }
    }
}

/// Derives `https://{subdomain}.{service}.{platform-domain}`.
///
/// The platform domain is the issuer host without its first two labels
/// (`abc.id.example.cloud` -> `example.cloud`). Returns `None` when the
/// subdomain or a usable issuer is missing.
pub fn platform_service_url(claims: &TokenClaims, service: &str) -> Option<String> {
    let subdomain = claims.subdomain.as_deref().filter(|s| !s.trim().is_empty())?;
    let issuer = Url::parse(claims.iss.as_deref()?).ok()?;
    let host = issuer.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return None;
    }
    let platform_domain = labels[2..].join(".");
    Some(format!("https://{subdomain}.{service}.{platform_domain}"))
}

#[cfg(test)]
mod tests {
    //! Unit tests for unverified claim extraction.

    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Issued<'a> {
        iss: &'a str,
        tenant_id: &'a str,
        subdomain: &'a str,
        exp: u64,
    }

    fn signed(claims: &Issued<'_>) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"issuer-only-key"),
        )
        .expect("token should encode")
    }

    #[test]
    fn reads_claims_regardless_of_signature_and_expiry() {
        let token = signed(&Issued {
            iss: "https://abc1234.id.example.cloud",
            tenant_id: "tenant-1",
            subdomain: "acme",
            exp: 1,
        });

        let claims = decode_unverified(&token).expect("claims should decode");
        assert_eq!(claims.tenant_id.as_deref(), Some("tenant-1"));
        assert_eq!(claims.subdomain.as_deref(), Some("acme"));
    }

    #[test]
    fn garbage_yields_none() {
        assert!(decode_unverified("not-a-jwt").is_none());
        assert!(decode_unverified("").is_none());
    }

    #[test]
    fn builds_platform_service_url_from_issuer() {
        let claims = TokenClaims {
            iss: Some("https://abc1234.id.example.cloud/oauth".to_string()),
            tenant_id: None,
            subdomain: Some("acme".to_string()),
        };
        assert_eq!(
            platform_service_url(&claims, "privilegecloud").as_deref(),
            Some("https://acme.privilegecloud.example.cloud")
        );

        let without_subdomain = TokenClaims {
            subdomain: None,
            ..claims
        };
        assert!(platform_service_url(&without_subdomain, "privilegecloud").is_none());
    }
}
