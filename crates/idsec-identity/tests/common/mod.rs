//! Shared fakes for identity integration tests.

use std::sync::Mutex;

use idsec_auth::AuthError;
use idsec_identity::{
    CookieJar, IdentitySession, IdentityTransport, InteractiveLoginRequest, RefreshRequest,
    ServiceLoginRequest,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::ExposeSecret;
use serde::Serialize;

/// Fixed clock used across scenarios.
#[allow(dead_code)]
pub const NOW_MS: u64 = 1_700_000_000_000;

/// One transport invocation, with secrets reduced to what tests assert on.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Interactive {
        identity_url: String,
        username: String,
        had_secret: bool,
        mfa_method: Option<String>,
    },
    Service {
        identity_url: String,
        application: String,
        username: String,
        secret: String,
    },
    Refresh {
        identity_url: String,
        refresh_token: String,
        cookie_header: Option<String>,
    },
}

/// Transport answering from fixed values.
#[allow(dead_code)]
pub struct ScriptedTransport {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub access_token: String,
    pub lifetime_secs: Option<u64>,
    pub refresh_token: Option<String>,
    pub set_cookies: Vec<String>,
    pub fail: bool,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            access_token: access_token.into(),
            lifetime_secs: None,
            refresh_token: Some("refresh-1".to_string()),
            set_cookies: vec!["sid=cookie-1; Path=/".to_string()],
            fail: false,
        }
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn answer(&self, call: RecordedCall, host: &str) -> Result<IdentitySession, AuthError> {
        self.calls.lock().expect("calls lock").push(call);
        if self.fail {
            return Err(AuthError::Transport("identity returned 401".to_string()));
        }
        let mut cookies = CookieJar::new();
        for header in &self.set_cookies {
            cookies.capture_set_cookie(header, host);
        }
        Ok(IdentitySession {
            token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            token_lifetime_secs: self.lifetime_secs,
            cookies,
        })
    }
}

impl IdentityTransport for ScriptedTransport {
    fn interactive_login(
        &self,
        request: &InteractiveLoginRequest<'_>,
    ) -> Result<IdentitySession, AuthError> {
        self.answer(
            RecordedCall::Interactive {
                identity_url: request.identity_url.to_string(),
                username: request.username.to_string(),
                had_secret: request.secret.is_some(),
                mfa_method: request.mfa_method.map(str::to_string),
            },
            "tenant.id.example.cloud",
        )
    }

    fn service_login(&self, request: &ServiceLoginRequest<'_>) -> Result<IdentitySession, AuthError> {
        self.answer(
            RecordedCall::Service {
                identity_url: request.identity_url.to_string(),
                application: request.application.to_string(),
                username: request.username.to_string(),
                secret: request.secret.expose_secret().clone(),
            },
            "tenant.id.example.cloud",
        )
    }

    fn refresh(&self, request: &RefreshRequest<'_>) -> Result<IdentitySession, AuthError> {
        self.answer(
            RecordedCall::Refresh {
                identity_url: request.identity_url.to_string(),
                refresh_token: request.refresh_token.to_string(),
                cookie_header: request.cookies.header_value(),
            },
            "tenant.id.example.cloud",
        )
    }
}

#[derive(Serialize)]
struct TenantClaims<'a> {
    iss: &'a str,
    tenant_id: &'a str,
    subdomain: &'a str,
    exp: u64,
}

/// Signed JWT carrying tenant claims.
#[allow(dead_code)]
pub fn tenant_jwt(tenant_id: &str, subdomain: &str) -> String {
    encode(
        &Header::default(),
        &TenantClaims {
            iss: "https://abc1234.id.example.cloud",
            tenant_id,
            subdomain,
            exp: 4_000_000_000,
        },
        &EncodingKey::from_secret(b"issuer-key"),
    )
    .expect("jwt should encode")
}
