//! Blocking HTTPS transport speaking OAuth2 form posts.

use std::time::Duration;

use idsec_auth::AuthError;
use idsec_core::AuthMethod;
use reqwest::blocking::Client;
use reqwest::header::{COOKIE, SET_COOKIE};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::{
    CookieJar, IdentitySession, IdentityTransport, InteractiveLoginRequest, RefreshRequest,
    ServiceLoginRequest,
};

const MAX_ERROR_BODY_CHARS: usize = 256;

/// [`IdentityTransport`] backed by `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct HttpIdentityTransport {
    client: Client,
}

impl HttpIdentityTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns [`AuthError::Transport`] when the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| AuthError::Transport(format!("http client setup failed: {error}")))?;
        Ok(Self { client })
    }

    fn post_token_form(
        &self,
        identity_url: &str,
        application: &str,
        form: &[(&str, &str)],
        basic_auth: Option<(&str, &SecretString)>,
        cookies: &CookieJar,
    ) -> Result<IdentitySession, AuthError> {
        let endpoint = token_endpoint(identity_url, application)?;
        let host = endpoint.host_str().unwrap_or_default().to_string();

        let mut request = self.client.post(endpoint).form(form);
        if let Some(header) = cookies.header_value() {
            request = request.header(COOKIE, header);
        }
        if let Some((username, secret)) = basic_auth {
            request = request.basic_auth(username, Some(secret.expose_secret()));
        }

        let response = request
            .send()
            .map_err(|error| AuthError::Transport(format!("request to {host} failed: {error}")))?;
        let status = response.status();

        let mut jar = cookies.clone();
        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                jar.capture_set_cookie(raw, &host);
            }
        }

        let body = response
            .text()
            .map_err(|error| AuthError::Transport(format!("reading response failed: {error}")))?;
        if !status.is_success() {
            let excerpt: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(AuthError::Transport(format!(
                "identity at {host} returned {status}: {excerpt}"
            )));
        }
        debug!(host = %host, cookies = jar.len(), "token endpoint answered");

        let mut session = parse_token_response(&body)?;
        session.cookies = jar;
        Ok(session)
    }
}

impl IdentityTransport for HttpIdentityTransport {
    fn interactive_login(
        &self,
        request: &InteractiveLoginRequest<'_>,
    ) -> Result<IdentitySession, AuthError> {
        let secret = request.secret.ok_or(AuthError::CredentialsRequired {
            method: AuthMethod::Interactive,
            missing: "secret",
        })?;

        let mut form = vec![
            ("grant_type", "password"),
            ("username", request.username),
            ("password", secret.expose_secret().as_str()),
        ];
        if let Some(mfa_method) = request.mfa_method {
            form.push(("mfa_method", mfa_method));
        }

        info!(username = %request.username, "identity password login");
        self.post_token_form(
            request.identity_url,
            request.application,
            &form,
            None,
            &CookieJar::new(),
        )
    }

    fn service_login(&self, request: &ServiceLoginRequest<'_>) -> Result<IdentitySession, AuthError> {
        info!(
            username = %request.username,
            application = %request.application,
            "identity client credentials login"
        );
        self.post_token_form(
            request.identity_url,
            request.application,
            &[("grant_type", "client_credentials"), ("scope", "api")],
            Some((request.username, request.secret)),
            &CookieJar::new(),
        )
    }

    fn refresh(&self, request: &RefreshRequest<'_>) -> Result<IdentitySession, AuthError> {
        self.post_token_form(
            request.identity_url,
            request.application,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", request.refresh_token),
            ],
            None,
            request.cookies,
        )
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Parses an OAuth2 token endpoint response body.
///
/// The returned session carries an empty cookie jar.
///
/// # Errors
/// Returns [`AuthError::InvalidResponse`] for malformed JSON or a missing
/// `access_token`.
pub fn parse_token_response(body: &str) -> Result<IdentitySession, AuthError> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|error| AuthError::InvalidResponse(format!("token response: {error}")))?;

    if response.access_token.trim().is_empty() {
        return Err(AuthError::InvalidResponse(
            "response missing access_token".to_string(),
        ));
    }

    Ok(IdentitySession {
        token: response.access_token,
        refresh_token: response
            .refresh_token
            .filter(|refresh| !refresh.trim().is_empty()),
        token_lifetime_secs: response.expires_in,
        cookies: CookieJar::new(),
    })
}

/// Validates that an identity URL is an absolute `https` URL.
///
/// # Errors
/// Returns [`AuthError::InvalidSettings`] for unparsable or non-HTTPS URLs.
pub fn validate_identity_url(identity_url: &str) -> Result<Url, AuthError> {
    let parsed = Url::parse(identity_url)
        .map_err(|error| AuthError::InvalidSettings(format!("invalid identity url: {error}")))?;

    if parsed.scheme() != "https" {
        return Err(AuthError::InvalidSettings(
            "identity url must use https".to_string(),
        ));
    }
    if parsed.host_str().is_none() {
        return Err(AuthError::InvalidSettings(
            "identity url must include a host".to_string(),
        ));
    }

    Ok(parsed)
}

fn token_endpoint(identity_url: &str, application: &str) -> Result<Url, AuthError> {
    let mut endpoint = validate_identity_url(identity_url)?;
    endpoint
        .path_segments_mut()
        .map_err(|()| AuthError::InvalidSettings("identity url cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(["oauth2", "token", application]);
    Ok(endpoint)
}
