//! Keycloak password-grant authenticator.

#![allow(missing_docs)]

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::{Authenticator, Token};
use crate::backend::Backend;
use crate::core::config::Environment;
use crate::core::errors::{Result, SquadError};

/// A prior token is reused only while it has at least this long left.
pub const REUSE_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Obtains AS and DM tokens for one user from one Keycloak realm.
pub struct KeycloakAuthenticator {
    http: Client,
    token_url: String,
    as_client_id: String,
    dm_client_id: String,
    user: String,
    password: String,
}

impl std::fmt::Debug for KeycloakAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakAuthenticator")
            .field("token_url", &self.token_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl KeycloakAuthenticator {
    pub fn new(environment: &Environment, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            token_url: token_url(&environment.keycloak_url, &environment.keycloak_realm),
            as_client_id: environment.keycloak_as_client_id.clone(),
            dm_client_id: environment.keycloak_dm_client_id.clone(),
            user: environment.user.clone(),
            password: environment.password.clone(),
        })
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    fn client_id(&self, backend: Backend) -> &str {
        match backend {
            Backend::AccountServer => &self.as_client_id,
            Backend::DataManager => &self.dm_client_id,
        }
    }

    fn request_token(&self, backend: Backend) -> Result<Token> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.client_id(backend)),
                ("username", self.user.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SquadError::Backend {
                backend: "keycloak",
                details: format!("token request for {backend} returned {status}"),
            });
        }
        let body: TokenResponse = response.json()?;
        Ok(Token::new(body.access_token))
    }
}

impl Authenticator for KeycloakAuthenticator {
    fn obtain_token(&self, backend: Backend, prior: Option<&Token>) -> Option<Token> {
        if let Some(prior) = prior.filter(|token| is_reusable(token, Utc::now().timestamp())) {
            return Some(prior.clone());
        }
        match self.request_token(backend) {
            Ok(token) => {
                debug!(backend = %backend, "obtained new access token");
                Some(token)
            }
            Err(err) => {
                warn!(backend = %backend, code = err.code(), error = %err, "token request failed");
                None
            }
        }
    }
}

/// OpenID Connect token endpoint for `realm`.
#[must_use]
pub fn token_url(keycloak_url: &str, realm: &str) -> String {
    format!(
        "{}/realms/{realm}/protocol/openid-connect/token",
        keycloak_url.trim_end_matches('/')
    )
}

/// The `exp` claim of a JWT, if the token is one.
#[must_use]
pub fn token_expiry(token: &Token) -> Option<i64> {
    let payload = token.as_str().split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Claims>(&bytes).ok()?.exp
}

/// Whether `token` stays valid for more than [`REUSE_MARGIN_SECS`] after `now`.
#[must_use]
pub fn is_reusable(token: &Token, now: i64) -> bool {
    token_expiry(token).is_some_and(|exp| exp - now > REUSE_MARGIN_SECS)
}
