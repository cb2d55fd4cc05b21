//! Blocking JSON client for one backend REST API.

#![allow(missing_docs)]

use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value as Json;
use tracing::debug;

use crate::auth::Token;
use crate::backend::Backend;
use crate::core::errors::{Result, SquadError};

/// Bearer-authenticated JSON client rooted at a backend's API URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    backend: Backend,
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Build a client whose every request carries `timeout`.
    pub fn new(backend: Backend, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("squad/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            backend,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get(&self, token: &Token, path: &str, query: &[(&str, &str)]) -> Result<Json> {
        self.send(
            self.request(Method::GET, path)
                .bearer_auth(token.as_str())
                .query(query),
            path,
        )
    }

    pub fn patch(&self, token: &Token, path: &str, query: &[(&str, &str)]) -> Result<Json> {
        self.send(
            self.request(Method::PATCH, path)
                .bearer_auth(token.as_str())
                .query(query),
            path,
        )
    }

    /// Unauthenticated `GET /version`.
    pub fn version(&self) -> Result<String> {
        let body = self.send(self.request(Method::GET, "version"), "version")?;
        body.get("version")
            .and_then(Json::as_str)
            .map(str::to_string)
            .ok_or_else(|| SquadError::Backend {
                backend: self.backend.label(),
                details: "version response has no 'version' field".to_string(),
            })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    fn send(&self, request: RequestBuilder, path: &str) -> Result<Json> {
        let response = request.send()?;
        let status = response.status();
        debug!(backend = %self.backend, path, status = status.as_u16(), "api response");
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SquadError::Backend {
                backend: self.backend.label(),
                details: format!("{path} returned {status}: {}", body.trim()),
            });
        }
        let text = response.text()?;
        if text.trim().is_empty() {
            return Ok(Json::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
