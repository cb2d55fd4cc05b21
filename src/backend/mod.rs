//! AS and DM collaborators: HTTP client, JSON extraction, and per-topic fetchers.

#![allow(missing_docs)]

pub mod account_server;
pub mod client;
pub mod data_manager;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as Json;

use crate::core::errors::{Result, SquadError};
use crate::topics::TopicId;
use crate::topics::row::Value;
use crate::topics::source::TopicFetcher;

pub use self::client::ApiClient;

/// The two remote services the dashboard polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Backend {
    AccountServer,
    DataManager,
}

impl Backend {
    pub const ALL: [Self; 2] = [Self::AccountServer, Self::DataManager];

    /// Short label used in logs, errors, and the status banner.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AccountServer => "AS",
            Self::DataManager => "DM",
        }
    }

    /// Stable slot index for per-backend arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::AccountServer => 0,
            Self::DataManager => 1,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One API client per backend.
#[derive(Debug, Clone)]
pub struct Clients {
    pub account_server: Arc<ApiClient>,
    pub data_manager: Arc<ApiClient>,
}

impl Clients {
    #[must_use]
    pub fn for_backend(&self, backend: Backend) -> &Arc<ApiClient> {
        match backend {
            Backend::AccountServer => &self.account_server,
            Backend::DataManager => &self.data_manager,
        }
    }
}

/// The fetcher that serves `topic`.
#[must_use]
pub fn fetcher_for(topic: TopicId, clients: &Clients) -> Arc<dyn TopicFetcher> {
    let client = Arc::clone(clients.for_backend(topic.backend()));
    match topic {
        TopicId::Instances => Arc::new(data_manager::InstancesFetcher::new(client)),
        TopicId::Datasets => Arc::new(data_manager::DatasetsFetcher::new(client)),
        TopicId::Projects => Arc::new(data_manager::ProjectsFetcher::new(client)),
        TopicId::ServiceErrors => Arc::new(data_manager::ServiceErrorsFetcher::new(client)),
        TopicId::DefinedExchangeRates => {
            Arc::new(data_manager::ExchangeRatesFetcher::new(client, false))
        }
        TopicId::UndefinedExchangeRates => {
            Arc::new(data_manager::ExchangeRatesFetcher::new(client, true))
        }
        TopicId::Products => Arc::new(account_server::ProductsFetcher::new(client)),
        TopicId::Merchants => Arc::new(account_server::MerchantsFetcher::new(client)),
        TopicId::Assets => Arc::new(account_server::AssetsFetcher::new(client)),
        TopicId::Units => Arc::new(account_server::UnitsFetcher::new(client, false)),
        TopicId::PersonalUnits => Arc::new(account_server::UnitsFetcher::new(client, true)),
    }
}

// ──────────────────── JSON extraction helpers ────────────────────

/// Array under `key`, or a backend error naming the missing field.
pub(crate) fn array<'a>(backend: Backend, body: &'a Json, key: &str) -> Result<&'a [Json]> {
    body.get(key)
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| SquadError::Backend {
            backend: backend.label(),
            details: format!("response has no '{key}' array"),
        })
}

/// Follow a `/`-separated path of object keys.
pub(crate) fn pointer<'a>(body: &'a Json, path: &str) -> Option<&'a Json> {
    path.split('/').try_fold(body, |node, key| node.get(key))
}

/// Text at `path`; numbers are rendered, absent values become `Null`.
pub(crate) fn text(body: &Json, path: &str) -> Value {
    match pointer(body, path) {
        Some(Json::String(value)) => Value::text(value.as_str()),
        Some(Json::Number(number)) => Value::Text(number.to_string()),
        Some(Json::Bool(flag)) => Value::Text(flag.to_string()),
        _ => Value::Null,
    }
}

/// Integer at `path`, accepting numeric strings.
pub(crate) fn integer(body: &Json, path: &str) -> Value {
    match pointer(body, path) {
        Some(Json::Number(number)) => number.as_i64().map_or(Value::Null, Value::Integer),
        Some(Json::String(raw)) => raw.trim().parse().map_or(Value::Null, Value::Integer),
        _ => Value::Null,
    }
}

/// Decimal at `path`, accepting numeric strings such as `"12.50"`.
pub(crate) fn decimal(body: &Json, path: &str) -> Value {
    match pointer(body, path) {
        Some(Json::Number(number)) => number.as_f64().map_or(Value::Null, Value::Decimal),
        Some(Json::String(raw)) => Value::decimal_from_str(raw),
        _ => Value::Null,
    }
}

pub(crate) fn boolean(body: &Json, path: &str) -> Value {
    pointer(body, path)
        .and_then(Json::as_bool)
        .map_or(Value::Null, Value::Bool)
}

pub(crate) fn timestamp(body: &Json, path: &str) -> Value {
    pointer(body, path)
        .and_then(Json::as_str)
        .map_or(Value::Null, Value::timestamp_from_str)
}
