//! Data Manager topic fetchers.
//!
//! Each fetcher is a thin HTTP call followed by a pure `*_rows` extraction
//! function so the JSON handling can be tested without a server.

#![allow(missing_docs)]

use std::sync::Arc;

use serde_json::Value as Json;

use crate::auth::Token;
use crate::backend::{ApiClient, Backend, array, integer, text, timestamp};
use crate::core::errors::Result;
use crate::topics::row::{Row, Value};
use crate::topics::source::TopicFetcher;

const BACKEND: Backend = Backend::DataManager;

// ──────────────────── instances ────────────────────

pub struct InstancesFetcher {
    client: Arc<ApiClient>,
}

impl InstancesFetcher {
    #[must_use]
    pub const fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl TopicFetcher for InstancesFetcher {
    fn fetch(&self, token: &Token) -> Result<Vec<Row>> {
        // Instances of every user are only listed in admin mode.
        self.client
            .patch(token, "user/account", &[("become_admin", "true")])?;
        let body = self.client.get(token, "instance", &[])?;
        instance_rows(&body)
    }
}

/// Rows from a `GET /instance` body. Jobs show as `job|version`, applications
/// by their id.
pub fn instance_rows(body: &Json) -> Result<Vec<Row>> {
    Ok(array(BACKEND, body, "instances")?
        .iter()
        .map(|instance| {
            let is_job = instance
                .get("application_type")
                .and_then(Json::as_str)
                .is_some_and(|kind| kind.eq_ignore_ascii_case("JOB"));
            let app_job = if is_job {
                Value::Text(format!(
                    "{}|{}",
                    text(instance, "job_job"),
                    text(instance, "job_version")
                ))
            } else {
                text(instance, "application_id")
            };
            Row::new()
                .with("id", text(instance, "id"))
                .with("name", text(instance, "name"))
                .with("owner", text(instance, "owner"))
                .with("launched", timestamp(instance, "launched"))
                .with("phase", text(instance, "phase"))
                .with("app_job", app_job)
        })
        .collect())
}

// ──────────────────── datasets ────────────────────

pub struct DatasetsFetcher {
    client: Arc<ApiClient>,
}

impl DatasetsFetcher {
    #[must_use]
    pub const fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl TopicFetcher for DatasetsFetcher {
    fn fetch(&self, token: &Token) -> Result<Vec<Row>> {
        let body = self.client.get(token, "dataset", &[])?;
        dataset_rows(&body)
    }
}

/// One row per dataset version; `used` counts the projects holding it.
pub fn dataset_rows(body: &Json) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for dataset in array(BACKEND, body, "datasets")? {
        let id = text(dataset, "dataset_id");
        let versions = dataset
            .get("versions")
            .and_then(Json::as_array)
            .map_or(&[][..], Vec::as_slice);
        for version in versions {
            let used = version
                .get("projects")
                .and_then(Json::as_array)
                .map_or(0, Vec::len);
            rows.push(
                Row::new()
                    .with("id", id.clone())
                    .with("version", integer(version, "version"))
                    .with("owner", text(version, "owner"))
                    .with("stage", text(version, "processing_stage"))
                    .with("filename", text(version, "file_name"))
                    .with("size", integer(version, "size"))
                    .with("published", timestamp(version, "published"))
                    .with("used", i64::try_from(used).unwrap_or(i64::MAX)),
            );
        }
    }
    Ok(rows)
}

// ──────────────────── projects ────────────────────

pub struct ProjectsFetcher {
    client: Arc<ApiClient>,
}

impl ProjectsFetcher {
    #[must_use]
    pub const fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl TopicFetcher for ProjectsFetcher {
    fn fetch(&self, token: &Token) -> Result<Vec<Row>> {
        let body = self.client.get(token, "project", &[])?;
        project_rows(&body)
    }
}

pub fn project_rows(body: &Json) -> Result<Vec<Row>> {
    Ok(array(BACKEND, body, "projects")?
        .iter()
        .map(|project| {
            Row::new()
                .with("id", text(project, "project_id"))
                .with("name", text(project, "name"))
                .with("owner", text(project, "owner"))
                .with("size", integer(project, "size"))
        })
        .collect())
}

// ──────────────────── service errors ────────────────────

pub struct ServiceErrorsFetcher {
    client: Arc<ApiClient>,
}

impl ServiceErrorsFetcher {
    #[must_use]
    pub const fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl TopicFetcher for ServiceErrorsFetcher {
    fn fetch(&self, token: &Token) -> Result<Vec<Row>> {
        let body = self.client.get(token, "admin/service-error", &[])?;
        service_error_rows(&body)
    }
}

pub fn service_error_rows(body: &Json) -> Result<Vec<Row>> {
    Ok(array(BACKEND, body, "service_errors")?
        .iter()
        .map(|error| {
            Row::new()
                .with("id", integer(error, "id"))
                .with("created", timestamp(error, "created"))
                .with("severity", text(error, "severity"))
                .with("hostname", text(error, "hostname"))
                .with("summary", text(error, "summary"))
        })
        .collect())
}

// ──────────────────── exchange rates ────────────────────

pub struct ExchangeRatesFetcher {
    client: Arc<ApiClient>,
    only_undefined: bool,
}

impl ExchangeRatesFetcher {
    #[must_use]
    pub const fn new(client: Arc<ApiClient>, only_undefined: bool) -> Self {
        Self {
            client,
            only_undefined,
        }
    }
}

impl TopicFetcher for ExchangeRatesFetcher {
    fn fetch(&self, token: &Token) -> Result<Vec<Row>> {
        let flag = if self.only_undefined { "true" } else { "false" };
        let body = self
            .client
            .get(token, "job/exchange-rate", &[("only_undefined", flag)])?;
        exchange_rate_rows(&body)
    }
}

/// Rates ordered by collection then job, so grouping by collection keeps jobs
/// alphabetical within each group.
pub fn exchange_rate_rows(body: &Json) -> Result<Vec<Row>> {
    let mut rows: Vec<Row> = array(BACKEND, body, "exchange_rates")?
        .iter()
        .map(|rate| {
            Row::new()
                .with("collection", text(rate, "collection"))
                .with("job", text(rate, "job"))
                .with("version", text(rate, "version"))
                .with("rate", text(rate, "rate"))
        })
        .collect();
    rows.sort_by(|a, b| {
        a.get("collection")
            .compare(b.get("collection"))
            .then_with(|| a.get("job").compare(b.get("job")))
    });
    Ok(rows)
}
