//! SQD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SquadError>;

/// Top-level error type for SquAd.
#[derive(Debug, Error)]
pub enum SquadError {
    #[error("[SQD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SQD-1002] missing environments file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SQD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SQD-1004] environment '{name}' is not defined in {path}")]
    UnknownEnvironment { name: String, path: PathBuf },

    #[error("[SQD-1005] unknown topic '{name}'")]
    UnknownTopic { name: String },

    #[error("[SQD-2002] {backend} request failed: {details}")]
    Backend {
        backend: &'static str,
        details: String,
    },

    #[error("[SQD-2003] HTTP failure: {details}")]
    Http { details: String },

    #[error("[SQD-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SQD-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SQD-3101] no sortable column '{column}'")]
    InvalidSortColumn { column: String },
}

impl SquadError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SQD-1001",
            Self::MissingConfig { .. } => "SQD-1002",
            Self::ConfigParse { .. } => "SQD-1003",
            Self::UnknownEnvironment { .. } => "SQD-1004",
            Self::UnknownTopic { .. } => "SQD-1005",
            Self::Backend { .. } => "SQD-2002",
            Self::Http { .. } => "SQD-2003",
            Self::Serialization { .. } => "SQD-2101",
            Self::Io { .. } => "SQD-3002",
            Self::InvalidSortColumn { .. } => "SQD-3101",
        }
    }

    /// Whether retrying (on the next refresh interval) might resolve the failure.
    ///
    /// Configuration problems are fatal and reported once at startup.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. }
                | Self::Http { .. }
                | Self::Serialization { .. }
                | Self::Io { .. }
        )
    }

    /// Whether this error belongs to the startup configuration family.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::UnknownEnvironment { .. }
                | Self::UnknownTopic { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SquadError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SquadError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for SquadError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http {
            details: value.to_string(),
        }
    }
}
