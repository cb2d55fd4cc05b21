//! Structured JSON logging via `tracing`.
//!
//! The interactive dashboard owns the terminal, so it logs to a file; every
//! other command logs to stderr.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::errors::{Result, SquadError};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "SQUAD_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    #[must_use]
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Default filter directive when `SQUAD_LOG` is unset.
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "squad=error",
            Self::Normal => "squad=info",
            Self::Verbose => "squad=debug",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(verbosity: Verbosity, target: &LogTarget) -> Result<()> {
    let writer = match target {
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogTarget::File(path) => BoxMakeWriter::new(Arc::new(open_append(path)?)),
    };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    // Err only means a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter)
        .try_init();
    Ok(())
}

/// Open or create a file for appending, creating parent directories.
fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SquadError::io(parent, source))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SquadError::io(path, source))
}
