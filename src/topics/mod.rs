//! Topic engine: identities, typed rows, sortable datasets, projection and the
//! per-topic polling source.

#![allow(missing_docs)]

pub mod catalog;
pub mod dataset;
pub mod projection;
pub mod row;
pub mod source;

#[cfg(test)]
mod test_properties;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::backend::Backend;
use crate::core::errors::SquadError;

/// Closed set of topics the dashboard can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicId {
    Instances,
    Datasets,
    Projects,
    Products,
    Merchants,
    Assets,
    PersonalUnits,
    Units,
    ServiceErrors,
    DefinedExchangeRates,
    UndefinedExchangeRates,
}

impl TopicId {
    /// Navigation order (Tab / BackTab).
    pub const ALL: [Self; 11] = [
        Self::Instances,
        Self::Datasets,
        Self::Projects,
        Self::Products,
        Self::Merchants,
        Self::Assets,
        Self::PersonalUnits,
        Self::Units,
        Self::ServiceErrors,
        Self::DefinedExchangeRates,
        Self::UndefinedExchangeRates,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Instances => "instances",
            Self::Datasets => "datasets",
            Self::Projects => "projects",
            Self::Products => "products",
            Self::Merchants => "merchants",
            Self::Assets => "assets",
            Self::PersonalUnits => "personal-units",
            Self::Units => "units",
            Self::ServiceErrors => "service-errors",
            Self::DefinedExchangeRates => "defined-exchange-rates",
            Self::UndefinedExchangeRates => "undefined-exchange-rates",
        }
    }

    /// Backend that serves this topic.
    #[must_use]
    pub const fn backend(self) -> Backend {
        match self {
            Self::Products
            | Self::Merchants
            | Self::Assets
            | Self::PersonalUnits
            | Self::Units => Backend::AccountServer,
            Self::Instances
            | Self::Datasets
            | Self::Projects
            | Self::ServiceErrors
            | Self::DefinedExchangeRates
            | Self::UndefinedExchangeRates => Backend::DataManager,
        }
    }

    /// Single-key shortcut used by the dashboard.
    #[must_use]
    pub const fn hotkey(self) -> char {
        match self {
            Self::Instances => 'i',
            Self::Datasets => 'd',
            Self::Projects => 'j',
            Self::Products => 'p',
            Self::Merchants => 'm',
            Self::Assets => 'a',
            Self::PersonalUnits => 'U',
            Self::Units => 'u',
            Self::ServiceErrors => 'e',
            Self::DefinedExchangeRates => 'x',
            Self::UndefinedExchangeRates => 'X',
        }
    }

    #[must_use]
    pub fn from_hotkey(key: char) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.hotkey() == key)
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.name() == name)
    }

    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|topic| *topic == self)
            .unwrap_or_default()
    }

    /// Next topic in navigation order, wrapping.
    #[must_use]
    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    /// Previous topic in navigation order, wrapping.
    #[must_use]
    pub fn prev(self) -> Self {
        let len = Self::ALL.len();
        Self::ALL[(self.position() + len - 1) % len]
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TopicId {
    type Err = SquadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| SquadError::UnknownTopic {
            name: s.to_string(),
        })
    }
}
