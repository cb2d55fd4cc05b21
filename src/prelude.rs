//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use squad::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, DashboardConfig, Environment};
pub use crate::core::errors::{Result, SquadError};

// Auth
pub use crate::auth::{Authenticator, CredentialCache, KeycloakAuthenticator, Token};

// Backends
pub use crate::backend::{ApiClient, Backend, Clients};

// Topics
pub use crate::topics::TopicId;
pub use crate::topics::catalog::{TopicDefinition, definition};
pub use crate::topics::dataset::{SortState, SortableDataset};
pub use crate::topics::projection::{Grid, TableProjection};
pub use crate::topics::row::{Row, Value};
pub use crate::topics::source::{
    FailureReason, RefreshReport, TopicFetcher, TopicSource, TopicState,
};

// Dashboard
pub use crate::dashboard::{
    ControllerAction, DashboardController, Frame, RefreshMode, Services,
};
