//! Wiring between configuration, collaborators, and the topic sources.

#![allow(missing_docs)]

pub mod controller;

use std::sync::Arc;

use tracing::info;

use crate::auth::{CredentialCache, KeycloakAuthenticator};
use crate::backend::{ApiClient, Backend, Clients, fetcher_for};
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::topics::TopicId;
use crate::topics::source::TopicSource;

pub use self::controller::{
    AuthStatus, ControllerAction, DashboardController, Frame, RefreshMode, RefreshNotice,
};

/// Live collaborators for one environment.
#[derive(Debug, Clone)]
pub struct Services {
    pub clients: Clients,
    pub credentials: Arc<CredentialCache>,
}

impl Services {
    /// HTTP clients and a Keycloak-backed credential cache for `config`.
    pub fn connect(config: &Config) -> Result<Self> {
        let timeout = config.dashboard.request_timeout();
        let env = &config.environment;
        let clients = Clients {
            account_server: Arc::new(ApiClient::new(Backend::AccountServer, &env.as_url, timeout)?),
            data_manager: Arc::new(ApiClient::new(Backend::DataManager, &env.dm_url, timeout)?),
        };
        let authenticator = KeycloakAuthenticator::new(env, timeout)?;
        info!(
            environment = %env.name,
            as_url = %env.as_url,
            dm_url = %env.dm_url,
            "services configured"
        );
        Ok(Self {
            clients,
            credentials: Arc::new(CredentialCache::new(Arc::new(authenticator))),
        })
    }

    /// One source per topic with its configured interval.
    pub fn sources(&self, config: &Config) -> Result<Vec<Arc<TopicSource>>> {
        TopicId::ALL
            .into_iter()
            .map(|topic| self.source(config, topic))
            .collect()
    }

    pub fn source(&self, config: &Config, topic: TopicId) -> Result<Arc<TopicSource>> {
        Ok(Arc::new(TopicSource::new(
            topic,
            config.dashboard.interval_for(topic),
            fetcher_for(topic, &self.clients),
            Arc::clone(&self.credentials),
        )?))
    }

    /// A controller over every topic, starting on `initial`.
    pub fn controller(
        &self,
        config: &Config,
        initial: TopicId,
        mode: RefreshMode,
    ) -> Result<DashboardController> {
        DashboardController::new(
            self.sources(config)?,
            Arc::clone(&self.credentials),
            initial,
            mode,
        )
    }
}
