use std::sync::Arc;

use romshelf_core::catalog::GameCatalog;
use romshelf_core::index::SearchIndex;
use romshelf_core::{Authenticator, Config, Pipeline, SanitizedConfig, Scheduler};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    catalog: Arc<dyn GameCatalog>,
    index: Arc<dyn SearchIndex>,
    pipeline: Arc<Pipeline>,
    scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        catalog: Arc<dyn GameCatalog>,
        index: Arc<dyn SearchIndex>,
        pipeline: Arc<Pipeline>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            config,
            authenticator,
            catalog,
            index,
            pipeline,
            scheduler,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn catalog(&self) -> &Arc<dyn GameCatalog> {
        &self.catalog
    }

    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}
