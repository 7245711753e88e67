//! Business logic services

pub mod catalog;
pub mod imports;

use std::sync::Arc;

use crate::{
    config::ImportConfig, import::MergeDefaults, provider::ProviderClient, repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub imports: imports::ImportService,
}

impl Services {
    /// Create all services with the given repository and provider client
    pub fn new(
        repository: Repository,
        provider: Arc<dyn ProviderClient>,
        import_config: &ImportConfig,
    ) -> Self {
        let catalog = catalog::CatalogService::new(repository, MergeDefaults::from(import_config));
        let imports = imports::ImportService::new(provider, Arc::new(catalog.clone()), import_config);

        Self { catalog, imports }
    }
}
