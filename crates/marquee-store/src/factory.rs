//! Store factory pattern for creating document stores from configuration
//!
//! Each backend registers a factory; the registry picks the one named by
//! `[store] backend` in the config file.

use anyhow::Result;
use async_trait::async_trait;
use marquee_config::{Config, PathManager, StoreBackend};
use std::collections::HashMap;
use std::sync::Arc;
use crate::DocumentStore;

/// Factory trait for creating a store backend from configuration
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// The backend this factory creates
    fn backend(&self) -> StoreBackend;

    /// Create a store instance from configuration
    async fn create(&self, config: &Config, paths: &PathManager) -> Result<Arc<dyn DocumentStore>>;

    /// Validate the backend configuration before creating the store
    fn validate_config(&self, _config: &Config) -> Result<()> {
        Ok(())
    }
}

/// Registry of store factories
pub struct StoreFactoryRegistry {
    factories: HashMap<String, Box<dyn StoreFactory>>,
}

impl StoreFactoryRegistry {
    /// Create a new registry with all built-in factories registered
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register(Box::new(memory::MemoryStoreFactory));
        registry.register(Box::new(json_file::JsonFileStoreFactory));

        registry
    }

    pub fn register(&mut self, factory: Box<dyn StoreFactory>) {
        self.factories.insert(backend_key(factory.backend()), factory);
    }

    /// Create the store selected by the configuration
    pub async fn create_store(&self, config: &Config, paths: &PathManager) -> Result<Arc<dyn DocumentStore>> {
        let key = backend_key(config.store.backend);
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| anyhow::anyhow!("No store factory registered for backend '{}'", key))?;
        factory.validate_config(config)?;
        factory.create(config, paths).await
    }

    pub fn registered_backends(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_registered(&self, backend: StoreBackend) -> bool {
        self.factories.contains_key(&backend_key(backend))
    }
}

impl Default for StoreFactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn backend_key(backend: StoreBackend) -> String {
    match backend {
        StoreBackend::Memory => "memory".to_string(),
        StoreBackend::JsonFile => "json_file".to_string(),
    }
}

/// Create the configured store with the built-in factories
pub async fn create_store(config: &Config, paths: &PathManager) -> Result<Arc<dyn DocumentStore>> {
    StoreFactoryRegistry::new().create_store(config, paths).await
}

mod memory {
    use super::*;
    use crate::MemoryStore;

    pub struct MemoryStoreFactory;

    #[async_trait]
    impl StoreFactory for MemoryStoreFactory {
        fn backend(&self) -> StoreBackend {
            StoreBackend::Memory
        }

        async fn create(&self, _config: &Config, _paths: &PathManager) -> Result<Arc<dyn DocumentStore>> {
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

mod json_file {
    use super::*;
    use crate::JsonFileStore;

    pub struct JsonFileStoreFactory;

    #[async_trait]
    impl StoreFactory for JsonFileStoreFactory {
        fn backend(&self) -> StoreBackend {
            StoreBackend::JsonFile
        }

        async fn create(&self, config: &Config, paths: &PathManager) -> Result<Arc<dyn DocumentStore>> {
            let path = config
                .store
                .path
                .clone()
                .unwrap_or_else(|| paths.store_file());
            let store = JsonFileStore::open(path).await?;
            Ok(Arc::new(store))
        }

        fn validate_config(&self, config: &Config) -> Result<()> {
            if let Some(path) = &config.store.path {
                if path.as_os_str().is_empty() {
                    return Err(anyhow::anyhow!("store.path is set but empty"));
                }
                if path.is_dir() {
                    return Err(anyhow::anyhow!("store.path {:?} is a directory", path));
                }
            }
            Ok(())
        }
    }
}
