//! Public model store operations
//!
//! `ModelStore` ties the catalog, cache, fetcher and decoder together. Its
//! configuration is shared and mutable; every operation takes a snapshot at
//! its start, so changing the cache root or repository between calls takes
//! effect on the next call.

use crate::catalog::{AvailableModels, Catalog};
use crate::config::ModelsConfig;
use crate::error::{ModelError, ModelResult};
use crate::metrics;
use crate::models::resolver::{resolve_any, resolve_core, resolve_stat};
use crate::models::{
    CacheScope, CacheStore, ModelCategory, ModelDecoder, ModelDescriptor, ModelHandle, ModelLoader,
    RdsDecoder, RemoteFetcher, bytes_to_mb,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// One row of `check_cache_status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatusEntry {
    pub model: String,
    pub category: ModelCategory,
    pub cached: bool,
    pub size_mb: f64,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Outcome of `clear_cache`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub scope: CacheScope,
    pub files_removed: usize,
}

/// Entry point for loading and managing cached models
pub struct ModelStore {
    config: RwLock<ModelsConfig>,
    catalog: Arc<Catalog>,
    decoder: Arc<dyn ModelDecoder>,
    fetcher: Option<Arc<RemoteFetcher>>,
}

impl ModelStore {
    /// Create a store using the built-in catalog and the GitHub transports
    pub fn new(config: ModelsConfig) -> Self {
        Self {
            config: RwLock::new(config),
            catalog: Catalog::builtin(),
            decoder: Arc::new(RdsDecoder),
            fetcher: None,
        }
    }

    /// Create a store from defaults plus environment overrides
    pub fn from_env() -> Self {
        Self::new(ModelsConfig::default().with_env_overrides())
    }

    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ModelDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Use a fixed fetcher instead of building one from the configuration per call
    pub fn with_fetcher(mut self, fetcher: RemoteFetcher) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Snapshot of the current configuration
    pub fn settings(&self) -> ModelsConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut ModelsConfig)) {
        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(&mut guard);
    }

    /// Override the cache root, or pass `None` to return to the platform default
    pub fn set_cache_dir(&self, dir: Option<PathBuf>) {
        self.update(|config| config.cache_dir = dir);
    }

    /// Override the release repository (`owner/name`)
    pub fn set_repository(&self, repository: impl Into<String>) -> ModelResult<()> {
        let candidate = ModelsConfig {
            repository: repository.into(),
            ..self.settings()
        };
        candidate
            .validate()
            .map_err(|e| ModelError::Config(e.to_string()))?;
        self.update(|config| config.repository = candidate.repository);
        Ok(())
    }

    /// Cache root the next operation would use
    pub fn cache_root(&self) -> PathBuf {
        self.settings().cache_root()
    }

    fn cache(&self, settings: &ModelsConfig) -> CacheStore {
        CacheStore::new(settings.cache_root())
    }

    /// Load a core model by alias or file stem
    pub async fn load_core_model(&self, name: &str, force_refresh: bool) -> ModelResult<ModelHandle> {
        let descriptor = resolve_core(&self.catalog, name)?;
        self.load_descriptor(&descriptor, force_refresh).await
    }

    /// Load a per-statistic model
    pub async fn load_stat_model(&self, name: &str, force_refresh: bool) -> ModelResult<ModelHandle> {
        let descriptor = resolve_stat(&self.catalog, name)?;
        self.load_descriptor(&descriptor, force_refresh).await
    }

    /// Load a model by any name, trying core models before stat models
    pub async fn load_model(&self, name: &str, force_refresh: bool) -> ModelResult<ModelHandle> {
        let descriptor = resolve_any(&self.catalog, name)?;
        self.load_descriptor(&descriptor, force_refresh).await
    }

    async fn load_descriptor(
        &self,
        descriptor: &ModelDescriptor,
        force_refresh: bool,
    ) -> ModelResult<ModelHandle> {
        let settings = self.settings();
        settings
            .validate()
            .map_err(|e| ModelError::Config(e.to_string()))?;

        let cache = self.cache(&settings);
        let fetcher = match &self.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => Arc::new(RemoteFetcher::from_config(&settings)?),
        };

        let loader = ModelLoader::new(&cache, &fetcher, self.decoder.as_ref(), &settings.repository);
        let handle = loader.load(descriptor, force_refresh).await?;

        tracing::debug!(
            model = %descriptor.name,
            size_bytes = handle.size_bytes,
            "Model loaded"
        );

        Ok(handle)
    }

    /// Cache path for a model name, without touching the filesystem
    pub fn model_path(&self, name: &str) -> ModelResult<PathBuf> {
        let descriptor = resolve_any(&self.catalog, name)?;
        let cache = self.cache(&self.settings());
        Ok(cache.path_for(descriptor.category, &descriptor.filename))
    }

    pub fn list_available_models(&self) -> AvailableModels {
        self.catalog.available()
    }

    /// Status of every core model plus every file present in the stat cache
    pub fn check_cache_status(&self) -> Vec<CacheStatusEntry> {
        let cache = self.cache(&self.settings());
        let mut status = Vec::new();

        for model in self.catalog.core_models() {
            let filename = model.filename();
            let path = cache.path_for(ModelCategory::Core, &filename);
            let entry = cache.entry(ModelCategory::Core, &filename);
            status.push(CacheStatusEntry {
                model: model.name.clone(),
                category: ModelCategory::Core,
                cached: entry.is_some(),
                size_mb: entry.as_ref().map(|e| bytes_to_mb(e.size_bytes)).unwrap_or(0.0),
                path,
                modified: entry.and_then(|e| e.modified),
            });
        }

        for filename in cache.list(ModelCategory::Stat) {
            let Some(entry) = cache.entry(ModelCategory::Stat, &filename) else {
                continue;
            };
            let model = filename
                .strip_suffix(".rds")
                .unwrap_or(&filename)
                .to_string();
            status.push(CacheStatusEntry {
                model,
                category: ModelCategory::Stat,
                cached: true,
                size_mb: bytes_to_mb(entry.size_bytes),
                path: entry.path,
                modified: entry.modified,
            });
        }

        status
    }

    /// Clear the cache for `scope`, one of `all`, `core` or `stat`
    ///
    /// An unrecognised scope fails before anything is deleted.
    pub fn clear_cache(&self, scope: &str) -> ModelResult<ClearReport> {
        let scope: CacheScope = scope.parse()?;
        self.clear_cache_scope(scope)
    }

    pub fn clear_cache_scope(&self, scope: CacheScope) -> ModelResult<ClearReport> {
        let cache = self.cache(&self.settings());
        let files_removed = cache.clear(scope)?;

        tracing::info!(scope = %scope, files_removed, root = ?cache.root(), "Cache cleared");
        metrics::record_cache_cleared(&scope.to_string(), files_removed);

        Ok(ClearReport {
            scope,
            files_removed,
        })
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(ModelsConfig::default())
    }
}
