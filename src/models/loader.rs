//! Model loading
//!
//! Each load runs a small state machine:
//!
//! ```text
//! CacheCheck --hit--> Deserializing --ok--> Done
//!     |                   ^     \
//!   miss/refresh          |      `--parse error--> (delete entry) Failed
//!     v                   |
//! Fetching --fetched------'
//!     \
//!      `--all transports failed--> Failed
//! ```
//!
//! The cache entry is only ever deleted on a parse failure. A failed fetch
//! leaves whatever was cached before in place.

use super::cache::CacheStore;
use super::download::{ReleaseAsset, RemoteFetcher};
use super::rds::{ModelDecoder, ModelHandle};
use super::resolver::ModelDescriptor;
use crate::error::{FetchError, ModelError, ModelResult};
use crate::metrics;
use std::path::Path;

/// States of a single load request
#[derive(Debug)]
pub enum LoadState {
    CacheCheck,
    Fetching,
    Deserializing,
    Done(ModelHandle),
    Failed(ModelError),
}

impl LoadState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CacheCheck => "cache_check",
            Self::Fetching => "fetching",
            Self::Deserializing => "deserializing",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }
}

/// Per-operation loader bound to a cache root, fetcher and decoder
pub struct ModelLoader<'a> {
    cache: &'a CacheStore,
    fetcher: &'a RemoteFetcher,
    decoder: &'a dyn ModelDecoder,
    repository: &'a str,
}

impl<'a> ModelLoader<'a> {
    pub fn new(
        cache: &'a CacheStore,
        fetcher: &'a RemoteFetcher,
        decoder: &'a dyn ModelDecoder,
        repository: &'a str,
    ) -> Self {
        Self {
            cache,
            fetcher,
            decoder,
            repository,
        }
    }

    /// Load a resolved model, downloading it first on a miss or forced refresh
    pub async fn load(
        &self,
        descriptor: &ModelDescriptor,
        force_refresh: bool,
    ) -> ModelResult<ModelHandle> {
        let path = self
            .cache
            .path_for(descriptor.category, &descriptor.filename);
        let mut state = LoadState::CacheCheck;

        loop {
            let next = match state {
                LoadState::CacheCheck => self.check_cache(descriptor, &path, force_refresh),
                LoadState::Fetching => self.fetch(descriptor, &path).await,
                LoadState::Deserializing => self.deserialize(descriptor, &path).await,
                LoadState::Done(handle) => return Ok(handle),
                LoadState::Failed(err) => return Err(err),
            };

            tracing::trace!(model = %descriptor.name, state = next.name(), "Load transition");
            state = next;
        }
    }

    fn check_cache(
        &self,
        descriptor: &ModelDescriptor,
        path: &Path,
        force_refresh: bool,
    ) -> LoadState {
        let cached = path.is_file();

        if cached && !force_refresh {
            tracing::debug!(model = %descriptor.name, path = ?path, "Cache hit");
            metrics::record_cache_hit(descriptor.category);
            return LoadState::Deserializing;
        }

        if force_refresh {
            tracing::info!(model = %descriptor.name, cached, "Forced refresh requested");
        } else {
            tracing::debug!(model = %descriptor.name, path = ?path, "Cache miss");
        }
        metrics::record_cache_miss(descriptor.category);
        LoadState::Fetching
    }

    async fn fetch(&self, descriptor: &ModelDescriptor, path: &Path) -> LoadState {
        let destination = match self
            .cache
            .prepare_path(descriptor.category, &descriptor.filename)
        {
            Ok(dest) => dest,
            Err(e) => return LoadState::Failed(e),
        };

        let asset = ReleaseAsset::new(self.repository, descriptor.tag(), &descriptor.filename);

        match self.fetcher.fetch(&asset, &destination).await {
            Ok(transport) if path.is_file() => {
                tracing::info!(
                    model = %descriptor.name,
                    transport = %transport,
                    path = ?path,
                    "Model downloaded"
                );
                LoadState::Deserializing
            }
            Ok(transport) => {
                let mut source = FetchError::default();
                source.push(transport, "download finished but the cache file is missing");
                LoadState::Failed(ModelError::DownloadFailed {
                    model: descriptor.name.clone(),
                    source,
                })
            }
            Err(source) => LoadState::Failed(ModelError::DownloadFailed {
                model: descriptor.name.clone(),
                source,
            }),
        }
    }

    async fn deserialize(&self, descriptor: &ModelDescriptor, path: &Path) -> LoadState {
        let decoded = match tokio::fs::read(path).await {
            Ok(bytes) => self
                .decoder
                .decode(&bytes)
                .map(|decoded| (decoded, bytes.len() as u64))
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match decoded {
            Ok((decoded, size_bytes)) => LoadState::Done(ModelHandle {
                descriptor: descriptor.clone(),
                path: path.to_path_buf(),
                size_bytes,
                header: decoded.header,
                payload: decoded.payload,
            }),
            Err(reason) => {
                tracing::warn!(
                    model = %descriptor.name,
                    path = ?path,
                    error = %reason,
                    "Cached model is corrupted, removing it"
                );
                metrics::record_corrupt_cache(descriptor.category);
                if let Err(e) = self.cache.remove(path) {
                    tracing::warn!(path = ?path, error = %e, "Failed to remove corrupted cache entry");
                }
                LoadState::Failed(ModelError::CorruptCache {
                    model: descriptor.name.clone(),
                    path: path.to_path_buf(),
                    reason,
                })
            }
        }
    }
}
