//! AFL Models - local cache for pre-trained AFL analytics models
//!
//! Resolves logical model names to release assets, serves them from a local
//! cache and downloads them from GitHub releases on a miss.

pub mod catalog;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod store;

pub use catalog::{AvailableModels, Catalog, CoreModel};
pub use config::ModelsConfig;
pub use error::{FetchError, ModelError, ModelResult};
pub use models::{CacheScope, ModelCategory, ModelDescriptor, ModelHandle};
pub use store::{CacheStatusEntry, ClearReport, ModelStore};
