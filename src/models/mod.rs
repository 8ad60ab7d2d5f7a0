//! Model management module
//!
//! Provides functionality for:
//! - Resolving logical model names to release assets
//! - Managing the local model cache
//! - Downloading models from GitHub releases
//! - Decoding cached `.rds` files
//! - Loading models with cache fallback and corruption recovery

pub mod cache;
pub mod download;
pub mod loader;
pub mod rds;
pub mod resolver;

pub use cache::{CacheEntry, CacheScope, CacheStore, bytes_to_mb};
pub use download::{DirectUrlTransport, GithubApiTransport, ReleaseAsset, RemoteFetcher, Transport};
pub use loader::{LoadState, ModelLoader};
pub use rds::{DecodeError, ModelDecoder, ModelHandle, RdsCompression, RdsDecoder, RdsHeader};
pub use resolver::{ModelCategory, ModelDescriptor, is_valid_stat_name};
