//! Logical model name resolution
//!
//! Maps a user-supplied name to the release asset it refers to. Resolution
//! is pure: it only consults the catalog, never the filesystem or network.

use crate::catalog::Catalog;
use crate::config::{CORE_TAG, STAT_TAG};
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model namespace, which also selects the release tag and cache subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCategory {
    Core,
    Stat,
}

impl ModelCategory {
    pub const ALL: [ModelCategory; 2] = [ModelCategory::Core, ModelCategory::Stat];

    /// Release tag the category's assets are published under
    pub fn release_tag(&self) -> &'static str {
        match self {
            Self::Core => CORE_TAG,
            Self::Stat => STAT_TAG,
        }
    }

    /// Subdirectory of the cache root
    pub fn cache_subdir(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Stat => "stat-models",
        }
    }
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core => write!(f, "core"),
            Self::Stat => write!(f, "stat"),
        }
    }
}

/// Resolved form of a logical model name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Canonical short name (`ep`, `goals`)
    pub name: String,
    /// Release asset filename (`ep_model.rds`)
    pub filename: String,
    pub category: ModelCategory,
}

impl ModelDescriptor {
    pub fn tag(&self) -> &'static str {
        self.category.release_tag()
    }
}

/// Check a stat name against `^[a-z_]+$`
pub fn is_valid_stat_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_lowercase() || b == b'_')
}

/// Resolve a core model alias or file stem, case-insensitively
pub fn resolve_core(catalog: &Catalog, name: &str) -> ModelResult<ModelDescriptor> {
    let trimmed = name.trim();
    let model = catalog
        .find_core(trimmed)
        .ok_or_else(|| ModelError::UnknownModel {
            name: name.to_string(),
            valid: catalog.core_names(),
        })?;

    Ok(ModelDescriptor {
        name: model.name.clone(),
        filename: model.filename(),
        category: ModelCategory::Core,
    })
}

/// Resolve a stat model name
///
/// The format check runs before the catalog lookup so that a malformed name
/// is reported as `InvalidName` even if a similar name exists.
pub fn resolve_stat(catalog: &Catalog, name: &str) -> ModelResult<ModelDescriptor> {
    if !is_valid_stat_name(name) {
        return Err(ModelError::InvalidName {
            name: name.to_string(),
        });
    }

    if !catalog.is_stat(name) {
        return Err(ModelError::UnknownModel {
            name: name.to_string(),
            valid: catalog.stat_models().to_vec(),
        });
    }

    Ok(ModelDescriptor {
        name: name.to_string(),
        filename: format!("{}.rds", name),
        category: ModelCategory::Stat,
    })
}

/// Resolve a name against core models first, then stat models
pub fn resolve_any(catalog: &Catalog, name: &str) -> ModelResult<ModelDescriptor> {
    match resolve_core(catalog, name) {
        Ok(descriptor) => Ok(descriptor),
        Err(ModelError::UnknownModel { .. }) => resolve_stat(catalog, name),
        Err(e) => Err(e),
    }
}
