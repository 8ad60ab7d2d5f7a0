//! Configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory name used under the platform cache location
pub const APP_CACHE_DIR: &str = "afl-models";

/// Release tag holding the core models
pub const CORE_TAG: &str = "core-models";

/// Release tag holding the per-statistic models
pub const STAT_TAG: &str = "stat-models";

/// Model store configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    /// Cache root override. When unset the platform cache directory is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Release repository as `owner/name`
    pub repository: String,

    /// Token for the GitHub API transport
    #[serde(skip_serializing)]
    pub github_token: Option<String>,

    /// Host used to build direct release download URLs
    pub download_host: String,

    /// GitHub REST API base URL
    pub api_host: String,

    pub request_timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            repository: default_repository(),
            github_token: None,
            download_host: default_download_host(),
            api_host: default_api_host(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ModelsConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides on top of this config
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = non_empty_env("AFL_MODELS_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(repo) = non_empty_env("AFL_MODELS_REPO") {
            self.repository = repo;
        }
        if let Some(host) = non_empty_env("AFL_MODELS_DOWNLOAD_HOST") {
            self.download_host = host;
        }
        if let Some(host) = non_empty_env("AFL_MODELS_API_HOST") {
            self.api_host = host;
        }
        if self.github_token.is_none() {
            self.github_token = non_empty_env("GITHUB_TOKEN").or_else(|| non_empty_env("GH_TOKEN"));
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let mut parts = self.repository.split('/');
        let valid_repo = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !valid_repo {
            anyhow::bail!(
                "Repository must be of the form 'owner/name' (got '{}')",
                self.repository
            );
        }

        for (field, host) in [
            ("download_host", &self.download_host),
            ("api_host", &self.api_host),
        ] {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                anyhow::bail!("{} must be an http(s) URL (got '{}')", field, host);
            }
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Resolve the cache root
    ///
    /// Checks in order:
    /// 1. `cache_dir` override
    /// 2. `<platform cache dir>/afl-models`
    /// 3. `<temp dir>/afl-models`
    pub fn cache_root(&self) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }

        dirs::cache_dir()
            .map(|d| d.join(APP_CACHE_DIR))
            .unwrap_or_else(|| std::env::temp_dir().join(APP_CACHE_DIR))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Default functions
fn default_repository() -> String {
    "afl-analytics/afl-models".to_string()
}
fn default_download_host() -> String {
    "https://github.com".to_string()
}
fn default_api_host() -> String {
    "https://api.github.com".to_string()
}
fn default_request_timeout() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = ModelsConfig::default();
        assert_eq!(config.repository, "afl-analytics/afl-models");
        assert_eq!(config.download_host, "https://github.com");
        assert_eq!(config.request_timeout_secs, 300);
        assert!(config.cache_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_repository_validation() {
        for repo in ["", "owner", "owner/", "/name", "a/b/c"] {
            let config = ModelsConfig {
                repository: repo.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "accepted '{}'", repo);
        }
    }

    #[test]
    fn test_host_validation() {
        let config = ModelsConfig {
            download_host: "github.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_validation() {
        let config = ModelsConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_root_override() {
        let config = ModelsConfig {
            cache_dir: Some(PathBuf::from("/tmp/custom-cache")),
            ..Default::default()
        };
        assert_eq!(config.cache_root(), PathBuf::from("/tmp/custom-cache"));
    }

    #[test]
    fn test_cache_root_default_ends_with_app_dir() {
        let config = ModelsConfig::default();
        assert!(config.cache_root().ends_with(APP_CACHE_DIR));
    }

    #[test]
    #[serial]
    fn test_load_from_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("models.toml");
        std::fs::write(
            &path,
            "repository = \"someone/footy-models\"\ncache_dir = \"/var/cache/footy\"\n",
        )
        .unwrap();

        let config = ModelsConfig::load(Some(path)).unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/footy")));
        // Unset fields fall back to defaults
        assert_eq!(config.api_host, "https://api.github.com");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ModelsConfig::load(Some(PathBuf::from("/nonexistent/models.toml"))).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        unsafe {
            std::env::set_var("AFL_MODELS_REPO", "override/repo");
            std::env::set_var("AFL_MODELS_CACHE_DIR", "/tmp/env-cache");
        }

        let config = ModelsConfig::default().with_env_overrides();

        unsafe {
            std::env::remove_var("AFL_MODELS_REPO");
            std::env::remove_var("AFL_MODELS_CACHE_DIR");
        }

        assert_eq!(config.repository, "override/repo");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/env-cache")));
    }

    #[test]
    fn test_token_not_serialized() {
        let config = ModelsConfig {
            github_token: Some("secret".to_string()),
            ..Default::default()
        };
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("secret"));
    }
}
