//! Release asset downloads
//!
//! A fetch walks an ordered list of transports and stops at the first one
//! that leaves a non-empty file at the destination:
//! 1. [`GithubApiTransport`] - GitHub REST API, authenticated when a token is configured
//! 2. [`DirectUrlTransport`] - plain `https://<host>/<owner>/<name>/releases/download/<tag>/<file>`
//!
//! Each transport is attempted exactly once. There is no retry or backoff.

use crate::config::ModelsConfig;
use crate::error::{FetchError, ModelError, ModelResult};
use crate::metrics;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("afl-models/", env!("CARGO_PKG_VERSION"));

const PART_SUFFIX: &str = ".part";
const DOWNLOAD_SUFFIX: &str = ".download";

/// Suffixes of in-flight download files written beside cache entries
pub(crate) const STAGING_SUFFIXES: [&str; 2] = [PART_SUFFIX, DOWNLOAD_SUFFIX];

/// An asset in the remote release store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// `owner/name`
    pub repository: String,
    pub tag: String,
    pub filename: String,
}

impl ReleaseAsset {
    pub fn new(
        repository: impl Into<String>,
        tag: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
            filename: filename.into(),
        }
    }

    /// Direct download URL under `host`
    ///
    /// e.g. `https://github.com/owner/name/releases/download/core-models/ep_model.rds`
    pub fn direct_url(&self, host: &str) -> String {
        format!(
            "{}/{}/releases/download/{}/{}",
            host.trim_end_matches('/'),
            encode_repository(&self.repository),
            urlencoding::encode(&self.tag),
            urlencoding::encode(&self.filename)
        )
    }
}

/// Percent-encode each half of `owner/name`, keeping the separator
fn encode_repository(repository: &str) -> String {
    repository
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// A single way of retrieving a release asset
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short label used in logs, metrics and failure reports
    fn label(&self) -> &str;

    /// Download `asset` so that it ends up at `destination`
    async fn attempt(&self, asset: &ReleaseAsset, destination: &Path) -> Result<(), String>;
}

/// Build the shared HTTP client
pub fn http_client(timeout_secs: u64) -> ModelResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ModelError::Config(format!("Failed to create HTTP client: {}", e)))
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    assets: Vec<RemoteAsset>,
}

#[derive(Debug, Deserialize)]
struct RemoteAsset {
    name: String,
    url: String,
}

/// Primary transport: the GitHub releases REST API
///
/// Looks up the release by tag, finds the asset by name, downloads it into a
/// `.part` staging file next to the destination and renames it into place.
pub struct GithubApiTransport {
    client: reqwest::Client,
    api_host: String,
    token: Option<String>,
}

impl GithubApiTransport {
    pub const LABEL: &'static str = "github-api";

    pub fn new(client: reqwest::Client, api_host: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_host: api_host.into(),
            token,
        }
    }

    fn get(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn find_asset_url(&self, asset: &ReleaseAsset) -> Result<String, String> {
        let release_url = format!(
            "{}/repos/{}/releases/tags/{}",
            self.api_host.trim_end_matches('/'),
            encode_repository(&asset.repository),
            urlencoding::encode(&asset.tag)
        );

        tracing::debug!(url = %release_url, "Looking up release");

        let release: Release = self
            .get(&release_url, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| format!("Failed to query release {}: {}", asset.tag, e))?
            .error_for_status()
            .map_err(|e| format!("Failed to query release {}: {}", asset.tag, e))?
            .json()
            .await
            .map_err(|e| format!("Failed to parse release {}: {}", asset.tag, e))?;

        release
            .assets
            .into_iter()
            .find(|a| a.name == asset.filename)
            .map(|a| a.url)
            .ok_or_else(|| {
                format!(
                    "Asset {} not found in release {} of {}",
                    asset.filename, asset.tag, asset.repository
                )
            })
    }
}

#[async_trait]
impl Transport for GithubApiTransport {
    fn label(&self) -> &str {
        Self::LABEL
    }

    async fn attempt(&self, asset: &ReleaseAsset, destination: &Path) -> Result<(), String> {
        let asset_url = self.find_asset_url(asset).await?;
        let staging = staging_path(destination);

        let result = async {
            let response = self
                .get(&asset_url, "application/octet-stream")
                .send()
                .await
                .map_err(|e| format!("Failed to download {}: {}", asset.filename, e))?
                .error_for_status()
                .map_err(|e| format!("Failed to download {}: {}", asset.filename, e))?;

            let written = write_response(response, &staging).await?;
            if written == 0 {
                return Err(format!("Downloaded {} is empty", asset.filename));
            }

            tokio::fs::rename(&staging, destination)
                .await
                .map_err(|e| format!("Failed to move {:?} into cache: {}", staging, e))
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&staging).await;
        }

        result
    }
}

/// Secondary transport: an unauthenticated GET of the direct download URL
pub struct DirectUrlTransport {
    client: reqwest::Client,
    host: String,
}

impl DirectUrlTransport {
    pub const LABEL: &'static str = "direct-url";

    pub fn new(client: reqwest::Client, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }
}

#[async_trait]
impl Transport for DirectUrlTransport {
    fn label(&self) -> &str {
        Self::LABEL
    }

    async fn attempt(&self, asset: &ReleaseAsset, destination: &Path) -> Result<(), String> {
        let url = asset.direct_url(&self.host);
        tracing::debug!(url = %url, "Downloading from direct URL");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Failed to download {}: {}", url, e))?
            .error_for_status()
            .map_err(|e| format!("Failed to download {}: {}", url, e))?;

        let written = match write_response(response, destination).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(destination).await;
                return Err(e);
            }
        };

        if written == 0 {
            let _ = tokio::fs::remove_file(destination).await;
            return Err(format!("Downloaded file from {} is empty", url));
        }

        Ok(())
    }
}

/// Stream a response body to `path`, returning the number of bytes written
async fn write_response(response: reqwest::Response, path: &Path) -> Result<u64, String> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| format!("Failed to create {:?}: {}", path, e))?;

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("Failed reading response body: {}", e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("Failed to write {:?}: {}", path, e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| format!("Failed to write {:?}: {}", path, e))?;

    Ok(written)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn staging_path(destination: &Path) -> PathBuf {
    with_suffix(destination, PART_SUFFIX)
}

fn download_path(destination: &Path) -> PathBuf {
    with_suffix(destination, DOWNLOAD_SUFFIX)
}

/// Ordered transport chain
pub struct RemoteFetcher {
    transports: Vec<Box<dyn Transport>>,
}

impl RemoteFetcher {
    pub fn new(transports: Vec<Box<dyn Transport>>) -> Self {
        Self { transports }
    }

    /// GitHub API first, direct URL second
    pub fn from_config(config: &ModelsConfig) -> ModelResult<Self> {
        let client = http_client(config.request_timeout_secs)?;
        Ok(Self::new(vec![
            Box::new(GithubApiTransport::new(
                client.clone(),
                config.api_host.clone(),
                config.github_token.clone(),
            )),
            Box::new(DirectUrlTransport::new(client, config.download_host.clone())),
        ]))
    }

    pub fn transport_labels(&self) -> Vec<&str> {
        self.transports.iter().map(|t| t.label()).collect()
    }

    /// Try each transport in order until one produces a non-empty file
    ///
    /// Transports write to a `.download` file beside `destination`, which only
    /// replaces `destination` once a transport has succeeded. A failed fetch
    /// therefore never disturbs an existing cache entry.
    ///
    /// Returns the label of the transport that succeeded.
    pub async fn fetch(&self, asset: &ReleaseAsset, destination: &Path) -> Result<String, FetchError> {
        let target = download_path(destination);
        let mut failures = FetchError::default();

        for transport in &self.transports {
            let label = transport.label();
            tracing::info!(
                transport = %label,
                repository = %asset.repository,
                tag = %asset.tag,
                filename = %asset.filename,
                "Fetching release asset"
            );

            let outcome = match transport.attempt(asset, &target).await {
                Ok(()) => match tokio::fs::metadata(&target).await {
                    Ok(m) if m.is_file() && m.len() > 0 => tokio::fs::rename(&target, destination)
                        .await
                        .map_err(|e| format!("Failed to move {:?} into cache: {}", target, e)),
                    _ => Err("transport reported success but produced no file".to_string()),
                },
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    metrics::record_download(label, "success");
                    return Ok(label.to_string());
                }
                Err(message) => {
                    let _ = tokio::fs::remove_file(&target).await;
                    metrics::record_download(label, "failure");
                    tracing::warn!(
                        transport = %label,
                        filename = %asset.filename,
                        error = %message,
                        "Transport failed"
                    );
                    failures.push(label, message);
                }
            }
        }

        Err(failures)
    }
}
