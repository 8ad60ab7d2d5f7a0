//! Shared fixtures for integration tests

#![allow(dead_code)]

use afl_models::{ModelStore, ModelsConfig};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;

pub const REPO: &str = "owner/models";

/// Gzip-compressed XDR version 3 `.rds` file wrapping `body`
pub fn sample_rds(body: &[u8]) -> Vec<u8> {
    let mut raw = b"X\n".to_vec();
    raw.extend_from_slice(&3i32.to_be_bytes());
    raw.extend_from_slice(&(4 * 65536 + 4 * 256i32).to_be_bytes());
    raw.extend_from_slice(&(3 * 65536 + 5 * 256i32).to_be_bytes());
    raw.extend_from_slice(&5i32.to_be_bytes());
    raw.extend_from_slice(b"UTF-8");
    raw.extend_from_slice(body);

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).unwrap();
    encoder.finish().unwrap()
}

/// Config pointing both transports at `server_uri` and the cache at `root`
pub fn config(root: &Path, server_uri: &str) -> ModelsConfig {
    ModelsConfig {
        cache_dir: Some(root.to_path_buf()),
        repository: REPO.to_string(),
        github_token: None,
        download_host: server_uri.to_string(),
        api_host: server_uri.to_string(),
        request_timeout_secs: 10,
    }
}

pub fn store(root: &Path, server_uri: &str) -> ModelStore {
    ModelStore::new(config(root, server_uri))
}

pub fn write_file(root: &Path, subdir: &str, name: &str, content: &[u8]) {
    let dir = root.join(subdir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), content).unwrap();
}
