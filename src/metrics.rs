//! Cache and download counters
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding application installs a recorder.

use crate::models::ModelCategory;

/// Record a load served from the cache
pub fn record_cache_hit(category: ModelCategory) {
    metrics::counter!("afl_models_cache_hits_total",
        "category" => category.to_string()
    )
    .increment(1);
}

/// Record a load that had to fetch
pub fn record_cache_miss(category: ModelCategory) {
    metrics::counter!("afl_models_cache_misses_total",
        "category" => category.to_string()
    )
    .increment(1);
}

/// Record a transport attempt
pub fn record_download(transport: &str, outcome: &'static str) {
    metrics::counter!("afl_models_downloads_total",
        "transport" => transport.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a cache entry deleted after failing to deserialize
pub fn record_corrupt_cache(category: ModelCategory) {
    metrics::counter!("afl_models_corrupt_cache_total",
        "category" => category.to_string()
    )
    .increment(1);
}

/// Record files removed by a clear
pub fn record_cache_cleared(scope: &str, files: usize) {
    metrics::counter!("afl_models_cache_cleared_files_total",
        "scope" => scope.to_string()
    )
    .increment(files as u64);
}
