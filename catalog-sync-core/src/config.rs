use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contract::Destination;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2/pokemon";
/// Loosely "everything": the catalog is listed in a single page of this size.
pub const DEFAULT_PAGE_LIMIT: usize = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONCURRENCY: usize = 64;
pub const DEFAULT_KEY: &str = "staging/pokemon/pokemons.json";
pub const DEFAULT_RUN_DEADLINE: Duration = Duration::from_secs(900);

/// Everything one run needs, with secrets already resolved by the caller.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub catalog: CatalogConfig,
    pub fetch: FetchConfig,
    pub destination: Destination,
    pub staging: Staging,
    /// `None` lets a run take as long as it takes.
    pub run_deadline: Option<Duration>,
}

impl SyncConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            catalog: CatalogConfig::default(),
            fetch: FetchConfig::default(),
            destination: Destination {
                bucket: bucket.into(),
                key: DEFAULT_KEY.to_string(),
            },
            staging: Staging::default(),
            run_deadline: Some(DEFAULT_RUN_DEADLINE),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.catalog.base_url,
            page_limit = self.catalog.page_limit,
            concurrency = self.fetch.concurrency,
            bucket = %self.destination.bucket,
            key = %self.destination.key,
            staging = ?self.staging,
            run_deadline = ?self.run_deadline,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub page_limit: usize,
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Upper bound on detail requests in flight at once.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Where the serialized artifact is held between serialization and upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Staging {
    #[default]
    Memory,
    /// A scoped temporary file, removed once the artifact is dropped.
    TempFile {
        #[serde(default)]
        dir: Option<PathBuf>,
    },
}
