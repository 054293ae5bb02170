/// `load_config` module: Loads a static YAML config, injects secrets from the environment,
/// and adapts it into the core [`SyncConfig`] plus the storage backend to publish to.
///
/// This module is the only place where untrusted YAML is parsed and mapped to strongly-typed
/// internal structs. The YAML never holds secrets: S3 credentials come from the process
/// environment (optionally seeded from `.env`), and their absence is a startup error.
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are
/// surfaced at the CLI boundary.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use catalog_sync_core::config::{
    CatalogConfig, FetchConfig, Staging, SyncConfig, DEFAULT_BASE_URL, DEFAULT_CONCURRENCY,
    DEFAULT_KEY, DEFAULT_PAGE_LIMIT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RUN_DEADLINE,
};
use catalog_sync_core::contract::Destination;
use serde::Deserialize;
use tracing::{error, info};

/// Environment variables the S3 backend cannot start without.
pub const REQUIRED_S3_SECRETS: [&str; 2] = ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"];

/// Fully resolved configuration for one CLI invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub sync: SyncConfig,
    pub backend: StorageBackend,
}

/// Which object store the artifact is published to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageBackend {
    /// Amazon S3 or an S3-compatible endpoint; credentials from the environment.
    S3 {
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// A local directory; the bucket becomes a subdirectory of `root`.
    Local { root: PathBuf },
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::S3 {
            region: None,
            endpoint: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    catalog: CatalogSection,
    #[serde(default)]
    fetch: FetchSection,
    destination: DestinationSection,
    #[serde(default)]
    staging: Staging,
    #[serde(default = "default_run_deadline_secs")]
    run_deadline_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CatalogSection {
    base_url: String,
    page_limit: usize,
    request_timeout_secs: u64,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FetchSection {
    concurrency: usize,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DestinationSection {
    bucket: String,
    #[serde(default = "default_key")]
    key: String,
    #[serde(default)]
    backend: StorageBackend,
}

fn default_key() -> String {
    DEFAULT_KEY.to_string()
}

fn default_run_deadline_secs() -> Option<u64> {
    Some(DEFAULT_RUN_DEADLINE.as_secs())
}

/// Loads a static YAML config file (no secrets) and checks the environment for required secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.catalog.page_limit == 0 {
        error!("catalog.page_limit must be positive");
        anyhow::bail!("catalog.page_limit must be positive");
    }
    if raw.catalog.request_timeout_secs == 0 {
        error!("catalog.request_timeout_secs must be positive");
        anyhow::bail!("catalog.request_timeout_secs must be positive");
    }
    if raw.run_deadline_secs == Some(0) {
        error!("run_deadline_secs must be positive or null");
        anyhow::bail!("run_deadline_secs must be positive or null");
    }
    if raw.fetch.concurrency == 0 {
        error!("fetch.concurrency must be positive");
        anyhow::bail!("fetch.concurrency must be positive");
    }
    if raw.destination.bucket.trim().is_empty() {
        error!("destination.bucket must not be empty");
        anyhow::bail!("destination.bucket must not be empty");
    }

    if let StorageBackend::S3 { .. } = raw.destination.backend {
        for var in REQUIRED_S3_SECRETS {
            match std::env::var(var) {
                Ok(value) if !value.is_empty() => info!(var, "S3 credential found in env"),
                Ok(_) | Err(_) => {
                    error!(var, "S3 credential environment variable not set");
                    anyhow::bail!("{var} environment variable not set; S3 credentials must be injected via the environment");
                }
            }
        }
    }

    let sync = SyncConfig {
        catalog: CatalogConfig {
            base_url: raw.catalog.base_url,
            page_limit: raw.catalog.page_limit,
            request_timeout: Duration::from_secs(raw.catalog.request_timeout_secs),
        },
        fetch: FetchConfig {
            concurrency: raw.fetch.concurrency,
        },
        destination: Destination {
            bucket: raw.destination.bucket,
            key: raw.destination.key,
        },
        staging: raw.staging,
        run_deadline: raw.run_deadline_secs.map(Duration::from_secs),
    };
    sync.trace_loaded();

    info!(backend = ?raw.destination.backend, "Config loaded and merged successfully");

    Ok(CliConfig {
        sync,
        backend: raw.destination.backend,
    })
}
