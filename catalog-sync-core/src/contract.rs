//! Seams of the pipeline: the catalog being read and the store being written.
//!
//! Both traits are implemented by real network clients ([`crate::catalog::HttpCatalog`],
//! [`crate::publish::ObjectStorePublisher`]) and by `mockall` mocks, which are
//! exported under the default `test-export-mocks` feature so integration tests
//! and dependent crates can script them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mockall::{automock, predicate::*};

use crate::error::{FetchError, ListingError, PublishError};
use crate::serialize::StagedArtifact;

/// Full detail payload of one catalog entry. Upstream key order is preserved.
pub type ItemRecord = serde_json::Map<String, serde_json::Value>;

/// Pointer to one catalog entry's detail resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReference {
    pub url: String,
}

impl ItemReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// One page of the catalog listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPage {
    pub results: Vec<ItemReference>,
    /// Total number of entries the catalog reports, if it says so.
    #[serde(default)]
    pub count: Option<u64>,
}

/// Where the artifact goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub bucket: String,
    pub key: String,
}

/// What was uploaded, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub bucket: String,
    pub key: String,
    pub bytes: usize,
    pub content_sha256: String,
    pub e_tag: Option<String>,
}

/// Read access to a paginated catalog API.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Request one listing page of at most `limit` entries starting at `offset`.
    async fn list(&self, limit: usize, offset: usize) -> Result<CatalogPage, ListingError>;

    /// Fetch the detail record behind one item URL.
    async fn get(&self, url: &str) -> Result<ItemRecord, FetchError>;
}

/// Write access to the blob store holding the published artifact.
///
/// Implementations overwrite unconditionally: no existence check, no
/// conditional write, no versioning. The artifact is consumed, so a staged
/// temporary file is removed once `publish` returns.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        artifact: StagedArtifact,
        destination: &Destination,
    ) -> Result<PublishReceipt, PublishError>;
}
