//! HTTP implementation of [`Catalog`] on top of a single shared `reqwest::Client`.
//!
//! The client (and therefore its connection pool) is created once and only read
//! afterwards, so concurrent detail fetches can share it freely.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::config::CatalogConfig;
use crate::contract::{Catalog, CatalogPage, ItemRecord};
use crate::error::{FetchError, ListingError};

pub struct HttpCatalog {
    client: Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        info!(
            base_url = %config.base_url,
            request_timeout = ?config.request_timeout,
            "Initialised HTTP catalog client"
        );
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn list(&self, limit: usize, offset: usize) -> Result<CatalogPage, ListingError> {
        let url = self.base_url.as_str();
        info!(url = %url, limit, offset, "Fetching catalog listing");

        let resp = self
            .client
            .get(url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "Catalog listing request failed");
                ListingError::Request {
                    url: url.to_string(),
                    source: e,
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Catalog listing returned error status");
            return Err(ListingError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to read catalog listing body");
            ListingError::Request {
                url: url.to_string(),
                source: e,
            }
        })?;

        serde_json::from_slice::<CatalogPage>(&body).map_err(|e| {
            error!(error = ?e, url = %url, "Catalog listing body is not a valid page");
            ListingError::Malformed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })
    }

    async fn get(&self, url: &str) -> Result<ItemRecord, FetchError> {
        debug!(url = %url, "Fetching catalog record");

        let resp = self.client.get(url).send().await.map_err(|e| {
            error!(error = ?e, url = %url, "Record request failed");
            FetchError::Request {
                url: url.to_string(),
                source: e,
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Record endpoint returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to read record body");
            FetchError::Request {
                url: url.to_string(),
                source: e,
            }
        })?;

        // Anything but a JSON object is rejected here, not at serialization time.
        serde_json::from_slice::<ItemRecord>(&body).map_err(|e| {
            error!(error = ?e, url = %url, "Record body is not a JSON object");
            FetchError::InvalidBody {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })
    }
}
