#![doc = "Object store wiring for the CLI: turns the configured backend into a core `ObjectStorePublisher`."]
//
//! # Publisher construction
//!
//! The core crate only knows the [`Publisher`] trait and a publisher generic over any
//! `ObjectStore`. This module builds the concrete store:
//!
//! - `s3`: [`AmazonS3Builder::from_env`] so that `AWS_ACCESS_KEY_ID`,
//!   `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`, `AWS_DEFAULT_REGION` and friends are
//!   read from the environment; region and endpoint from YAML take precedence.
//! - `local`: a [`LocalFileSystem`] rooted at `<root>/<bucket>`, for dry runs.
//!
//! [`Publisher`]: catalog_sync_core::contract::Publisher

use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_sync_core::publish::ObjectStorePublisher;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;

use crate::load_config::StorageBackend;

pub fn build_publisher(bucket: &str, backend: &StorageBackend) -> Result<ObjectStorePublisher> {
    let store: Arc<dyn ObjectStore> = match backend {
        StorageBackend::S3 { region, endpoint } => {
            let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
            if let Some(region) = region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = endpoint {
                builder = builder
                    .with_endpoint(endpoint)
                    .with_allow_http(endpoint.starts_with("http://"));
            }
            let store = builder.build().map_err(|e| {
                tracing::error!(error = ?e, bucket, "Failed to build S3 client");
                e
            })?;
            tracing::info!(
                bucket,
                region = ?region,
                endpoint = ?endpoint,
                "Initialised S3 object store from environment"
            );
            Arc::new(store)
        }
        StorageBackend::Local { root } => {
            let dir = root.join(bucket);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create local bucket directory {dir:?}"))?;
            let store = LocalFileSystem::new_with_prefix(&dir)
                .with_context(|| format!("Failed to open local bucket directory {dir:?}"))?;
            tracing::info!(bucket, root = %dir.display(), "Initialised local object store");
            Arc::new(store)
        }
    };

    Ok(ObjectStorePublisher::new(bucket, store))
}
