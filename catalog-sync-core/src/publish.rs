//! [`Publisher`] backed by any [`ObjectStore`]: S3 in production, the local
//! filesystem for dry runs, memory in tests.
//!
//! An object store instance is bound to one bucket, so the publisher remembers
//! which bucket it serves and refuses destinations naming another one.
//!
//! In-memory artifacts are handed to the store as a single put without copying.
//! Staged files are streamed in chunks through a multipart upload, so the file
//! is never read back into memory as a whole.

use std::sync::Arc;

use async_trait::async_trait;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload, PutResult, WriteMultipart};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

use crate::contract::{Destination, PublishReceipt, Publisher};
use crate::error::PublishError;
use crate::serialize::StagedArtifact;

/// Bytes read from a staged file per write into the multipart upload.
const READ_CHUNK: usize = 1024 * 1024;

/// Upload parts allowed in flight while streaming a staged file.
const MAX_PARTS_IN_FLIGHT: usize = 4;

/// What a finished upload produced: store result, byte count, hex SHA-256.
type Uploaded = (PutResult, usize, String);

pub struct ObjectStorePublisher {
    bucket: String,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStorePublisher {
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket.into(),
            store,
        }
    }

    fn store_error(&self, path: &Path, source: object_store::Error) -> PublishError {
        error!(error = ?source, bucket = %self.bucket, key = %path, "[SYNC][PUBLISH][ERROR] Upload failed");
        PublishError::Store {
            bucket: self.bucket.clone(),
            key: path.to_string(),
            source,
        }
    }

    async fn put_bytes(&self, path: &Path, bytes: Vec<u8>) -> Result<Uploaded, PublishError> {
        let len = bytes.len();
        let content_sha256 = format!("{:x}", Sha256::digest(&bytes));

        let result = self
            .store
            .put(path, PutPayload::from(bytes))
            .await
            .map_err(|e| self.store_error(path, e))?;
        Ok((result, len, content_sha256))
    }

    async fn put_file(&self, path: &Path, file: &NamedTempFile) -> Result<Uploaded, PublishError> {
        let handle = file.reopen().map_err(|e| {
            error!(error = ?e, staged = %file.path().display(), "[SYNC][PUBLISH][ERROR] Failed to reopen staged file");
            PublishError::Staging(e)
        })?;
        let mut reader = tokio::fs::File::from_std(handle);

        let upload = self
            .store
            .put_multipart(path)
            .await
            .map_err(|e| self.store_error(path, e))?;
        let mut writer = WriteMultipart::new(upload);

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_CHUNK];
        let mut total = 0usize;
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    error!(error = ?e, staged = %file.path().display(), "[SYNC][PUBLISH][ERROR] Failed to read staged file");
                    abort(writer, path).await;
                    return Err(PublishError::Staging(e));
                }
            };
            if let Err(e) = writer.wait_for_capacity(MAX_PARTS_IN_FLIGHT).await {
                let err = self.store_error(path, e);
                abort(writer, path).await;
                return Err(err);
            }
            hasher.update(&buf[..n]);
            writer.write(&buf[..n]);
            total += n;
        }

        debug!(key = %path, bytes = total, "[SYNC][PUBLISH] Staged file streamed, completing upload");
        let result = writer
            .finish()
            .await
            .map_err(|e| self.store_error(path, e))?;
        Ok((result, total, format!("{:x}", hasher.finalize())))
    }
}

async fn abort(writer: WriteMultipart, path: &Path) {
    if let Err(e) = writer.abort().await {
        warn!(error = ?e, key = %path, "[SYNC][PUBLISH] Failed to abort multipart upload");
    }
}

#[async_trait]
impl Publisher for ObjectStorePublisher {
    async fn publish(
        &self,
        artifact: StagedArtifact,
        destination: &Destination,
    ) -> Result<PublishReceipt, PublishError> {
        if destination.bucket != self.bucket {
            error!(
                expected = %self.bucket,
                actual = %destination.bucket,
                "[SYNC][PUBLISH][ERROR] Destination bucket is not served by this publisher"
            );
            return Err(PublishError::BucketMismatch {
                expected: self.bucket.clone(),
                actual: destination.bucket.clone(),
            });
        }

        let path = Path::parse(&destination.key).map_err(|e| {
            error!(error = ?e, key = %destination.key, "[SYNC][PUBLISH][ERROR] Invalid destination key");
            PublishError::InvalidKey {
                key: destination.key.clone(),
                reason: e.to_string(),
            }
        })?;

        info!(
            bucket = %self.bucket,
            key = %path,
            bytes = artifact.len(),
            "[SYNC][PUBLISH] Uploading artifact (overwrites any existing object)"
        );

        let (result, bytes, content_sha256) = match artifact {
            StagedArtifact::Memory(bytes) => self.put_bytes(&path, bytes).await?,
            // Multipart needs at least one part on some backends.
            StagedArtifact::File { len: 0, .. } => self.put_bytes(&path, Vec::new()).await?,
            StagedArtifact::File { file, .. } => self.put_file(&path, &file).await?,
        };

        info!(
            bucket = %self.bucket,
            key = %path,
            bytes,
            content_sha256 = %content_sha256,
            e_tag = ?result.e_tag,
            "[SYNC][PUBLISH] Upload complete"
        );

        Ok(PublishReceipt {
            bucket: self.bucket.clone(),
            key: destination.key.clone(),
            bytes,
            content_sha256,
            e_tag: result.e_tag,
        })
    }
}
