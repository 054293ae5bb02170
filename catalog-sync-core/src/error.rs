//! Error taxonomy of a sync run, one type per pipeline stage.
//!
//! Every stage fails fast: the first error aborts the run and nothing is
//! published. [`SyncError`] wraps the stage errors so callers and monitoring
//! can tell which stage failed via [`SyncError::stage`].

use std::time::Duration;
use thiserror::Error;

/// The catalog listing call failed or returned something unusable.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("page limit must be positive")]
    InvalidPageLimit,

    #[error("listing request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("listing endpoint {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("listing response from {url} is malformed: {reason}")]
    Malformed { url: String, reason: String },
}

/// A single detail fetch failed. Always names the URL that failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetching {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("record at {url} is not a valid JSON object: {reason}")]
    InvalidBody { url: String, reason: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::InvalidBody { url, .. } => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("failed to encode record as JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid destination key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("publisher serves bucket {expected:?}, destination asks for {actual:?}")]
    BucketMismatch { expected: String, actual: String },

    #[error("failed to read staged artifact: {0}")]
    Staging(#[source] std::io::Error),

    #[error("upload to {bucket}/{key} failed: {source}")]
    Store {
        bucket: String,
        key: String,
        #[source]
        source: object_store::Error,
    },
}

/// Failure of a whole run, tagged with the stage that caused it.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl SyncError {
    pub fn stage(&self) -> &'static str {
        match self {
            SyncError::Listing(_) => "listing",
            SyncError::Fetch(_) => "fetch",
            SyncError::Serialization(_) => "serialization",
            SyncError::Publish(_) => "publish",
            SyncError::DeadlineExceeded(_) => "deadline",
        }
    }
}
