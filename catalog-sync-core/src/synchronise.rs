//! High-level pipeline: orchestrates list → fetch → serialize → publish for one run.
//!
//! # Major Types
//! - [`SyncReport`]: what a successful run listed, fetched and uploaded
//! - [`RunReport`]: success/failure outcome of a run, as seen by the invoking harness
//! - [`InvocationResponse`]: the JSON response handed back to that harness
//!
//! # Responsibilities
//! - Strictly sequential stages; only the fetch stage is concurrent internally
//! - Fail-fast: the first error in any stage ends the run, nothing is published
//! - Optional overall deadline around the whole run
//! - Tracing span per run carrying a fresh `run_id`
//!
//! # Navigation
//! - Main entrypoints: [`synchronise`] (typed result) and [`run`] (report)

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::contract::{Catalog, PublishReceipt, Publisher};
use crate::error::SyncError;
use crate::fetch::fetch_all;
use crate::listing::list_item_references;
use crate::serialize::stage;

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub references: usize,
    pub records: usize,
    pub artifact_bytes: u64,
    pub receipt: PublishReceipt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub detail: String,
}

impl RunReport {
    pub fn success() -> Self {
        Self {
            status: RunStatus::Success,
            detail: "Success".to_string(),
        }
    }

    pub fn failure(err: &SyncError) -> Self {
        Self {
            status: RunStatus::Failure,
            detail: format!("{}: {}", err.stage(), err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn into_response(self) -> InvocationResponse {
        let status_code = match self.status {
            RunStatus::Success => "200",
            RunStatus::Failure => "500",
        };
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        InvocationResponse {
            status_code: status_code.to_string(),
            body: self.detail,
            headers,
        }
    }
}

/// Response shape expected by the scheduling harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

/// Run the full pipeline once, returning a typed error naming the failed stage.
pub async fn synchronise<C, P>(
    config: &SyncConfig,
    catalog: &C,
    publisher: &P,
) -> Result<SyncReport, SyncError>
where
    C: Catalog + ?Sized,
    P: Publisher + ?Sized,
{
    let pipeline = pipeline(config, catalog, publisher);
    match config.run_deadline {
        Some(deadline) => match tokio::time::timeout(deadline, pipeline).await {
            Ok(result) => result,
            Err(_) => {
                error!(deadline = ?deadline, "[SYNC][ERROR] Run deadline exceeded, aborting");
                Err(SyncError::DeadlineExceeded(deadline))
            }
        },
        None => pipeline.await,
    }
}

async fn pipeline<C, P>(
    config: &SyncConfig,
    catalog: &C,
    publisher: &P,
) -> Result<SyncReport, SyncError>
where
    C: Catalog + ?Sized,
    P: Publisher + ?Sized,
{
    info!("[SYNC] Starting catalog synchronisation");

    let refs = list_item_references(catalog, config.catalog.page_limit).await?;
    let records = fetch_all(catalog, &refs, config.fetch.concurrency).await?;
    let record_count = records.len();
    let artifact = stage(&records, &config.staging)?;
    drop(records);
    let artifact_bytes = artifact.len();

    // The publisher consumes the artifact; a staged file is gone once this returns.
    let receipt = publisher.publish(artifact, &config.destination).await?;

    info!(
        references = refs.len(),
        records = record_count,
        bytes = artifact_bytes,
        bucket = %receipt.bucket,
        key = %receipt.key,
        "[SYNC] Synchronisation complete"
    );

    Ok(SyncReport {
        references: refs.len(),
        records: record_count,
        artifact_bytes,
        receipt,
    })
}

/// Entry point for the invoking harness: runs the pipeline and reports the outcome.
pub async fn run<C, P>(config: &SyncConfig, catalog: &C, publisher: &P) -> RunReport
where
    C: Catalog + ?Sized,
    P: Publisher + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("sync_run", %run_id);

    async {
        match synchronise(config, catalog, publisher).await {
            Ok(report) => {
                info!(?report, "[SYNC] Run succeeded");
                RunReport::success()
            }
            Err(e) => {
                error!(stage = e.stage(), error = %e, "[SYNC][ERROR] Run failed");
                RunReport::failure(&e)
            }
        }
    }
    .instrument(span)
    .await
}
