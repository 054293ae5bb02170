use futures::{stream, StreamExt, TryStreamExt};
use tracing::{error, info};

use crate::contract::{Catalog, ItemRecord, ItemReference};
use crate::error::FetchError;

/// Fetch every referenced record with at most `concurrency` requests in flight.
///
/// All-or-nothing: the first failed fetch fails the call and no records are
/// returned. Requests still in flight at that point are dropped, and
/// references not yet started are never requested. Output order follows
/// completion, not input order. A `concurrency` of zero is treated as one.
pub async fn fetch_all<C>(
    catalog: &C,
    refs: &[ItemReference],
    concurrency: usize,
) -> Result<Vec<ItemRecord>, FetchError>
where
    C: Catalog + ?Sized,
{
    let concurrency = concurrency.max(1);
    info!(
        count = refs.len(),
        concurrency, "[SYNC][FETCH] Fetching records"
    );

    let records: Vec<ItemRecord> = stream::iter(refs)
        .map(|reference| catalog.get(&reference.url))
        .buffer_unordered(concurrency)
        .try_collect()
        .await
        .map_err(|e| {
            error!(url = %e.url(), error = %e, "[SYNC][FETCH][ERROR] Fetch failed, abandoning remaining requests");
            e
        })?;

    info!(count = records.len(), "[SYNC][FETCH] Fetched all records");
    Ok(records)
}
