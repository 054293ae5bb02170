use tracing::{error, info, warn};

use crate::contract::{Catalog, ItemReference};
use crate::error::ListingError;

/// List the catalog in one bounded call and return the item URLs in catalog order.
///
/// Entries beyond `page_limit` are not requested; there is no pagination. When
/// the catalog reports a larger total, a warning is logged and the truncated
/// listing is returned as is.
pub async fn list_item_references<C>(
    catalog: &C,
    page_limit: usize,
) -> Result<Vec<ItemReference>, ListingError>
where
    C: Catalog + ?Sized,
{
    if page_limit == 0 {
        error!("[SYNC][LIST] Refusing to list with a page limit of zero");
        return Err(ListingError::InvalidPageLimit);
    }

    let page = catalog.list(page_limit, 0).await?;
    let listed = page.results.len();

    if let Some(total) = page.count {
        if total > listed as u64 {
            warn!(
                total,
                listed,
                page_limit,
                "[SYNC][LIST] Catalog holds more entries than one page returned; the rest are skipped"
            );
        }
    }

    info!(count = listed, "[SYNC][LIST] Listed item references");
    Ok(page.results)
}
