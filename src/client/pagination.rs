//! Walks paged listings into one ordered sequence.

use std::future::Future;

use serde::Deserialize;

/// Cursor block returned alongside every page.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Pagination {
    /// Page the server says it returned.
    #[serde(default)]
    pub current_page: u32,
    /// Last page available for the listing.
    #[serde(default)]
    pub last_page: u32,
    /// Page size used by the server.
    #[serde(default)]
    pub per_page: u32,
    /// Total number of items across all pages.
    #[serde(default)]
    pub total: u64,
}

/// One page of a listing endpoint: `{ data: [...], pagination: {...} }`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Page<T> {
    /// Items on this page, in server order.
    pub data: Vec<T>,
    /// Cursor for the walk.
    #[serde(default)]
    pub pagination: Pagination,
}

/// Fetches page 1, 2, ... until the last page and concatenates the items.
///
/// The walk stops once the requested page number reaches `last_page`, or as
/// soon as a page comes back empty (a server reporting a wrong `last_page`
/// must not cause an endless walk). The first failing page aborts the walk
/// and nothing accumulated so far is returned.
///
/// # Errors
///
/// Returns the error of the first page fetch that fails.
pub async fn collect_pages<T, E, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut page = 1_u32;

    loop {
        let Page { data, pagination } = fetch_page(page).await?;
        let exhausted = data.is_empty();
        items.extend(data);

        if exhausted || page >= pagination.last_page {
            tracing::debug!(pages = page, items = items.len(), "listing complete");
            return Ok(items);
        }
        page = page.saturating_add(1);
    }
}
