//! Cursor pagination shared by item and thread listings.

use serde::{Deserialize, Serialize};

use crate::store::errors::{StoreError, StoreResult};

/// Listing order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

/// One page of a listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Owned copies of the page entries.
    pub data: Vec<T>,
    /// Whether entries remain beyond this page.
    pub has_more: bool,
    /// Cursor for the next page, set only when `has_more` is true.
    pub after: Option<String>,
}

/// Slice a page out of an already ordered sequence.
///
/// `after` must name an entry of `ordered`; the page starts right after it.
/// An empty cursor counts as no cursor.
/// A `limit` of zero returns the whole remainder. Entries are cloned on the
/// way out so the caller never aliases stored values.
///
/// # Errors
/// Returns the error built by `missing_cursor` when `after` is not found.
pub fn paginate<T, I, E>(
    ordered: &[&T],
    after: Option<&str>,
    limit: usize,
    id_of: I,
    missing_cursor: E,
) -> StoreResult<Page<T>>
where
    T: Clone,
    I: Fn(&T) -> &str,
    E: FnOnce(&str) -> StoreError,
{
    let start = match after.filter(|cursor| !cursor.is_empty()) {
        Some(cursor) => {
            let position = ordered
                .iter()
                .position(|entry| id_of(*entry) == cursor)
                .ok_or_else(|| missing_cursor(cursor))?;
            position + 1
        }
        None => 0,
    };

    let end = if limit == 0 {
        ordered.len()
    } else {
        start.saturating_add(limit).min(ordered.len())
    };

    let slice = &ordered[start..end];
    let has_more = end < ordered.len();
    let next_after = if has_more {
        slice.last().map(|entry| id_of(*entry).to_string())
    } else {
        None
    };

    Ok(Page {
        data: slice.iter().map(|entry| (*entry).clone()).collect(),
        has_more,
        after: next_after,
    })
}
