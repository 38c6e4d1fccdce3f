//! Offset/limit pagination over an already filtered list.

use serde::Serialize;
use std::num::NonZeroUsize;

pub const DEFAULT_PAGE: NonZeroUsize = NonZeroUsize::MIN;
pub const DEFAULT_LIMIT: NonZeroUsize = NonZeroUsize::new(10).unwrap();

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageRequest {
    pub page: NonZeroUsize,
    pub limit: NonZeroUsize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    #[must_use]
    pub fn new(page: NonZeroUsize, limit: NonZeroUsize) -> Self {
        Self { page, limit }
    }

    /// Builds a request from raw query values. Anything that is not a positive
    /// integer falls back to the defaults.
    #[must_use]
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        fn parse(value: Option<&str>) -> Option<NonZeroUsize> {
            value?.trim().parse().ok()
        }

        Self {
            page: parse(page).unwrap_or(DEFAULT_PAGE),
            limit: parse(limit).unwrap_or(DEFAULT_LIMIT),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

/// Cuts page `request.page` (1-based) out of `items`. Pages past the end are
/// empty rather than an error.
#[must_use]
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let page = request.page.get();
    let limit = request.limit.get();
    let start = (page - 1).saturating_mul(limit);

    let items = items.into_iter().skip(start).take(limit).collect();

    Page {
        items,
        info: PageInfo {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        },
    }
}
