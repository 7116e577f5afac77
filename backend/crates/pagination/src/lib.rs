//! Offset pagination primitives shared by list endpoints.
//!
//! A [`PageRequest`] captures the validated `page` and `pageSize` query
//! parameters. Repositories translate it into an offset and limit, and
//! handlers wrap the resulting slice in a [`Paginated`] envelope whose
//! [`PaginationMeta`] tells clients how many pages remain.
//!
//! # Examples
//!
//! ```
//! use pagination::{PageRequest, Paginated};
//!
//! let request = PageRequest::new(2, 10).expect("valid page request");
//! assert_eq!(request.offset(), 10);
//!
//! let page = Paginated::new(vec!["a", "b"], 12, request);
//! assert_eq!(page.meta.total_pages, 2);
//! assert!(!page.meta.has_next);
//! assert!(page.meta.has_prev);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Page number used when the client does not supply one.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the client does not supply one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page sizes accepted by list endpoints.
pub const ALLOWED_PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];

/// Validation failures raised when building a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// Pages are numbered from one.
    #[error("page must be greater than or equal to 1, got {page}")]
    PageOutOfRange {
        /// The rejected page number.
        page: u32,
    },
    /// The page size is not one of [`ALLOWED_PAGE_SIZES`].
    #[error("page size must be one of 10, 25, 50 or 100, got {page_size}")]
    UnsupportedPageSize {
        /// The rejected page size.
        page_size: u32,
    },
}

/// Validated page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Validate and construct a page request.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when `page` is zero or `page_size` is not
    /// an allowed size.
    pub fn new(page: u32, page_size: u32) -> Result<Self, PageRequestError> {
        if page < 1 {
            return Err(PageRequestError::PageOutOfRange { page });
        }
        if !ALLOWED_PAGE_SIZES.contains(&page_size) {
            return Err(PageRequestError::UnsupportedPageSize { page_size });
        }
        Ok(Self { page, page_size })
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of items per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items to skip before the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Maximum number of items on the requested page.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// Page metadata returned alongside list payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Total number of matching items across all pages.
    #[schema(example = 100)]
    pub total: u64,
    /// One-based page number.
    #[schema(example = 1)]
    pub page: u32,
    /// Page size used for the query.
    #[schema(example = 10)]
    pub limit: u32,
    /// Number of pages needed to list every item.
    #[schema(example = 10)]
    pub total_pages: u64,
    /// Whether another page follows this one.
    pub has_next: bool,
    /// Whether a page precedes this one.
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Derive metadata for `request` given the total number of matches.
    #[must_use]
    pub fn new(total: u64, request: PageRequest) -> Self {
        let limit = u64::from(request.page_size);
        let total_pages = total.div_ceil(limit);
        let page = u64::from(request.page);
        Self {
            total,
            page: request.page,
            limit: request.page_size,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// List payload paired with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items on the requested page.
    pub data: Vec<T>,
    /// Position of this page within the full result set.
    pub meta: PaginationMeta,
}

impl<T> Paginated<T> {
    /// Wrap a page of items.
    #[must_use]
    pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            data,
            meta: PaginationMeta::new(total, request),
        }
    }

    /// Transform every item while keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
