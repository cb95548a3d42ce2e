//! Opaque cursor and pagination envelope primitives shared by list endpoints.
//!
//! List endpoints accept `page`/`limit` query parameters and answer with a
//! [`Page`] envelope carrying the items, the echoed request, the total row
//! count, and an opaque continuation cursor for the next page. Cursors are
//! URL-safe base64 over a private JSON payload so clients cannot construct or
//! reinterpret them; a tampered cursor decodes to
//! [`PageRequestError::InvalidCursor`].

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Limit applied when the client does not send one.
pub const DEFAULT_LIMIT: u32 = 20;

/// Upper bound on the page size accepted from clients.
pub const MAX_LIMIT: u32 = 100;

/// Validation failures for incoming pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PageRequestError {
    /// Page numbering is 1-based; page 0 does not exist.
    #[error("page numbers start at 1")]
    ZeroPage,
    /// A page of zero rows is never useful and usually a client bug.
    #[error("limit must be at least 1")]
    ZeroLimit,
    /// The requested page size exceeds [`MAX_LIMIT`].
    #[error("limit must be at most {max}")]
    LimitTooLarge {
        /// The maximum page size the server accepts.
        max: u32,
    },
    /// The continuation cursor failed to decode or validate.
    #[error("cursor is not valid")]
    InvalidCursor,
}

/// A validated pagination request.
///
/// Construct via [`PageRequest::new`] or [`PageRequest::from_params`]; both
/// enforce the 1-based page numbering and the `1..=MAX_LIMIT` size bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

/// Private cursor payload. Field names are deliberately terse: the payload is
/// an implementation detail hidden behind base64.
#[derive(Serialize, Deserialize)]
struct CursorPayload {
    p: u32,
    l: u32,
}

impl PageRequest {
    /// Validate an explicit page number and limit.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError::ZeroPage`], [`PageRequestError::ZeroLimit`]
    /// or [`PageRequestError::LimitTooLarge`] when the bounds are violated.
    pub const fn new(page: u32, limit: u32) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::ZeroPage);
        }
        if limit == 0 {
            return Err(PageRequestError::ZeroLimit);
        }
        if limit > MAX_LIMIT {
            return Err(PageRequestError::LimitTooLarge { max: MAX_LIMIT });
        }
        Ok(Self { page, limit })
    }

    /// Build a request from optional query parameters, applying defaults.
    ///
    /// A missing page defaults to 1 and a missing limit to [`DEFAULT_LIMIT`].
    ///
    /// # Errors
    ///
    /// Propagates the validation errors of [`PageRequest::new`].
    pub const fn from_params(
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Self, PageRequestError> {
        let page = match page {
            Some(value) => value,
            None => 1,
        };
        let limit = match limit {
            Some(value) => value,
            None => DEFAULT_LIMIT,
        };
        Self::new(page, limit)
    }

    /// The first page with the default limit.
    #[must_use]
    pub const fn first() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Validated page size.
    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Row offset for SQL `OFFSET` clauses.
    #[must_use]
    pub const fn offset(self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// The request for the following page, keeping the same limit.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            limit: self.limit,
        }
    }

    /// Encode this request as an opaque continuation cursor.
    #[must_use]
    pub fn to_cursor(self) -> String {
        let payload = CursorPayload {
            p: self.page,
            l: self.limit,
        };
        match serde_json::to_vec(&payload) {
            Ok(bytes) => URL_SAFE_NO_PAD.encode(bytes),
            // Serialising two integers cannot fail; an empty cursor is the
            // safe fallback and decodes to InvalidCursor.
            Err(_) => String::new(),
        }
    }

    /// Decode a continuation cursor produced by [`PageRequest::to_cursor`].
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError::InvalidCursor`] for any cursor this
    /// library did not mint, including structurally valid payloads whose
    /// values violate the request bounds.
    pub fn from_cursor(cursor: &str) -> Result<Self, PageRequestError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|_| PageRequestError::InvalidCursor)?;
        let payload: CursorPayload =
            serde_json::from_slice(&bytes).map_err(|_| PageRequestError::InvalidCursor)?;
        Self::new(payload.p, payload.l).map_err(|_| PageRequestError::InvalidCursor)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// Response envelope for a single page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Page<T> {
    /// Items on this page, already ordered by the endpoint's sort contract.
    pub items: Vec<T>,
    /// Echo of the 1-based page number that produced this envelope.
    pub page: u32,
    /// Echo of the page size that produced this envelope.
    pub limit: u32,
    /// Total number of rows across all pages.
    pub total: u64,
    /// Opaque cursor for the next page; absent on the final page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Assemble an envelope from fetched items, the request, and the total.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        let consumed = u64::from(request.page()) * u64::from(request.limit());
        let next_cursor = (consumed < total).then(|| request.next().to_cursor());
        Self {
            items,
            page: request.page(),
            limit: request.limit(),
            total,
            next_cursor,
        }
    }

    /// Transform the items while preserving the envelope metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            next_cursor: self.next_cursor,
        }
    }
}
