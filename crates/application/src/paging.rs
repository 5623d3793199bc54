use brokerdesk_core::{AppError, AppResult};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page request with a clamped page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Builds a page request, defaulting and clamping missing or out-of-range values.
    #[must_use]
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Returns the one-based page number.
    #[must_use]
    pub fn page(self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub fn page_size(self) -> u32 {
        self.page_size
    }

    /// Returns the number of rows skipped before this page.
    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results with totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    /// Rows of the current page.
    pub items: Vec<T>,
    /// Total matching rows across all pages.
    pub total_count: u64,
    /// One-based page number.
    pub page: u32,
    /// Page size used for the query.
    pub page_size: u32,
    /// Number of pages for `total_count`.
    pub total_pages: u64,
}

impl<T> Paged<T> {
    /// Wraps a page of rows.
    #[must_use]
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: request.page(),
            page_size: request.page_size(),
            total_pages: total_count.div_ceil(u64::from(request.page_size())),
        }
    }

    /// Maps every row, keeping the totals.
    #[must_use]
    pub fn map<U>(self, mapper: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(mapper).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// Sort key and direction. `field` is always one of a whitelisted set of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    /// Whitelisted field name.
    pub field: &'static str,
    /// Sort descending when set.
    pub descending: bool,
}

impl SortOrder {
    /// Ascending order on a field.
    #[must_use]
    pub const fn asc(field: &'static str) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    /// Descending order on a field.
    #[must_use]
    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Sortable fields of one listing with its default order.
#[derive(Debug, Clone, Copy)]
pub struct SortFields {
    /// Accepted field names.
    pub allowed: &'static [&'static str],
    /// Order used when the caller sends none.
    pub default: SortOrder,
}

impl SortFields {
    /// Parses `field` (ascending) or `-field` (descending).
    pub fn parse(&self, raw: Option<&str>) -> AppResult<SortOrder> {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(self.default);
        };

        let (name, descending) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw.strip_prefix('+').unwrap_or(raw), false),
        };

        self.allowed
            .iter()
            .copied()
            .find(|allowed| *allowed == name)
            .map(|field| SortOrder { field, descending })
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "cannot sort by '{name}'; expected one of: {}",
                    self.allowed.join(", ")
                ))
            })
    }
}

/// Filter, sort and page of one listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery<F> {
    /// Entity-specific filter.
    pub filter: F,
    /// Validated sort order.
    pub sort: SortOrder,
    /// Requested page.
    pub page: PageRequest,
}

#[cfg(test)]
mod tests {
    use super::{PageRequest, Paged, SortFields, SortOrder};

    const FIELDS: SortFields = SortFields {
        allowed: &["createdAt", "name"],
        default: SortOrder::desc("createdAt"),
    };

    #[test]
    fn page_request_defaults_and_clamps() {
        let request = PageRequest::new(None, None);
        assert_eq!((request.page(), request.page_size()), (1, 20));

        let request = PageRequest::new(Some(0), Some(1_000));
        assert_eq!((request.page(), request.page_size()), (1, 100));

        let request = PageRequest::new(Some(3), Some(0));
        assert_eq!(request.page_size(), 1);
        assert_eq!(request.offset(), 2);
    }

    #[test]
    fn total_pages_rounds_up() {
        let paged = Paged::new(vec![1, 2], 41, PageRequest::new(Some(1), Some(20)));
        assert_eq!(paged.total_pages, 3);

        let empty: Paged<i32> = Paged::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn sort_prefix_selects_direction() {
        assert_eq!(FIELDS.parse(Some("name")).ok(), Some(SortOrder::asc("name")));
        assert_eq!(FIELDS.parse(Some("-name")).ok(), Some(SortOrder::desc("name")));
        assert_eq!(FIELDS.parse(None).ok(), Some(SortOrder::desc("createdAt")));
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        assert!(FIELDS.parse(Some("password_hash")).is_err());
    }
}
