use serde::{Deserialize, Serialize};

use super::criteria::{SearchCriteria, SortSpec};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Zero-based page request; the size is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// Strategy chosen by the composer together with the criteria it received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFilters {
    pub strategy: &'static str,
    pub criteria: SearchCriteria,
}

/// One page of results with the metadata clients need to paginate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<AppliedFilters>,
    pub sort_by: &'static str,
    pub sort_direction: &'static str,
}

impl<T> Page<T> {
    /// Slice an already sorted result set.
    pub fn from_sorted(sorted: Vec<T>, request: PageRequest, sort: SortSpec) -> Self {
        let total_elements = sorted.len();
        let total_pages = total_elements.div_ceil(request.size);
        let items: Vec<T> = sorted
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();

        Self {
            empty: items.is_empty(),
            items,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            first: request.page == 0,
            last: request.page.saturating_add(1) >= total_pages,
            filters: None,
            sort_by: sort.field.label(),
            sort_direction: sort.direction.label(),
        }
    }

    pub fn with_filters(mut self, filters: AppliedFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
            empty: self.empty,
            filters: self.filters,
            sort_by: self.sort_by,
            sort_direction: self.sort_direction,
        }
    }
}
