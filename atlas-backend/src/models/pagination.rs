use serde::Serialize;

use crate::config::defaults;

/// Normalized page parameters shared by every paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: defaults::PAGE_SIZE,
        }
    }
}

impl PageParams {
    /// Page below 1 becomes 1. Page size 0 or below falls back to the default
    /// and anything above the maximum is clamped to it.
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = page.clamp(1, u32::MAX as i64) as u32;
        let page_size = if page_size < 1 {
            defaults::PAGE_SIZE
        } else {
            page_size.min(defaults::MAX_PAGE_SIZE as i64) as u32
        };
        Self { page, page_size }
    }

    /// Parse raw query-string values. Missing or empty values take defaults;
    /// non-numeric values are rejected.
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Result<Self, String> {
        let page = parse_number(page, "page")?.unwrap_or(1);
        let page_size = parse_number(page_size, "page_size")?.unwrap_or(0);
        Ok(Self::new(page, page_size))
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

fn parse_number(raw: Option<&str>, name: &str) -> Result<Option<i64>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("Invalid {} parameter", name)),
    }
}

/// Envelope for paginated listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_count: i64, params: PageParams) -> Self {
        Self {
            items,
            total_count,
            page: params.page,
            page_size: params.page_size,
        }
    }
}
