use axum::http::header::HeaderMap;

use crate::config::AdminSettings;

const MAX_WINDOW: u64 = i64::MAX.unsigned_abs();

/// Resolved page window of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Page {
    /// 1-based `page` (anything below 1 is 1) and a `per_page` bounded by `settings`.
    #[must_use]
    pub fn resolve(page: Option<u64>, per_page: Option<u64>, settings: &AdminSettings) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: settings.page_size(per_page),
        }
    }

    /// Rows to skip, capped at `i64::MAX` since storage binds it as a signed integer.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        let offset = self.page.saturating_sub(1).saturating_mul(self.per_page);
        if offset > MAX_WINDOW { MAX_WINDOW } else { offset }
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        if self.per_page > MAX_WINDOW { MAX_WINDOW } else { self.per_page }
    }
}

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Build the `Content-Range` header for a list page.
///
/// `items` is the number of rows actually returned; the header reads
/// `{resource} {first}-{last}/{total}`.
#[must_use]
pub fn calculate_content_range(offset: u64, items: u64, total_count: u64, resource_name: &str) -> HeaderMap {
    let last = (offset + items.max(1) - 1).min(total_count.saturating_sub(1).max(offset));
    let safe_name = sanitize_resource_name(resource_name);
    let content_range = format!("{safe_name} {offset}-{last}/{total_count}");

    let mut headers = HeaderMap::new();
    if let Ok(value) = content_range.parse() {
        headers.insert("Content-Range", value);
    }
    headers
}
