//! Site-wide settings shared by every registered admin.

use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::ApiError;

/// Settings consumed when admins are assembled into a site.
///
/// # Environment
/// - `ADMIN_SITE_PREFIX`: URL prefix of the whole site (default `/admin`)
/// - `ADMIN_DEFAULT_PER_PAGE`: page size when a list request gives none (default 10)
/// - `ADMIN_MAX_PER_PAGE`: upper bound for `perPage`; `0` or `none` disables the clamp (default 100)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub site_prefix: String,
    pub default_per_page: u64,
    pub max_per_page: Option<u64>,
    pub show_total_default: bool,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            site_prefix: "/admin".to_string(),
            default_per_page: 10,
            max_per_page: Some(100),
            show_total_default: true,
        }
    }
}

impl AdminSettings {
    /// Defaults overlaid with the `ADMIN_*` environment variables.
    ///
    /// # Errors
    /// Returns an internal error when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with values returned by `lookup`.
    ///
    /// # Errors
    /// Returns an internal error when a numeric value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut settings = Self::default();

        if let Some(prefix) = lookup("ADMIN_SITE_PREFIX") {
            settings.site_prefix = normalize_prefix(&prefix);
        }
        if let Some(raw) = lookup("ADMIN_DEFAULT_PER_PAGE") {
            settings.default_per_page = parse_count("ADMIN_DEFAULT_PER_PAGE", &raw)?.max(1);
        }
        if let Some(raw) = lookup("ADMIN_MAX_PER_PAGE") {
            settings.max_per_page = if raw.trim().eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_count("ADMIN_MAX_PER_PAGE", &raw)?).filter(|max| *max > 0)
            };
        }

        tracing::debug!(?settings, "Loaded admin settings");
        Ok(settings)
    }

    /// Effective page size for a requested `perPage`.
    #[must_use]
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        let size = requested.filter(|size| *size > 0).unwrap_or(self.default_per_page);
        self.max_per_page.map_or(size, |max| size.min(max))
    }
}

fn parse_count(key: &str, raw: &str) -> Result<u64, ApiError> {
    raw.trim().parse().map_err(|_| {
        ApiError::internal(
            "Invalid admin configuration",
            Some(format!("{key} must be a non-negative integer, got '{raw}'")),
        )
    })
}

/// `admin/` -> `/admin`; an empty prefix mounts at the root.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
