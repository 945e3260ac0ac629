//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use serde::Deserialize;

use crate::models::ListParams;

// ============================================================================
// Pagination Defaults
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for public lists
pub fn default_page_size() -> u32 {
    10
}

// ============================================================================
// Query Types
// ============================================================================

/// Public list query: `?lang=&page=&page_size=`
#[derive(Debug, Deserialize)]
pub struct PublicListQuery {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl PublicListQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.page_size)
    }
}

/// `?lang=` only
#[derive(Debug, Default, Deserialize)]
pub struct LangQuery {
    #[serde(default)]
    pub lang: Option<String>,
}

/// Comma-separated id list, e.g. `?ids=1,2,3`
#[derive(Debug, Default, Deserialize)]
pub struct IdsQuery {
    #[serde(default)]
    pub ids: Option<String>,
}

impl IdsQuery {
    /// Parsed ids; `None` when the parameter is absent or blank
    pub fn parse(&self) -> Result<Option<Vec<i64>>, String> {
        let Some(raw) = self.ids.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i64>().map_err(|_| format!("Invalid id '{}'", s)))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Trimmed, non-empty string or `None`
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_query_parse() {
        let q = IdsQuery { ids: Some("3, 1,2,".into()) };
        assert_eq!(q.parse().unwrap(), Some(vec![3, 1, 2]));

        assert_eq!(IdsQuery::default().parse().unwrap(), None);
        assert_eq!(IdsQuery { ids: Some("  ".into()) }.parse().unwrap(), None);
        assert!(IdsQuery { ids: Some("1,x".into()) }.parse().is_err());
    }

    #[test]
    fn test_public_list_query_clamps() {
        let q = PublicListQuery { lang: None, page: 0, page_size: 1000 };
        let params = q.params();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(" urdu ")), Some("urdu"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
