//! AdReal API envelope and query types.

use serde::Deserialize;

/// Default metric list requested from the stats endpoint.
pub const DEFAULT_METRICS: &str = "ru,ad_cont,reach";

/// Default platform filter.
pub const DEFAULT_PLATFORMS: &str = "pc";

/// Default page-type filter.
pub const DEFAULT_PAGE_TYPES: &str = "search,social,standard";

/// Default segment breakdown requested from the stats endpoint.
pub const DEFAULT_SEGMENTS: &str = "brand,product,content_type,website";

/// Envelope for every paginated AdReal response:
/// `{ "total_count": N, "results": [...] }`.
///
/// `total_count` is absent on some endpoint revisions; callers fall back to
/// the length of the first page.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct PageEnvelope<T> {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub results: Vec<T>,
}

/// Parameters for one stats request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsQuery {
    /// Comma-separated parent brand ids.
    pub brands: String,
    pub metrics: String,
    /// `"YYYYMMDD,YYYYMMDD,month"` range string.
    pub periods_range: String,
    pub platforms: String,
    pub page_types: String,
    pub segments: String,
    pub limit: u64,
}

impl StatsQuery {
    /// A query with the default metric/platform/page-type/segment selection.
    #[must_use]
    pub fn new(brands: impl Into<String>, periods_range: impl Into<String>, limit: u64) -> Self {
        Self {
            brands: brands.into(),
            metrics: DEFAULT_METRICS.to_owned(),
            periods_range: periods_range.into(),
            platforms: DEFAULT_PLATFORMS.to_owned(),
            page_types: DEFAULT_PAGE_TYPES.to_owned(),
            segments: DEFAULT_SEGMENTS.to_owned(),
            limit,
        }
    }
}
