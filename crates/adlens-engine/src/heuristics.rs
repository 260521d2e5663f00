//! Named classification tables shared by the merge and conform stages.
//!
//! Keyword lists and sentinel sets live here, in one place, so that every
//! stage that classifies a channel or detects a rollup row applies exactly
//! the same policy.

/// Substrings that mark a channel as a search engine.
pub const SEARCH_KEYWORDS: &[&str] = &["google.", "bing.", "yahoo."];

/// Substrings that mark a channel as a social network.
pub const SOCIAL_KEYWORDS: &[&str] = &[
    "facebook",
    "instagram",
    "tiktok",
    "youtube",
    "twitter",
    "x.com",
    "linkedin",
    "pinterest",
    "snapchat",
    "reddit",
];

/// Literal segment values the API uses for rollup rows. Compared after
/// string-normalization, so `0`-as-int and `"0"`-as-string coincide.
pub const AGGREGATE_SENTINELS: &[&str] = &["0", "-1", "all"];

/// Name of the vendor's bucket for unclassified children under a root brand.
pub const UNCLASSIFIED_BUCKET: &str = "Other";

/// Channel name the API uses for per-segment summary rows.
pub const SUMMARY_BUCKET: &str = "Segment summary";

/// UI-facing classification of a media channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Search,
    Social,
    Standard,
    Unknown,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Search => "Search",
            ContentType::Social => "Social",
            ContentType::Standard => "Standard",
            ContentType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a channel name by keyword match.
///
/// A missing or empty channel cannot be classified and maps to
/// [`ContentType::Unknown`]; anything that matches neither keyword table is
/// [`ContentType::Standard`].
#[must_use]
pub fn classify_channel(channel: Option<&str>) -> ContentType {
    let Some(channel) = channel.map(str::trim).filter(|c| !c.is_empty()) else {
        return ContentType::Unknown;
    };
    // An unresolved channel id echoes through as bare digits; that is not a
    // name and cannot be classified.
    if channel.bytes().all(|b| b.is_ascii_digit()) {
        return ContentType::Unknown;
    }
    let lowered = channel.to_lowercase();
    if SEARCH_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        ContentType::Search
    } else if SOCIAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        ContentType::Social
    } else {
        ContentType::Standard
    }
}

/// Resolves the content type for a row.
///
/// The vendor-supplied segment value wins when usable (present, non-empty,
/// not the literal `"None"`): canonical labels map directly and anything
/// else goes through the same keyword table as channel names. Otherwise the
/// resolved channel name is classified instead.
#[must_use]
pub fn resolve_content_type(vendor: Option<&str>, channel: Option<&str>) -> ContentType {
    let usable = vendor
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("none"));
    match usable {
        Some(v) if v.eq_ignore_ascii_case("search") => ContentType::Search,
        Some(v) if v.eq_ignore_ascii_case("social") => ContentType::Social,
        Some(v) if v.eq_ignore_ascii_case("standard") => ContentType::Standard,
        Some(v) => classify_channel(Some(v)),
        None => classify_channel(channel),
    }
}

/// Whether a raw segment value or resolved name denotes a rollup rather than
/// a leaf. Absent and empty values count as sentinels.
#[must_use]
pub fn is_aggregate_sentinel(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => true,
        Some(v) => {
            v.is_empty()
                || AGGREGATE_SENTINELS
                    .iter()
                    .any(|s| v.eq_ignore_ascii_case(s))
        }
    }
}
