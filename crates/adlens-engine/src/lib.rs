//! Attribution & normalization engine.
//!
//! A pure, synchronous transformation from three freshly fetched AdReal
//! collections (stats, brand taxonomy, site taxonomy) to a deduplicated,
//! schema-conformant table ready for warehouse loading. Nothing in this
//! crate performs I/O, blocks, or fails: taxonomy misses echo the raw id,
//! cyclic ownership chains break via a visited set, malformed segments
//! degrade to null fields, and bad metric values coerce to zero.

use adlens_core::{BrandNode, SiteNode, StatRecord};

pub mod conform;
pub mod heuristics;
pub mod hierarchy;
pub mod merge;
pub mod taxonomy;

pub use conform::{conform, CellValue, ConformedTable, ReportSpec, DEFAULT_COLUMNS};
pub use heuristics::{classify_channel, resolve_content_type, ContentType};
pub use hierarchy::{resolve_owner, resolve_owner_with_fallback, OwnerFallback};
pub use merge::{merge, MergePolicy, MergedRow};
pub use taxonomy::{augment_other_buckets, TaxonomyIndex, TaxonomyNode};

/// Runs the whole transformation: augments the brand taxonomy with fallback
/// buckets, builds both indexes, merges, and conforms.
///
/// This is the single entry point the pipeline orchestration uses; the
/// individual stages stay public for tests and partial reuse.
#[must_use]
pub fn attribute(
    stats: &[StatRecord],
    mut brands: Vec<BrandNode>,
    sites: &[SiteNode],
    policy: &MergePolicy,
    spec: &ReportSpec,
) -> ConformedTable {
    taxonomy::augment_other_buckets(&mut brands);
    let brand_index = TaxonomyIndex::from_brands(&brands);
    let site_index = TaxonomyIndex::from_sites(sites);
    let merged = merge::merge(stats, &brand_index, &site_index, policy);
    conform::conform(&merged, spec)
}
