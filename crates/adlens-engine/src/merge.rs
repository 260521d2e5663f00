//! The attribution merge: joining stats records with the brand and site
//! taxonomies into flat, attributed rows.

use std::collections::BTreeMap;

use adlens_core::{Segment, StatRecord};

use crate::heuristics::{is_aggregate_sentinel, resolve_content_type, SUMMARY_BUCKET};
use crate::hierarchy::{resolve_owner_with_fallback, OwnerFallback};
use crate::taxonomy::TaxonomyIndex;

/// Tunable policy for the merge stage.
///
/// The defaults encode the behavior the warehouse consumers rely on; the
/// toggles exist because historical revisions of this pipeline genuinely
/// disagreed (see DESIGN.md).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePolicy {
    /// Lineage used to rescue brands that resolve to the "Other" bucket.
    pub owner_fallback: OwnerFallback,
    /// Treat a segment with no product key at all as a rollup and drop it.
    /// Off by default: brand-level reports legitimately omit the product
    /// dimension.
    pub drop_missing_product: bool,
    /// When set, only stats entries with exactly this period label emit
    /// rows. The API returns adjacent periods alongside the requested one,
    /// which triplicates rows if left unfiltered.
    pub period_filter: Option<String>,
}

/// One attributed, pre-schema row: resolved dimension names plus a flat
/// metric map (`values` keys as-is, `uncertainty` keys suffixed with
/// `_uncertainty`).
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub period: Option<String>,
    pub brand_owner: Option<String>,
    pub brand: Option<String>,
    pub product: Option<String>,
    pub media_channel: Option<String>,
    pub platform: Option<String>,
    pub content_type: Option<String>,
    /// The raw vendor content type, carried so the conform stage can
    /// re-derive the classification with identical inputs.
    pub vendor_content_type: Option<String>,
    pub metrics: BTreeMap<String, serde_json::Value>,
}

/// Merges stats records with the two taxonomy indexes into attributed rows.
///
/// Each record resolves its brand, owner, product, and channel names, is
/// checked against the aggregate filter, and then emits one row per stats
/// entry. Malformed segments degrade to `None` fields; nothing here fails.
#[must_use]
pub fn merge(
    stats: &[StatRecord],
    brand_index: &TaxonomyIndex,
    site_index: &TaxonomyIndex,
    policy: &MergePolicy,
) -> Vec<MergedRow> {
    let mut rows = Vec::new();
    let mut dropped_aggregates = 0usize;

    for record in stats {
        let segment = &record.segment;
        let website_name: Option<&str> = segment
            .website
            .as_deref()
            .map(|id| site_index.name_of(id));

        if is_aggregate_row(segment, website_name, policy) {
            dropped_aggregates += 1;
            continue;
        }

        let brand_name = segment
            .brand
            .as_deref()
            .map(|id| brand_index.name_of(id).to_owned());
        let brand_owner = resolve_owner_with_fallback(
            segment.brand.as_deref(),
            segment.product.as_ref(),
            brand_index,
            policy.owner_fallback,
        );
        let product = segment.product.as_ref().and_then(|p| {
            p.label
                .clone()
                .or_else(|| p.id.as_deref().map(|id| brand_index.name_of(id).to_owned()))
        });
        let content_type =
            resolve_content_type(segment.content_type.as_deref(), website_name);

        for entry in &record.stats {
            if let Some(filter) = policy.period_filter.as_deref() {
                if entry.period.as_deref() != Some(filter) {
                    continue;
                }
            }

            let mut metrics: BTreeMap<String, serde_json::Value> = BTreeMap::new();
            for (key, value) in &entry.values {
                metrics.insert(key.clone(), value.clone());
            }
            for (key, value) in &entry.uncertainty {
                metrics.insert(format!("{key}_uncertainty"), value.clone());
            }

            rows.push(MergedRow {
                period: entry.period.clone(),
                brand_owner: brand_owner.clone(),
                brand: brand_name.clone(),
                product: product.clone(),
                media_channel: website_name.map(str::to_owned),
                platform: segment.platform.clone(),
                content_type: Some(content_type.as_str().to_owned()),
                vendor_content_type: segment.content_type.clone(),
                metrics,
            });
        }
    }

    tracing::debug!(
        rows = rows.len(),
        dropped_aggregates,
        "merged stats records into attributed rows"
    );
    rows
}

/// The three-part rollup test. The API mixes leaf rows and parent/rollup
/// rows in one response; a rollup can only be told apart by checking both
/// the raw segment value and the resolved name.
fn is_aggregate_row(
    segment: &Segment,
    website_name: Option<&str>,
    policy: &MergePolicy,
) -> bool {
    // Summary rows are named outright.
    if website_name.is_some_and(|n| n.eq_ignore_ascii_case(SUMMARY_BUCKET)) {
        return true;
    }

    // A sentinel channel id that the site taxonomy could not rescue.
    if is_aggregate_sentinel(segment.website.as_deref()) && is_aggregate_sentinel(website_name) {
        return true;
    }

    // A sentinel product id without a rescuing embedded label. A segment
    // with no product key at all is a brand-level row, kept unless the
    // stricter policy is enabled.
    match segment.product.as_ref() {
        Some(p) => p.label.is_none() && is_aggregate_sentinel(p.id.as_deref()),
        None => policy.drop_missing_product,
    }
}

#[cfg(test)]
mod tests {
    use adlens_core::{ProductRef, StatEntry};

    use super::*;

    fn sites() -> TaxonomyIndex {
        TaxonomyIndex::from_sites(&[adlens_core::SiteNode::new("9", "news.example.com")])
    }

    fn record(segment: Segment) -> StatRecord {
        StatRecord {
            segment,
            stats: vec![StatEntry {
                period: Some("month_20250801".to_owned()),
                values: [("ad_cont".to_owned(), serde_json::json!(10))].into(),
                uncertainty: BTreeMap::new(),
            }],
        }
    }

    fn segment(brand: &str, website: &str) -> Segment {
        Segment {
            brand: Some(brand.to_owned()),
            website: Some(website.to_owned()),
            ..Segment::default()
        }
    }

    #[test]
    fn sentinel_channel_without_rescue_is_dropped() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let rows = merge(
            &[record(segment("1", "-1"))],
            &brands,
            &sites(),
            &MergePolicy::default(),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn sentinel_channel_rescued_by_taxonomy_is_kept() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let site_index =
            TaxonomyIndex::from_sites(&[adlens_core::SiteNode::new("0", "portal.example.com")]);
        let rows = merge(
            &[record(segment("1", "0"))],
            &brands,
            &site_index,
            &MergePolicy::default(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].media_channel.as_deref(), Some("portal.example.com"));
    }

    #[test]
    fn summary_channel_name_is_dropped() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let site_index =
            TaxonomyIndex::from_sites(&[adlens_core::SiteNode::new("7", "Segment summary")]);
        let rows = merge(
            &[record(segment("1", "7"))],
            &brands,
            &site_index,
            &MergePolicy::default(),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn sentinel_product_without_label_is_dropped() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let mut seg = segment("1", "9");
        seg.product = Some(ProductRef::from_id("-1"));
        let rows = merge(&[record(seg)], &brands, &sites(), &MergePolicy::default());
        assert!(rows.is_empty());
    }

    #[test]
    fn sentinel_product_with_embedded_label_is_rescued() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let mut seg = segment("1", "9");
        seg.product = Some(ProductRef {
            id: Some("-1".to_owned()),
            label: Some("Acme Widgets".to_owned()),
        });
        let rows = merge(&[record(seg)], &brands, &sites(), &MergePolicy::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product.as_deref(), Some("Acme Widgets"));
    }

    // The exact treatment of a wholly absent product key is a historical
    // ambiguity; both behaviors are pinned here so a policy change cannot
    // slip through unnoticed.
    #[test]
    fn missing_product_is_kept_by_default() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let rows = merge(
            &[record(segment("1", "9"))],
            &brands,
            &sites(),
            &MergePolicy::default(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product, None);
    }

    #[test]
    fn missing_product_is_dropped_under_strict_policy() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let policy = MergePolicy {
            drop_missing_product: true,
            ..MergePolicy::default()
        };
        let rows = merge(&[record(segment("1", "9"))], &brands, &sites(), &policy);
        assert!(rows.is_empty());
    }

    #[test]
    fn product_id_resolves_through_the_brand_taxonomy() {
        let brands = TaxonomyIndex::from_brands(&[adlens_core::BrandNode::new(
            "42",
            "Acme Widgets",
            Some("1"),
        )]);
        let mut seg = segment("1", "9");
        seg.product = Some(ProductRef::from_id("42"));
        let rows = merge(&[record(seg)], &brands, &sites(), &MergePolicy::default());
        assert_eq!(rows[0].product.as_deref(), Some("Acme Widgets"));
    }

    #[test]
    fn unknown_brand_echoes_its_id() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let rows = merge(
            &[record(segment("555", "9"))],
            &brands,
            &sites(),
            &MergePolicy::default(),
        );
        assert_eq!(rows[0].brand.as_deref(), Some("555"));
        assert_eq!(rows[0].brand_owner, None);
    }

    #[test]
    fn vendor_content_type_is_carried_and_resolved() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let mut seg = segment("1", "9");
        seg.content_type = Some("search".to_owned());
        let rows = merge(&[record(seg)], &brands, &sites(), &MergePolicy::default());
        assert_eq!(rows[0].content_type.as_deref(), Some("Search"));
        assert_eq!(rows[0].vendor_content_type.as_deref(), Some("search"));
    }

    #[test]
    fn content_type_derived_from_channel_when_vendor_silent() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let site_index =
            TaxonomyIndex::from_sites(&[adlens_core::SiteNode::new("9", "m.facebook.com")]);
        let rows = merge(
            &[record(segment("1", "9"))],
            &brands,
            &site_index,
            &MergePolicy::default(),
        );
        assert_eq!(rows[0].content_type.as_deref(), Some("Social"));
    }

    #[test]
    fn each_stats_entry_emits_one_row() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let mut rec = record(segment("1", "9"));
        rec.stats.push(StatEntry {
            period: Some("month_20250701".to_owned()),
            values: [("ad_cont".to_owned(), serde_json::json!(5))].into(),
            uncertainty: BTreeMap::new(),
        });
        let rows = merge(&[rec], &brands, &sites(), &MergePolicy::default());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn period_filter_limits_row_expansion() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let mut rec = record(segment("1", "9"));
        rec.stats.push(StatEntry {
            period: Some("month_20250701".to_owned()),
            values: [("ad_cont".to_owned(), serde_json::json!(5))].into(),
            uncertainty: BTreeMap::new(),
        });
        let policy = MergePolicy {
            period_filter: Some("month_20250801".to_owned()),
            ..MergePolicy::default()
        };
        let rows = merge(&[rec], &brands, &sites(), &policy);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].period.as_deref(), Some("month_20250801"));
    }

    #[test]
    fn uncertainty_keys_are_suffixed() {
        let brands = TaxonomyIndex::from_brands(&[]);
        let mut rec = record(segment("1", "9"));
        rec.stats[0]
            .uncertainty
            .insert("ad_cont".to_owned(), serde_json::json!(0.07));
        let rows = merge(&[rec], &brands, &sites(), &MergePolicy::default());
        assert_eq!(
            rows[0].metrics.get("ad_cont_uncertainty"),
            Some(&serde_json::json!(0.07))
        );
    }
}
