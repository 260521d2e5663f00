//! Schema conformance: canonical columns, final cleaning, deduplication,
//! and deterministic ordering of the output table.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use crate::heuristics::resolve_content_type;
use crate::merge::MergedRow;

/// The default canonical output schema. Deployments may override it through
/// [`ReportSpec::with_columns`] (some drop `Product`, some add `MediaOwner`).
pub const DEFAULT_COLUMNS: &[&str] = &[
    "Date",
    "BrandOwner",
    "Brand",
    "Product",
    "ContentType",
    "MediaChannel",
    "AdContacts",
];

/// Columns the deterministic output sort orders by, in precedence order.
const SORT_COLUMNS: &[&str] = &["BrandOwner", "Brand", "Product", "MediaChannel"];

/// Caller-supplied conformance parameters: the run-wide reporting date (the
/// first day of the reported month) and the canonical column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSpec {
    pub report_date: NaiveDate,
    pub columns: Vec<String>,
}

impl ReportSpec {
    #[must_use]
    pub fn new(report_date: NaiveDate) -> Self {
        Self::with_columns(
            report_date,
            DEFAULT_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
        )
    }

    #[must_use]
    pub fn with_columns(report_date: NaiveDate, columns: Vec<String>) -> Self {
        Self {
            report_date,
            columns,
        }
    }
}

/// One cell of the conformed table.
///
/// Numeric metric cells become `Int` when integral; non-integral numbers are
/// kept as their decimal text so rows stay hashable for full-row dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    Date(NaiveDate),
    Int(i64),
    Text(String),
    Null,
}

impl CellValue {
    fn rank(&self) -> u8 {
        match self {
            CellValue::Date(_) => 0,
            CellValue::Int(_) => 1,
            CellValue::Text(_) => 2,
            CellValue::Null => 3,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Ord for CellValue {
    /// Same-variant cells compare naturally; across variants the rank
    /// decides, which puts `Null` after everything else.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Null => Ok(()),
        }
    }
}

/// The conformed output table: every row carries every canonical column,
/// deduplicated and deterministically ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ConformedTable {
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Conforms merged rows to the canonical schema.
///
/// Renames fields to the canonical columns, fills columns the merge never
/// produced with `Null`, re-derives `ContentType` from the channel plus the
/// carried vendor value, stamps the run-wide `Date`, coerces `AdContacts` to
/// a non-negative integer, drops residual summary rows, deduplicates on
/// full-row equality, and sorts by `(BrandOwner, Brand, Product,
/// MediaChannel)` ascending with nulls last. A trailing full-row comparison
/// breaks remaining ties so shuffled inputs conform to byte-identical
/// output.
#[must_use]
pub fn conform(rows: &[MergedRow], spec: &ReportSpec) -> ConformedTable {
    let mut table_rows: Vec<Vec<CellValue>> = Vec::with_capacity(rows.len());
    let mut seen: HashSet<Vec<CellValue>> = HashSet::new();
    let mut dropped_summaries = 0usize;

    for row in rows {
        let cells: Vec<CellValue> = spec
            .columns
            .iter()
            .map(|column| cell_for(row, column, spec.report_date))
            .collect();

        if is_residual_summary(&cells, &spec.columns) {
            dropped_summaries += 1;
            continue;
        }

        if seen.insert(cells.clone()) {
            table_rows.push(cells);
        }
    }

    let sort_indices: Vec<usize> = SORT_COLUMNS
        .iter()
        .filter_map(|name| spec.columns.iter().position(|c| c == name))
        .collect();

    table_rows.sort_unstable_by(|a, b| {
        for &i in &sort_indices {
            match a[i].cmp(&b[i]) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        a.cmp(b)
    });

    if dropped_summaries > 0 {
        tracing::debug!(dropped_summaries, "dropped residual summary rows");
    }

    ConformedTable {
        columns: spec.columns.clone(),
        rows: table_rows,
    }
}

fn cell_for(row: &MergedRow, column: &str, report_date: NaiveDate) -> CellValue {
    match column {
        "Date" => CellValue::Date(report_date),
        "BrandOwner" => text_or_null(row.brand_owner.as_deref()),
        "Brand" => text_or_null(row.brand.as_deref()),
        "Product" => text_or_null(row.product.as_deref()),
        "MediaChannel" => text_or_null(row.media_channel.as_deref()),
        "ContentType" => CellValue::Text(
            resolve_content_type(
                row.vendor_content_type.as_deref(),
                row.media_channel.as_deref(),
            )
            .as_str()
            .to_owned(),
        ),
        "AdContacts" => CellValue::Int(coerce_metric(row.metrics.get("ad_cont"))),
        other => row
            .metrics
            .get(other)
            .or_else(|| row.metrics.get(&other.to_lowercase()))
            .map_or(CellValue::Null, metric_cell),
    }
}

fn text_or_null(value: Option<&str>) -> CellValue {
    match value {
        Some(v) => CellValue::Text(v.to_owned()),
        None => CellValue::Null,
    }
}

/// Coerces a raw metric value to a non-negative integer; anything
/// non-numeric (or missing) counts as zero rather than failing the batch.
#[allow(clippy::cast_possible_truncation)]
fn coerce_metric(value: Option<&serde_json::Value>) -> i64 {
    let n = match value {
        None | Some(serde_json::Value::Null) => 0,
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .or_else(|| v.as_str().and_then(parse_numeric_str))
            .unwrap_or(0),
    };
    n.max(0)
}

#[allow(clippy::cast_possible_truncation)]
fn parse_numeric_str(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
}

fn metric_cell(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Null,
        v => {
            if let Some(n) = v.as_i64() {
                CellValue::Int(n)
            } else if let Some(n) = v.as_f64() {
                CellValue::Text(n.to_string())
            } else if let Some(s) = v.as_str() {
                CellValue::Text(s.to_owned())
            } else {
                CellValue::Text(v.to_string())
            }
        }
    }
}

/// Final safety net: a row whose `MediaChannel` or `Product` still mentions
/// the summary bucket slipped past the merge-stage filter and is dropped.
fn is_residual_summary(cells: &[CellValue], columns: &[String]) -> bool {
    columns
        .iter()
        .zip(cells)
        .filter(|(name, _)| name.as_str() == "MediaChannel" || name.as_str() == "Product")
        .any(|(_, cell)| {
            cell.as_text()
                .is_some_and(|t| t.to_lowercase().contains("segment summary"))
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    fn row(owner: &str, brand: &str, channel: &str, contacts: i64) -> MergedRow {
        MergedRow {
            period: Some("month_20250801".to_owned()),
            brand_owner: Some(owner.to_owned()),
            brand: Some(brand.to_owned()),
            product: None,
            media_channel: Some(channel.to_owned()),
            platform: Some("pc".to_owned()),
            content_type: None,
            vendor_content_type: None,
            metrics: [("ad_cont".to_owned(), serde_json::json!(contacts))].into(),
        }
    }

    #[test]
    fn every_canonical_column_is_present() {
        let table = conform(&[row("Acme", "AcmeWidgets", "news.example.com", 10)], &ReportSpec::new(date()));
        assert_eq!(
            table.columns,
            vec![
                "Date",
                "BrandOwner",
                "Brand",
                "Product",
                "ContentType",
                "MediaChannel",
                "AdContacts"
            ]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].len(), table.columns.len());
        let product = table.column_index("Product").unwrap();
        assert_eq!(table.rows[0][product], CellValue::Null);
    }

    #[test]
    fn date_is_stamped_run_wide() {
        let table = conform(
            &[
                row("Acme", "A", "a.example.com", 1),
                row("Acme", "B", "b.example.com", 2),
            ],
            &ReportSpec::new(date()),
        );
        let idx = table.column_index("Date").unwrap();
        assert!(table
            .rows
            .iter()
            .all(|r| r[idx] == CellValue::Date(date())));
    }

    #[test]
    fn content_type_is_rederived_from_channel() {
        let mut r = row("Acme", "A", "m.facebook.com", 1);
        // Simulate an upstream row whose per-row value diverged.
        r.content_type = Some("Standard".to_owned());
        let table = conform(&[r], &ReportSpec::new(date()));
        let idx = table.column_index("ContentType").unwrap();
        assert_eq!(table.rows[0][idx], CellValue::Text("Social".to_owned()));
    }

    #[test]
    fn carried_vendor_content_type_wins_in_rederivation() {
        let mut r = row("Acme", "A", "shop.example.ro", 1);
        r.vendor_content_type = Some("search".to_owned());
        let table = conform(&[r], &ReportSpec::new(date()));
        let idx = table.column_index("ContentType").unwrap();
        assert_eq!(table.rows[0][idx], CellValue::Text("Search".to_owned()));
    }

    #[test]
    fn ad_contacts_coercion() {
        let cases: Vec<(serde_json::Value, i64)> = vec![
            (serde_json::json!(150), 150),
            (serde_json::json!(12.9), 12),
            (serde_json::json!("37"), 37),
            (serde_json::json!("n/a"), 0),
            (serde_json::json!(null), 0),
            (serde_json::json!(-5), 0),
        ];
        for (raw, expected) in cases {
            let mut r = row("Acme", "A", "a.example.com", 0);
            r.metrics = [("ad_cont".to_owned(), raw.clone())].into();
            let table = conform(&[r], &ReportSpec::new(date()));
            let idx = table.column_index("AdContacts").unwrap();
            assert_eq!(
                table.rows[0][idx],
                CellValue::Int(expected),
                "coercing {raw}"
            );
        }
    }

    #[test]
    fn missing_ad_cont_metric_is_zero() {
        let mut r = row("Acme", "A", "a.example.com", 0);
        r.metrics.clear();
        let table = conform(&[r], &ReportSpec::new(date()));
        let idx = table.column_index("AdContacts").unwrap();
        assert_eq!(table.rows[0][idx], CellValue::Int(0));
    }

    #[test]
    fn duplicate_rows_collapse() {
        let table = conform(
            &[
                row("Acme", "A", "a.example.com", 1),
                row("Acme", "A", "a.example.com", 1),
            ],
            &ReportSpec::new(date()),
        );
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn residual_summary_rows_are_dropped() {
        let mut r = row("Acme", "A", "Segment Summary", 1);
        r.vendor_content_type = Some("standard".to_owned());
        let table = conform(&[r], &ReportSpec::new(date()));
        assert!(table.is_empty());
    }

    #[test]
    fn sort_orders_by_owner_brand_product_channel_with_nulls_last() {
        let mut no_owner = row("x", "B", "b.example.com", 1);
        no_owner.brand_owner = None;
        let table = conform(
            &[
                no_owner,
                row("Zeta", "Z", "z.example.com", 1),
                row("Acme", "B", "b.example.com", 1),
                row("Acme", "A", "a.example.com", 1),
            ],
            &ReportSpec::new(date()),
        );
        let owner = table.column_index("BrandOwner").unwrap();
        let rendered: Vec<String> = table.rows.iter().map(|r| r[owner].to_string()).collect();
        assert_eq!(rendered, vec!["Acme", "Acme", "Zeta", ""]);
        let brand = table.column_index("Brand").unwrap();
        assert_eq!(table.rows[0][brand], CellValue::Text("A".to_owned()));
    }

    #[test]
    fn schema_variant_without_product_and_with_media_owner() {
        let columns: Vec<String> = [
            "Date",
            "BrandOwner",
            "Brand",
            "ContentType",
            "MediaOwner",
            "MediaChannel",
            "AdContacts",
        ]
        .iter()
        .map(|c| (*c).to_owned())
        .collect();
        let table = conform(
            &[row("Acme", "A", "a.example.com", 7)],
            &ReportSpec::with_columns(date(), columns),
        );
        assert_eq!(table.column_index("Product"), None);
        let media_owner = table.column_index("MediaOwner").unwrap();
        assert_eq!(table.rows[0][media_owner], CellValue::Null);
    }

    #[test]
    fn pass_through_metric_column() {
        let mut r = row("Acme", "A", "a.example.com", 1);
        r.metrics
            .insert("reach".to_owned(), serde_json::json!(12345));
        let mut columns: Vec<String> =
            DEFAULT_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
        columns.push("Reach".to_owned());
        let table = conform(&[r], &ReportSpec::with_columns(date(), columns));
        let idx = table.column_index("Reach").unwrap();
        assert_eq!(table.rows[0][idx], CellValue::Int(12345));
    }

    #[test]
    fn null_cells_render_as_empty_text() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(
            CellValue::Date(date()).to_string(),
            "2025-08-01"
        );
    }

    #[test]
    fn metrics_differing_only_in_unrequested_columns_still_dedupe() {
        let mut a = row("Acme", "A", "a.example.com", 1);
        a.metrics.insert("ru".to_owned(), serde_json::json!(99));
        let b = row("Acme", "A", "a.example.com", 1);
        // "ru" is not a requested column, so the projected rows are equal.
        let table = conform(&[a, b], &ReportSpec::new(date()));
        assert_eq!(table.rows.len(), 1);
    }
}
