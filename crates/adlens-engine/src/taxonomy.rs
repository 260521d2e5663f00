//! Id-keyed lookup structures over the brand and site taxonomies.

use std::collections::{HashMap, HashSet};

use adlens_core::{BrandNode, SiteNode};

use crate::heuristics::UNCLASSIFIED_BUCKET;

/// Synthetic "Other" buckets get ids at or above this floor, well clear of
/// the id range the API hands out.
pub const SYNTHETIC_ID_FLOOR: u64 = 10_000_000;

/// One entry of a [`TaxonomyIndex`]. Site entries never have a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

/// An immutable id → node lookup built once per pipeline run.
///
/// Lookups never fail: an unknown id simply echoes back as its own name,
/// since partial taxonomy coverage is expected and must not abort a run.
#[derive(Debug, Default)]
pub struct TaxonomyIndex {
    nodes: HashMap<String, TaxonomyNode>,
}

impl TaxonomyIndex {
    /// Builds the hierarchical index from brand taxonomy records.
    /// Duplicate ids keep the last record seen.
    #[must_use]
    pub fn from_brands(records: &[BrandNode]) -> Self {
        let nodes = records
            .iter()
            .map(|r| {
                (
                    r.id.clone(),
                    TaxonomyNode {
                        id: r.id.clone(),
                        name: r.name.clone(),
                        parent_id: r.parent_id.clone(),
                    },
                )
            })
            .collect();
        Self { nodes }
    }

    /// Builds the flat index from site taxonomy records.
    #[must_use]
    pub fn from_sites(records: &[SiteNode]) -> Self {
        let nodes = records
            .iter()
            .map(|r| {
                (
                    r.id.clone(),
                    TaxonomyNode {
                        id: r.id.clone(),
                        name: r.name.clone(),
                        parent_id: None,
                    },
                )
            })
            .collect();
        Self { nodes }
    }

    #[must_use]
    pub fn node_of(&self, id: &str) -> Option<&TaxonomyNode> {
        self.nodes.get(id)
    }

    /// The human-readable name for `id`, or `id` itself when the taxonomy
    /// has no entry (or an entry with an empty name) for it.
    #[must_use]
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        match self.nodes.get(id) {
            Some(node) if !node.name.is_empty() => node.name.as_str(),
            _ => id,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Guarantees every root brand has an "Other" child to catch unclassified
/// children.
///
/// For each root node (no parent) without an existing child literally named
/// "Other" (case-insensitive), appends one with a fresh unique id above both
/// [`SYNTHETIC_ID_FLOOR`] and every existing numeric id. Running this twice
/// adds nothing the second time.
///
/// Returns the number of buckets added.
pub fn augment_other_buckets(records: &mut Vec<BrandNode>) -> usize {
    let max_existing = records
        .iter()
        .filter_map(|r| r.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    let mut next_id = (max_existing + 1).max(SYNTHETIC_ID_FLOOR);

    let roots_with_other: HashSet<&str> = records
        .iter()
        .filter(|r| r.name.trim().eq_ignore_ascii_case(UNCLASSIFIED_BUCKET))
        .filter_map(|r| r.parent_id.as_deref())
        .collect();

    let synthetic: Vec<BrandNode> = records
        .iter()
        .filter(|r| r.parent_id.is_none())
        .filter(|root| !roots_with_other.contains(root.id.as_str()))
        .map(|root| {
            let node = BrandNode::new(
                next_id.to_string(),
                UNCLASSIFIED_BUCKET,
                Some(root.id.as_str()),
            );
            next_id += 1;
            node
        })
        .collect();

    let added = synthetic.len();
    if added > 0 {
        tracing::debug!(added, "synthesized fallback buckets for root brands");
    }
    records.extend(synthetic);
    added
}
