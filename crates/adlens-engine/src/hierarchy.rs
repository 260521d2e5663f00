//! Brand-ownership resolution: walking `parent_id` chains to the root owner.

use std::collections::HashSet;

use adlens_core::ProductRef;

use crate::heuristics::UNCLASSIFIED_BUCKET;
use crate::taxonomy::TaxonomyIndex;

/// Which lineage rescues a brand that resolves to the unclassified bucket.
///
/// Historical revisions of this pipeline disagreed here; the default uses
/// the product hierarchy as a secondary signal, `BrandOnly` disables that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnerFallback {
    #[default]
    ProductLineage,
    BrandOnly,
}

/// Walks the ownership chain from `brand_id` to its root and returns the
/// root's name.
///
/// The walk is an explicit loop over the id-keyed index, never recursion:
/// cyclic `parent_id` data has been observed, and a visited-id set breaks
/// the loop, returning the best candidate found so far. A missing starting
/// id yields `None` (an invalid id cannot produce a name); a missing parent
/// mid-walk yields the best candidate so far.
#[must_use]
pub fn resolve_owner(brand_id: &str, index: &TaxonomyIndex) -> Option<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut best: Option<&str> = None;
    let mut current = brand_id;

    loop {
        if !visited.insert(current) {
            tracing::warn!(
                brand_id,
                node = current,
                "ownership chain contains a cycle; using best candidate"
            );
            return best.map(str::to_owned);
        }

        let Some(node) = index.node_of(current) else {
            return best.map(str::to_owned);
        };
        if !node.name.is_empty() {
            best = Some(node.name.as_str());
        }

        match node.parent_id.as_deref() {
            None => return best.map(str::to_owned),
            Some(parent) => current = parent,
        }
    }
}

/// Resolves the brand owner with the unclassified-bucket fallback applied.
///
/// The brand lineage is tried first. When it is absent or lands in the
/// root-level "Other" bucket and the segment carries a product id, the
/// product lineage is resolved instead; a usable product-side owner (one
/// that is not itself the unclassified bucket) takes precedence.
#[must_use]
pub fn resolve_owner_with_fallback(
    brand_id: Option<&str>,
    product: Option<&ProductRef>,
    index: &TaxonomyIndex,
    fallback: OwnerFallback,
) -> Option<String> {
    let owner = brand_id.and_then(|id| resolve_owner(id, index));

    if fallback == OwnerFallback::BrandOnly {
        return owner;
    }

    let unclassified = owner
        .as_deref()
        .is_none_or(|o| o.eq_ignore_ascii_case(UNCLASSIFIED_BUCKET));
    if !unclassified {
        return owner;
    }

    let product_owner = product
        .and_then(|p| p.id.as_deref())
        .and_then(|id| resolve_owner(id, index))
        .filter(|o| !o.eq_ignore_ascii_case(UNCLASSIFIED_BUCKET));

    product_owner.or(owner)
}
