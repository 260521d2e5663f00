//! AdReal API record types.
//!
//! All types model the JSON structures returned by the AdReal REST API.
//! The API is loose about identifier shapes: ids arrive as JSON numbers or
//! strings, the key may be `id`, `pk`, or `value` depending on endpoint
//! revision, and a stats segment's `product` is sometimes a bare id and
//! sometimes an embedded `{id, label}` object. All of that is resolved here,
//! once, at the deserialization boundary: downstream code only ever sees
//! canonical `String` ids and [`ProductRef`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// An identifier that may arrive as a JSON number or a JSON string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Num(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

pub(crate) fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_string)
}

fn opt_id_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(RawId::into_string))
}

/// Parent ids use the same number-or-string encoding, but the API also emits
/// falsy placeholders (`null`, `0`, `"0"`, `""`) for root nodes. All of them
/// fold to `None` so the hierarchy walk has a single root test.
fn parent_id_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw
        .map(RawId::into_string)
        .filter(|s| !matches!(s.as_str(), "" | "0")))
}

/// One node of the brand taxonomy (the `brands` endpoint).
///
/// Brands form a forest: `parent_id` links a brand to its owner, roots have
/// no parent. Products share this id space.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrandNode {
    #[serde(
        alias = "pk",
        alias = "value",
        deserialize_with = "id_from_number_or_string"
    )]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "parent_id_field")]
    pub parent_id: Option<String>,
}

impl BrandNode {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: parent_id.map(str::to_owned),
        }
    }
}

/// One entry of the flat site/publisher taxonomy (the `publishers` endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteNode {
    #[serde(
        alias = "pk",
        alias = "value",
        deserialize_with = "id_from_number_or_string"
    )]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl SiteNode {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A stats segment's `product` field, resolved to a canonical
/// `(id, optional label)` pair.
///
/// On the wire this is either a bare id (`42`, `"42"`) or an embedded object
/// (`{"id": 42, "label": "Acme Widgets"}`; older responses use `value`/`name`
/// for the same pair).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRef {
    pub id: Option<String>,
    pub label: Option<String>,
}

impl ProductRef {
    #[must_use]
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: None,
        }
    }

    #[must_use]
    pub fn labelled(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: Some(label.into()),
        }
    }
}

impl<'de> Deserialize<'de> for ProductRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct EmbeddedRaw {
            #[serde(
                default,
                alias = "value",
                deserialize_with = "opt_id_from_number_or_string"
            )]
            id: Option<String>,
            #[serde(default, alias = "name")]
            label: Option<String>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bare(RawId),
            Embedded(EmbeddedRaw),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bare(id) => Ok(ProductRef {
                id: Some(id.into_string()),
                label: None,
            }),
            Raw::Embedded(e) => Ok(ProductRef {
                id: e.id,
                label: e.label,
            }),
        }
    }
}

/// The dimension breakdown attached to one stats record.
///
/// `brand` and `website` keep their literal string form: aggregate rollup
/// rows carry sentinel values (`"0"`, `"-1"`, `"all"`) that the merge engine
/// must still be able to observe.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Segment {
    #[serde(deserialize_with = "opt_id_from_number_or_string")]
    pub brand: Option<String>,
    pub product: Option<ProductRef>,
    #[serde(deserialize_with = "opt_id_from_number_or_string")]
    pub website: Option<String>,
    #[serde(deserialize_with = "opt_id_from_number_or_string")]
    pub platform: Option<String>,
    pub content_type: Option<String>,
    pub page_type: Option<String>,
}

/// One time-period entry under a stats record.
///
/// `values` holds the requested metrics (`ad_cont`, `ru`, `reach`, …);
/// `uncertainty` holds the per-metric confidence figures. Values stay as raw
/// JSON; the API occasionally returns strings or nulls where numbers are
/// expected, and coercion policy belongs to the conform stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatEntry {
    pub period: Option<String>,
    pub values: BTreeMap<String, serde_json::Value>,
    pub uncertainty: BTreeMap<String, serde_json::Value>,
}

/// One record of the `stats` endpoint: a segment plus its per-period entries.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatRecord {
    pub segment: Segment,
    pub stats: Vec<StatEntry>,
}
