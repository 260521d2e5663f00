use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// One tracked parent brand: the AdReal brand id whose whole family (children,
/// products) a deployment reports on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackedBrand {
    pub name: String,
    #[serde(deserialize_with = "crate::records::id_from_number_or_string")]
    pub id: String,
}

/// Optional overrides for the merge-policy ambiguities (see DESIGN.md).
///
/// Absent keys leave the engine defaults in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyToggles {
    pub owner_product_fallback: Option<bool>,
    pub drop_missing_product: Option<bool>,
}

/// The per-deployment roster file (`config/roster.yaml`): tracked brands,
/// an optional output-schema variant, and optional policy toggles.
#[derive(Debug, Deserialize)]
pub struct RosterFile {
    pub brands: Vec<TrackedBrand>,
    /// Canonical output columns for this deployment. `None` means the default
    /// schema (`Date, BrandOwner, Brand, Product, ContentType, MediaChannel,
    /// AdContacts`). Some deployments drop `Product` or add `MediaOwner`.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub policy: PolicyToggles,
}

impl RosterFile {
    /// The tracked brand ids as a comma-separated `brands` query parameter.
    #[must_use]
    pub fn brands_param(&self) -> String {
        self.brands
            .iter()
            .map(|b| b.id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Load and validate the roster configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_roster(path: &Path) -> Result<RosterFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RosterIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let roster: RosterFile = serde_yaml::from_str(&content)?;

    validate_roster(&roster)?;

    Ok(roster)
}

fn validate_roster(roster: &RosterFile) -> Result<(), ConfigError> {
    if roster.brands.is_empty() {
        return Err(ConfigError::Validation(
            "roster must list at least one tracked brand".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for brand in &roster.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        if brand.id.is_empty() || !brand.id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Validation(format!(
                "brand '{}' has invalid AdReal id '{}'; must be numeric",
                brand.name, brand.id
            )));
        }

        if !seen_ids.insert(brand.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand id: '{}' (brand '{}')",
                brand.id, brand.name
            )));
        }
    }

    if let Some(columns) = &roster.columns {
        let mut seen_cols = HashSet::new();
        for col in columns {
            if col.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "column names must be non-empty".to_string(),
                ));
            }
            if !seen_cols.insert(col.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate column: '{col}'"
                )));
            }
        }
    }

    Ok(())
}
