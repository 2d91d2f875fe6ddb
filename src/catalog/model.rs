//! Core data types for the policy catalog.
//!
//! A `CatalogEntry` is one queryable leaf setting from a DDF schema. Everything
//! except `current_value` and `has_applied_value` is fixed at parse time.

use serde::{Deserialize, Serialize};

/// Format string used when a node declares no `DFFormat` child.
pub const UNKNOWN_FORMAT: &str = "Unknown";

/// Where the current catalog came from, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataSource {
    #[default]
    NotLoaded,
    LocalFiles,
    CachedDownload,
    FreshDownload,
}

impl DataSource {
    /// Human-readable name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLoaded => "not loaded",
            Self::LocalFiles => "local files",
            Self::CachedDownload => "cached download",
            Self::FreshDownload => "fresh download",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flattened, queryable setting.
///
/// Serialized field names and order match the JSON export format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogEntry {
    /// Declared `NodeName` of the leaf.
    pub name: String,
    /// Canonical OMA-URI, always rooted at `./`.
    #[serde(rename = "OmaUri")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value encoding (`int`, `chr`, `bool`, ...).
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Comma-joined operation names, e.g. `Get, Replace`.
    pub access_types: String,
    /// Rendered constraint; empty when none is declared.
    pub allowed_values: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Populated by the query phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
    /// True only when the last query returned status 200.
    #[serde(skip)]
    pub has_applied_value: bool,
}

impl CatalogEntry {
    /// Whether the access types grant the `Get` operation.
    pub fn is_readable(&self) -> bool {
        self.access_types
            .split(',')
            .any(|op| op.trim().eq_ignore_ascii_case("Get"))
    }

    /// Record the outcome of a query.
    pub fn set_query_result(&mut self, value: String, success: bool) {
        self.current_value = Some(value);
        self.has_applied_value = success;
    }

    /// Mark the entry as not queried.
    pub fn clear_query_result(&mut self) {
        self.current_value = None;
        self.has_applied_value = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(access: &str) -> CatalogEntry {
        CatalogEntry {
            name: "AllowCamera".into(),
            path: "./Vendor/MSFT/Policy/Config/Camera/AllowCamera".into(),
            description: Some("Allow camera".into()),
            format: "int".into(),
            default_value: Some("1".into()),
            access_types: access.into(),
            allowed_values: "0 (Not allowed); 1 (Allowed)".into(),
            scope: None,
            current_value: None,
            has_applied_value: false,
        }
    }

    #[test]
    fn readable_matches_whole_operation_names() {
        assert!(entry("Add, Delete, Get, Replace").is_readable());
        assert!(entry("get").is_readable());
        assert!(!entry("Add, Replace").is_readable());
        assert!(!entry("").is_readable());
    }

    #[test]
    fn json_uses_export_field_names_and_omits_nulls() {
        let mut e = entry("Get");
        e.set_query_result("0".into(), true);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["OmaUri"], "./Vendor/MSFT/Policy/Config/Camera/AllowCamera");
        assert_eq!(json["CurrentValue"], "0");
        assert!(json.get("Scope").is_none());
        assert!(json.get("HasAppliedValue").is_none());
    }

    #[test]
    fn clear_resets_query_state() {
        let mut e = entry("Get");
        e.set_query_result("1".into(), true);
        e.clear_query_result();
        assert_eq!(e.current_value, None);
        assert!(!e.has_applied_value);
    }
}
