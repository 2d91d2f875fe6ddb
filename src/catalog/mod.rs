//! In-memory catalog of flattened DDF settings.
//!
//! The catalog is replaced wholesale on every ingestion pass; there is no
//! incremental patching. Entries are filtered for display and exported as a
//! JSON array.

pub mod error;
pub mod model;

use std::path::Path;

pub use error::{CatalogError, CatalogResult};
pub use model::{CatalogEntry, DataSource, UNKNOWN_FORMAT};

/// Display filter over catalog entries.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Case-insensitive substring matched against every text field.
    pub keyword: Option<String>,
    /// Keep only entries whose last query succeeded.
    pub only_applied: bool,
}

impl CatalogFilter {
    /// Whether `entry` passes this filter.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if self.only_applied && !entry.has_applied_value {
            return false;
        }
        let Some(term) = self
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return true;
        };
        let term = term.to_lowercase();
        let hit = |field: &str| field.to_lowercase().contains(&term);

        hit(&entry.name)
            || hit(&entry.path)
            || entry.description.as_deref().is_some_and(hit)
            || entry.current_value.as_deref().is_some_and(hit)
            || entry.default_value.as_deref().is_some_and(hit)
            || hit(&entry.format)
            || hit(&entry.access_types)
            || hit(&entry.allowed_values)
            || entry.scope.as_deref().is_some_and(hit)
    }
}

/// The current set of entries and where they came from.
#[derive(Debug, Default)]
pub struct PolicyCatalog {
    source: DataSource,
    entries: Vec<CatalogEntry>,
}

impl PolicyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every entry with a new ingestion pass.
    pub fn replace(&mut self, source: DataSource, entries: Vec<CatalogEntry>) {
        tracing::debug!(%source, count = entries.len(), "replacing catalog");
        self.source = source;
        self.entries = entries;
    }

    /// Drop all entries and forget the data source.
    pub fn clear(&mut self) {
        self.source = DataSource::NotLoaded;
        self.entries.clear();
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [CatalogEntry] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries passing `filter`, in catalog order.
    pub fn search(&self, filter: &CatalogFilter) -> Vec<&CatalogEntry> {
        self.entries.iter().filter(|e| filter.matches(e)).collect()
    }

    /// Write the filtered view to `path` as pretty JSON. Returns the number
    /// of entries written.
    pub fn export_json(&self, path: &Path, filter: &CatalogFilter) -> CatalogResult<usize> {
        let view = self.search(filter);
        let json = serde_json::to_string_pretty(&view).map_err(|e| CatalogError::Serialize {
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| CatalogError::ExportWrite {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), count = view.len(), "exported catalog");
        Ok(view.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, value: Option<&str>, applied: bool) -> CatalogEntry {
        CatalogEntry {
            name: name.into(),
            path: format!("./Vendor/MSFT/Policy/Config/Test/{name}"),
            description: None,
            format: "int".into(),
            default_value: None,
            access_types: "Get, Replace".into(),
            allowed_values: String::new(),
            scope: Some("Dynamic".into()),
            current_value: value.map(String::from),
            has_applied_value: applied,
        }
    }

    fn sample() -> PolicyCatalog {
        let mut catalog = PolicyCatalog::new();
        catalog.replace(
            DataSource::LocalFiles,
            vec![
                entry("AllowCamera", Some("1"), true),
                entry("AllowBluetooth", Some("Not Found"), false),
                entry("DisableTelemetry", None, false),
            ],
        );
        catalog
    }

    #[test]
    fn replace_and_clear() {
        let mut catalog = sample();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.source(), DataSource::LocalFiles);

        catalog.replace(DataSource::CachedDownload, vec![entry("Only", None, false)]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.source(), DataSource::CachedDownload);

        catalog.clear();
        assert!(catalog.is_empty());
        assert_eq!(catalog.source(), DataSource::NotLoaded);
    }

    #[test]
    fn keyword_search_is_case_insensitive() {
        let catalog = sample();
        let filter = CatalogFilter {
            keyword: Some("allow".into()),
            only_applied: false,
        };
        let hits = catalog.search(&filter);
        assert_eq!(hits.len(), 2);

        let filter = CatalogFilter {
            keyword: Some("not found".into()),
            only_applied: false,
        };
        assert_eq!(catalog.search(&filter)[0].name, "AllowBluetooth");
    }

    #[test]
    fn blank_keyword_matches_everything() {
        let catalog = sample();
        let filter = CatalogFilter {
            keyword: Some("   ".into()),
            only_applied: false,
        };
        assert_eq!(catalog.search(&filter).len(), 3);
    }

    #[test]
    fn only_applied_combines_with_keyword() {
        let catalog = sample();
        let filter = CatalogFilter {
            keyword: Some("allow".into()),
            only_applied: true,
        };
        let hits = catalog.search(&filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "AllowCamera");
    }

    #[test]
    fn export_writes_filtered_json_array() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("export.json");
        let catalog = sample();

        let written = catalog
            .export_json(
                &out,
                &CatalogFilter {
                    keyword: None,
                    only_applied: true,
                },
            )
            .unwrap();
        assert_eq!(written, 1);

        let data = std::fs::read_to_string(&out).unwrap();
        let parsed: Vec<CatalogEntry> = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "AllowCamera");
        assert_eq!(parsed[0].current_value.as_deref(), Some("1"));
        // Not part of the export format.
        assert!(!parsed[0].has_applied_value);
    }
}
