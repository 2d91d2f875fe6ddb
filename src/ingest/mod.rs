//! Schema ingestion: local files, then the cached package, then a fresh
//! download.
//!
//! The first tier that yields at least one entry wins. The downloaded package
//! is kept as raw bytes for the lifetime of the [`SchemaIngestion`] value and
//! re-parsed on every cached load; [`SchemaIngestion::clear_cache`] forgets it.

pub mod error;

use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{IngestError, IngestResult};

use crate::catalog::{CatalogEntry, DataSource};
use crate::config::ProbeConfig;
use crate::ddf;

/// Published DDF v2 package.
pub const DEFAULT_PACKAGE_URL: &str = "https://download.microsoft.com/download/2ff2c8b9-2e3f-47af-89e6-11c19b7f0c2a/DDFv2Sept25.zip";

/// Archive entries with this suffix are parsed as DDF documents.
pub const DEFAULT_SCHEMA_EXTENSION: &str = ".xml";

/// Downloads a schema package.
pub trait PackageFetcher: Send {
    fn fetch(&self, url: &str) -> IngestResult<Vec<u8>>;
}

/// Blocking HTTP GET via `ureq`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

impl PackageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> IngestResult<Vec<u8>> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response = agent.get(url).call().map_err(|e| IngestError::Fetch {
            url: url.into(),
            message: e.to_string(),
        })?;

        let mut data = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut data)
            .map_err(|e| IngestError::Fetch {
                url: url.into(),
                message: format!("read body: {e}"),
            })?;
        tracing::info!(url, bytes = data.len(), "downloaded DDF package");
        Ok(data)
    }
}

/// Entries produced by one ingestion pass and the tier that produced them.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub source: DataSource,
    pub entries: Vec<CatalogEntry>,
}

impl IngestOutcome {
    fn new(source: DataSource, entries: Vec<CatalogEntry>) -> Self {
        Self { source, entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tiered DDF loader owning the downloaded-package cache.
pub struct SchemaIngestion {
    fetcher: Box<dyn PackageFetcher>,
    package_url: String,
    extension: String,
    cache: Option<Vec<u8>>,
}

impl SchemaIngestion {
    pub fn new(fetcher: impl PackageFetcher + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            package_url: DEFAULT_PACKAGE_URL.to_string(),
            extension: DEFAULT_SCHEMA_EXTENSION.to_string(),
            cache: None,
        }
    }

    /// HTTP-backed ingestion using the URL, extension and timeout from `config`.
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(HttpFetcher::new(Duration::from_secs(config.http_timeout_secs)))
            .with_package_url(&config.package_url)
            .with_extension(&config.schema_extension)
    }

    pub fn with_package_url(mut self, url: &str) -> Self {
        self.package_url = url.to_string();
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    pub fn package_url(&self) -> &str {
        &self.package_url
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Forget the downloaded package.
    pub fn clear_cache(&mut self) {
        if self.cache.take().is_some() {
            tracing::debug!("cleared cached DDF package");
        }
    }

    /// Parse each existing file independently. Missing files are skipped and
    /// unparseable ones logged.
    pub fn load_from_local_files(&self, paths: &[PathBuf]) -> IngestOutcome {
        let mut entries = Vec::new();
        for path in paths {
            if !path.is_file() {
                tracing::debug!(file = %path.display(), "local DDF file not found, skipping");
                continue;
            }
            match ddf::parse_file(path) {
                Ok(parsed) => entries.extend(parsed),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping unparseable DDF file")
                }
            }
        }
        IngestOutcome::new(DataSource::LocalFiles, entries)
    }

    /// Re-parse the cached package, if there is one.
    pub fn load_from_cache(&self) -> IngestResult<Option<IngestOutcome>> {
        let Some(bytes) = self.cache.as_deref() else {
            return Ok(None);
        };
        let entries = parse_package(bytes, &self.extension)?;
        Ok(Some(IngestOutcome::new(DataSource::CachedDownload, entries)))
    }

    /// Download a fresh package, cache it, and parse it.
    pub fn load_from_remote(&mut self, url: &str) -> IngestResult<IngestOutcome> {
        let bytes = self.fetcher.fetch(url)?;
        let entries = parse_package(&bytes, &self.extension)?;
        self.cache = Some(bytes);
        Ok(IngestOutcome::new(DataSource::FreshDownload, entries))
    }

    /// Walk the tiers in order and return the first non-empty result.
    ///
    /// When every tier comes back empty the outcome is empty with
    /// [`DataSource::NotLoaded`].
    pub fn load(&mut self, local_files: &[PathBuf]) -> IngestResult<IngestOutcome> {
        if !local_files.is_empty() {
            let outcome = self.load_from_local_files(local_files);
            if !outcome.is_empty() {
                tracing::info!(count = outcome.entries.len(), "loaded DDF schemas from local files");
                return Ok(outcome);
            }
        }

        match self.load_from_cache() {
            Ok(Some(outcome)) if !outcome.is_empty() => {
                tracing::info!(count = outcome.entries.len(), "loaded DDF schemas from cached package");
                return Ok(outcome);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "cached DDF package unusable, discarding");
                self.clear_cache();
            }
        }

        let url = self.package_url.clone();
        let outcome = self.load_from_remote(&url)?;
        if outcome.is_empty() {
            tracing::warn!(url, "no DDF schemas found in any source");
            return Ok(IngestOutcome::default());
        }
        tracing::info!(count = outcome.entries.len(), "loaded DDF schemas from downloaded package");
        Ok(outcome)
    }
}

impl std::fmt::Debug for SchemaIngestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaIngestion")
            .field("package_url", &self.package_url)
            .field("extension", &self.extension)
            .field("cached_bytes", &self.cache.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// Parse every schema entry of a zip package, skipping entries that fail.
pub fn parse_package(bytes: &[u8], extension: &str) -> IngestResult<Vec<CatalogEntry>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| IngestError::Archive {
            message: e.to_string(),
        })?;
    let extension = extension.to_ascii_lowercase();

    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping unreadable archive entry");
                continue;
            }
        };
        let name = file.name().to_string();
        if file.is_dir() || !name.to_ascii_lowercase().ends_with(&extension) {
            continue;
        }

        let mut data = Vec::new();
        if let Err(source) = file.read_to_end(&mut data) {
            let e = IngestError::Io {
                entry: name.clone(),
                source,
            };
            tracing::warn!(entry = %name, error = %e, "skipping archive entry");
            continue;
        }
        match ddf::parse_bytes_from(&data, &name) {
            Ok(parsed) => entries.extend(parsed),
            Err(e) => tracing::warn!(entry = %name, error = %e, "skipping unparseable DDF entry"),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DDF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<MgmtTree>
  <Node>
    <NodeName>Camera</NodeName>
    <Path>./Vendor/MSFT/Policy/Config</Path>
    <DFProperties><DFFormat><node /></DFFormat></DFProperties>
    <Node>
      <NodeName>AllowCamera</NodeName>
      <DFProperties>
        <AccessType><Get /><Replace /></AccessType>
        <DFFormat><int /></DFFormat>
      </DFProperties>
    </Node>
  </Node>
</MgmtTree>"#;

    #[derive(Clone)]
    struct CountingFetcher {
        package: Vec<u8>,
        calls: Arc<AtomicUsize>,
    }

    impl PackageFetcher for CountingFetcher {
        fn fetch(&self, _url: &str) -> IngestResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.package.clone())
        }
    }

    struct FailingFetcher;

    impl PackageFetcher for FailingFetcher {
        fn fetch(&self, url: &str) -> IngestResult<Vec<u8>> {
            Err(IngestError::Fetch {
                url: url.into(),
                message: "offline".into(),
            })
        }
    }

    fn package(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn counting(files: &[(&str, &str)]) -> (SchemaIngestion, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = CountingFetcher {
            package: package(files),
            calls: Arc::clone(&calls),
        };
        (SchemaIngestion::new(fetcher), calls)
    }

    #[test]
    fn local_files_short_circuit_remote() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("Camera.xml");
        std::fs::write(&file, DDF).unwrap();

        let (mut ingestion, calls) = counting(&[("Other.xml", DDF)]);
        let outcome = ingestion.load(&[file]).unwrap();

        assert_eq!(outcome.source, DataSource::LocalFiles);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!ingestion.has_cache());
    }

    #[test]
    fn missing_and_broken_local_files_fall_through() {
        let dir = tempfile::TempDir::new().unwrap();
        let broken = dir.path().join("Broken.xml");
        std::fs::write(&broken, "<MgmtTree><Node>").unwrap();
        let missing = dir.path().join("Missing.xml");

        let (mut ingestion, calls) = counting(&[("Camera.xml", DDF)]);
        let outcome = ingestion.load(&[missing, broken]).unwrap();

        assert_eq!(outcome.source, DataSource::FreshDownload);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bad_local_files_do_not_hide_good_ones() {
        let dir = tempfile::TempDir::new().unwrap();
        let broken = dir.path().join("Broken.xml");
        std::fs::write(&broken, "<MgmtTree><Node>").unwrap();
        let good = dir.path().join("Camera.xml");
        std::fs::write(&good, DDF).unwrap();
        let missing = dir.path().join("Missing.xml");

        let (ingestion, calls) = counting(&[]);
        let outcome = ingestion.load_from_local_files(&[broken, missing, good]);

        assert_eq!(outcome.source, DataSource::LocalFiles);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].name, "AllowCamera");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_load_uses_cache() {
        let (mut ingestion, calls) = counting(&[("Camera.xml", DDF)]);
        assert_eq!(ingestion.load(&[]).unwrap().source, DataSource::FreshDownload);
        let again = ingestion.load(&[]).unwrap();
        assert_eq!(again.source, DataSource::CachedDownload);
        assert_eq!(again.entries.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        ingestion.clear_cache();
        assert_eq!(ingestion.load(&[]).unwrap().source, DataSource::FreshDownload);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn package_filters_by_extension_and_skips_bad_entries() {
        let bytes = package(&[
            ("ddf/Camera.XML", DDF),
            ("ddf/readme.txt", DDF),
            ("ddf/Broken.xml", "<MgmtTree>"),
            ("ddf/Camera2.xml", DDF),
        ]);
        let entries = parse_package(&bytes, ".xml").unwrap();
        assert_eq!(entries.len(), 2);
        // Overlapping paths from different files are kept as-is.
        assert_eq!(entries[0].path, entries[1].path);
    }

    #[test]
    fn invalid_archive_is_an_error() {
        assert!(matches!(
            parse_package(b"not a zip", ".xml"),
            Err(IngestError::Archive { .. })
        ));
    }

    #[test]
    fn fetch_failure_propagates() {
        let mut ingestion = SchemaIngestion::new(FailingFetcher);
        assert!(matches!(ingestion.load(&[]), Err(IngestError::Fetch { .. })));
        assert!(!ingestion.has_cache());
    }

    #[test]
    fn empty_everywhere_reports_not_loaded() {
        let (mut ingestion, _) = counting(&[("notes.txt", "nothing")]);
        let outcome = ingestion.load(&[]).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.source, DataSource::NotLoaded);
    }

    #[test]
    fn load_from_cache_without_cache_is_none() {
        let (ingestion, _) = counting(&[]);
        assert!(ingestion.load_from_cache().unwrap().is_none());
    }
}
