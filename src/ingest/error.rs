//! Rich diagnostic error types for schema ingestion.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from obtaining a DDF schema package.
#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("failed to fetch DDF package from {url}: {message}")]
    #[diagnostic(
        code(cspscope::ingest::fetch),
        help(
            "Check network connectivity, or pass local DDF files with --file. \
             The package URL can be changed in the config file (package_url)."
        )
    )]
    Fetch { url: String, message: String },

    #[error("invalid DDF package archive: {message}")]
    #[diagnostic(
        code(cspscope::ingest::archive),
        help("The downloaded package is not a readable zip archive. Clear the cache and retry.")
    )]
    Archive { message: String },

    #[error("failed to read archive entry \"{entry}\"")]
    #[diagnostic(code(cspscope::ingest::io))]
    Io {
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for ingestion results.
pub type IngestResult<T> = std::result::Result<T, IngestError>;
