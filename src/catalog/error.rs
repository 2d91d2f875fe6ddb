//! Rich diagnostic error types for the policy catalog.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from catalog operations.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("failed to serialize catalog: {message}")]
    #[diagnostic(
        code(cspscope::catalog::serialize),
        help("This indicates a bug; catalog entries only contain plain strings.")
    )]
    Serialize { message: String },

    #[error("failed to write export file: {path}")]
    #[diagnostic(
        code(cspscope::catalog::export_write),
        help("Check that the target directory exists and you have write permissions.")
    )]
    ExportWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for catalog operation results.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
