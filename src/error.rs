//! Rich diagnostic error types for cspscope.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::ddf::SchemaError;
use crate::gate::GateError;
use crate::ingest::IngestError;
use crate::mdm::ChannelError;
use crate::paths::PathError;

/// Top-level error type.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ProbeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Paths(#[from] PathError),

    #[error("query worker thread panicked")]
    #[diagnostic(
        code(cspscope::worker_panic),
        help("This is a bug. Re-run with RUST_LOG=debug and report the output.")
    )]
    WorkerPanicked,
}

/// Convenience alias for top-level results.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
