//! Rich diagnostic error types for the embedded-mode gate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from reading, writing or deriving the embedded-mode flag.
#[derive(Debug, Error, Diagnostic)]
pub enum GateError {
    #[error("flag store operation failed: {operation}")]
    #[diagnostic(
        code(cspscope::gate::store),
        help(
            "Writing the embeddedmode Parameters key requires an elevated process. \
             Re-run from an administrator prompt."
        )
    )]
    Store {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine the machine identifier: {message}")]
    #[diagnostic(
        code(cspscope::gate::identity),
        help(
            "The gate derives its key from the SMBIOS system UUID \
             (Win32_ComputerSystemProduct). Check that WMI is reachable."
        )
    )]
    Identity { message: String },
}

/// Convenience alias for gate results.
pub type GateResult<T> = std::result::Result<T, GateError>;
