//! Rich diagnostic error types for DDF schema parsing.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from reading or parsing a DDF schema document.
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("malformed DDF document \"{origin}\": {message}")]
    #[diagnostic(
        code(cspscope::ddf::xml),
        help(
            "The file is not well-formed XML. Verify it is a DDF v2 document \
             and not truncated or corrupted."
        )
    )]
    Xml { origin: String, message: String },

    #[error("DDF document \"{origin}\" is not valid UTF-8 or UTF-16")]
    #[diagnostic(
        code(cspscope::ddf::encoding),
        help("Re-save the document as UTF-8.")
    )]
    Encoding { origin: String },

    #[error("DDF document \"{origin}\" nests elements deeper than {limit} levels")]
    #[diagnostic(
        code(cspscope::ddf::too_deep),
        help(
            "Published DDF files nest a few dozen levels at most. The document is \
             likely corrupted or not a DDF schema."
        )
    )]
    TooDeep { origin: String, limit: usize },

    #[error("failed to read DDF file: {path}")]
    #[diagnostic(
        code(cspscope::ddf::io),
        help("Check that the file exists and you have read permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for schema parsing results.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
