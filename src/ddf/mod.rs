//! DDF (Device Description Framework) schema handling.
//!
//! A DDF document is a tree of `<Node>` elements. Leaf nodes with `Get`
//! access and a fully named ancestor chain become catalog entries; everything
//! else is walked but not emitted.

pub mod allowed;
pub mod error;
pub mod parser;
pub mod path;
mod xml;

pub use allowed::{AllowedValues, describe_allowed_values};
pub use error::{SchemaError, SchemaResult};
pub use parser::{MAX_NESTING_DEPTH, parse_bytes, parse_bytes_from, parse_document, parse_file};
pub use path::{combine, normalize_root};
