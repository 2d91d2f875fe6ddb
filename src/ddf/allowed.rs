//! Human-readable rendering of a node's `<MSFT:AllowedValues>` constraint.
//!
//! The constraint kind comes from the `ValueType` attribute; a missing
//! attribute means an enumeration.

use roxmltree::Node;

use crate::ddf::xml::{attr_ci, child_ci, elements, inner_text};

/// Rendered in place of an ADMX-backed policy's values.
pub const ADMX_TEMPLATE_PREFIX: &str = "ADMX";

/// Placeholder for an XSD constraint whose schema text is missing.
pub const XSD_PLACEHOLDER: &str = "(XSD schema)";

/// Reference to the ADMX file and policy that back a setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmxRef {
    pub file: String,
    pub name: String,
}

/// A parsed allowed-values constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedValues {
    /// `(value, description)` pairs.
    Enumeration(Vec<(String, String)>),
    /// Raw bound expression such as `[0-10000]`.
    Range(Option<String>),
    /// Policy backed by an ADMX definition.
    PolicyBacked(Option<AdmxRef>),
    /// Embedded XSD document text.
    StructuredSchema(Option<String>),
    /// Any `ValueType` this crate does not render (e.g. `RegEx`).
    Unknown(String),
}

impl AllowedValues {
    /// Parse a constraint element.
    pub fn from_node(allowed: Node<'_, '_>) -> Self {
        let kind = attr_ci(allowed, "ValueType").unwrap_or("ENUM");

        if kind.eq_ignore_ascii_case("ENUM") {
            let options = elements(allowed)
                .filter(|e| e.tag_name().name().eq_ignore_ascii_case("Enum"))
                .map(|en| {
                    let value = child_ci(en, "Value").map(inner_text).unwrap_or_default();
                    let desc = child_ci(en, "ValueDescription")
                        .map(inner_text)
                        .unwrap_or_default();
                    (value, desc)
                })
                .collect();
            Self::Enumeration(options)
        } else if kind.eq_ignore_ascii_case("Range") {
            Self::Range(child_ci(allowed, "Value").map(inner_text))
        } else if kind.eq_ignore_ascii_case("ADMX") {
            Self::PolicyBacked(child_ci(allowed, "AdmxBacked").map(|admx| AdmxRef {
                file: attr_ci(admx, "File").unwrap_or_default().to_string(),
                name: attr_ci(admx, "Name").unwrap_or_default().to_string(),
            }))
        } else if kind.eq_ignore_ascii_case("XSD") {
            Self::StructuredSchema(child_ci(allowed, "Value").map(inner_text))
        } else {
            Self::Unknown(kind.to_string())
        }
    }

    /// Display string; empty when nothing useful is declared.
    pub fn describe(&self) -> String {
        match self {
            Self::Enumeration(options) => options
                .iter()
                .map(|(value, desc)| format!("{value} ({desc})"))
                .collect::<Vec<_>>()
                .join("; "),
            Self::Range(bounds) => bounds.clone().unwrap_or_default(),
            Self::PolicyBacked(Some(admx)) => {
                format!("{ADMX_TEMPLATE_PREFIX}: {} / {}", admx.file, admx.name)
            }
            Self::PolicyBacked(None) => String::new(),
            Self::StructuredSchema(text) => {
                text.clone().unwrap_or_else(|| XSD_PLACEHOLDER.to_string())
            }
            Self::Unknown(_) => String::new(),
        }
    }
}

/// Render the allowed values declared under a `DFProperties` element.
pub fn describe_allowed_values(props: Node<'_, '_>) -> String {
    child_ci(props, "AllowedValues")
        .map(|allowed| AllowedValues::from_node(allowed).describe())
        .unwrap_or_default()
}
