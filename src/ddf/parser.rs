//! DDF tree walk: nested `<Node>` elements → flat catalog entries.
//!
//! The walk uses an explicit work stack of `(node, base path, unresolved)`
//! so pathological schema depth cannot overflow the call stack. Children are
//! pushed in reverse, which keeps the output in document (pre-)order.

use std::borrow::Cow;
use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};

use crate::catalog::{CatalogEntry, UNKNOWN_FORMAT};
use crate::ddf::allowed::describe_allowed_values;
use crate::ddf::error::{SchemaError, SchemaResult};
use crate::ddf::path::{combine, ensure_root, normalize_root};
use crate::ddf::xml::{child, elements, first_child_name, inner_text, nesting_exceeds};

/// Deepest element nesting accepted before parsing. The XML parser recurses
/// per level, so this bounds its stack use on a default-sized thread.
pub const MAX_NESTING_DEPTH: usize = 128;

struct Pending<'a, 'input> {
    node: Node<'a, 'input>,
    base: String,
    /// True when this node or an ancestor has no `NodeName`.
    unresolved: bool,
}

/// Flatten a parsed DDF document into catalog entries.
pub fn parse_document(doc: &Document<'_>) -> Vec<CatalogEntry> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    push_child_nodes(&mut stack, doc.root_element(), "", false);

    while let Some(Pending {
        node,
        base,
        unresolved,
    }) = stack.pop()
    {
        let name = child(node, "NodeName")
            .map(|n| inner_text(n).trim().to_string())
            .unwrap_or_default();

        let base = child(node, "Path")
            .map(inner_text)
            .filter(|p| !p.trim().is_empty())
            .map(|p| normalize_root(&p))
            .unwrap_or(base);

        let dynamic = name.is_empty();
        let current = if dynamic {
            base
        } else {
            combine(&base, &name)
        };
        let unresolved = unresolved || dynamic;

        if let Some(props) = child(node, "DFProperties") {
            if let Some(entry) = leaf_entry(props, &name, &current, unresolved) {
                out.push(entry);
            }
        }

        push_child_nodes(&mut stack, node, &current, unresolved);
    }

    out
}

/// Decode and parse one DDF document held in memory.
///
/// `origin` names the document in errors (a file path or archive entry).
pub fn parse_bytes_from(data: &[u8], origin: &str) -> SchemaResult<Vec<CatalogEntry>> {
    let text = decode(data, origin)?;
    if nesting_exceeds(&text, MAX_NESTING_DEPTH) {
        return Err(SchemaError::TooDeep {
            origin: origin.to_string(),
            limit: MAX_NESTING_DEPTH,
        });
    }
    let options = ParsingOptions {
        // DDF files carry a `<!DOCTYPE MgmtTree ...>` declaration.
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(&text, options).map_err(|e| SchemaError::Xml {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;
    let entries = parse_document(&doc);
    tracing::debug!(origin, count = entries.len(), "parsed DDF document");
    Ok(entries)
}

/// Parse a DDF document from a byte slice.
pub fn parse_bytes(data: &[u8]) -> SchemaResult<Vec<CatalogEntry>> {
    parse_bytes_from(data, "(inline)")
}

/// Read and parse a DDF file from disk.
pub fn parse_file(path: &Path) -> SchemaResult<Vec<CatalogEntry>> {
    let data = std::fs::read(path).map_err(|e| SchemaError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_bytes_from(&data, &path.display().to_string())
}

fn push_child_nodes<'a, 'input>(
    stack: &mut Vec<Pending<'a, 'input>>,
    parent: Node<'a, 'input>,
    base: &str,
    unresolved: bool,
) {
    let nodes: Vec<_> = elements(parent)
        .filter(|n| n.tag_name().name().eq_ignore_ascii_case("Node"))
        .collect();
    for node in nodes.into_iter().rev() {
        stack.push(Pending {
            node,
            base: base.to_string(),
            unresolved,
        });
    }
}

/// Build an entry for `props` if it describes a readable, fully named leaf.
fn leaf_entry(
    props: Node<'_, '_>,
    name: &str,
    current_path: &str,
    unresolved: bool,
) -> Option<CatalogEntry> {
    let format = child(props, "DFFormat");
    let is_leaf = format.is_none_or(|f| {
        !elements(f).any(|e| e.tag_name().name().eq_ignore_ascii_case("node"))
    });
    if !is_leaf {
        return None;
    }

    let access = child(props, "AccessType");
    let readable = access.is_some_and(|a| {
        elements(a).any(|op| op.tag_name().name().eq_ignore_ascii_case("Get"))
    });
    if !readable {
        return None;
    }
    if unresolved {
        tracing::trace!(path = current_path, "skipping leaf under dynamic node");
        return None;
    }

    let access_types = access
        .map(|a| {
            elements(a)
                .map(|op| op.tag_name().name())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    Some(CatalogEntry {
        name: name.to_string(),
        path: ensure_root(current_path),
        description: child(props, "Description").map(|d| inner_text(d).trim().to_string()),
        format: format
            .and_then(first_child_name)
            .unwrap_or(UNKNOWN_FORMAT)
            .to_string(),
        default_value: child(props, "DefaultValue").map(inner_text),
        access_types,
        allowed_values: describe_allowed_values(props),
        scope: child(props, "Scope")
            .and_then(first_child_name)
            .map(str::to_string),
        current_value: None,
        has_applied_value: false,
    })
}

fn decode<'d>(data: &'d [u8], origin: &str) -> SchemaResult<Cow<'d, str>> {
    let encoding_error = || SchemaError::Encoding {
        origin: origin.to_string(),
    };

    if let Some(rest) = data.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return std::str::from_utf8(rest)
            .map(Cow::Borrowed)
            .map_err(|_| encoding_error());
    }

    let utf16 = |rest: &[u8], from: fn([u8; 2]) -> u16| {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| from([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units)
            .map(Cow::Owned)
            .map_err(|_| encoding_error())
    };
    if let Some(rest) = data.strip_prefix(&[0xFF, 0xFE]) {
        return utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = data.strip_prefix(&[0xFE, 0xFF]) {
        return utf16(rest, u16::from_be_bytes);
    }

    std::str::from_utf8(data)
        .map(Cow::Borrowed)
        .map_err(|_| encoding_error())
}
