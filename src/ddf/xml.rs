//! Small lookup helpers over `roxmltree` nodes.
//!
//! DDF files mix un-namespaced structural elements (`Node`, `DFProperties`)
//! with `MSFT:`-prefixed extensions, so lookups go by local name only.

use roxmltree::Node;

/// Element children of `node`.
pub(crate) fn elements<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// First element child whose local name equals `name` exactly.
pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

/// First element child whose local name equals `name`, ignoring ASCII case.
pub(crate) fn child_ci<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name().eq_ignore_ascii_case(name))
}

/// Attribute value by local name, ignoring ASCII case and namespace.
pub(crate) fn attr_ci<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
}

/// Concatenated text of all descendant text nodes (CDATA included).
pub(crate) fn inner_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

/// Local name of the first element child, if any.
pub(crate) fn first_child_name<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    elements(node).next().map(|n| n.tag_name().name())
}

/// Whether element nesting in `text` goes deeper than `limit`.
///
/// A lexical scan that skips comments, CDATA, processing instructions,
/// declarations and quoted attribute values. Malformed input is left for the
/// real parser to reject.
pub(crate) fn nesting_exceeds(text: &str, limit: usize) -> bool {
    let b = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < b.len() {
        if b[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &b[i..];
        i += if rest.starts_with(b"<!--") {
            skip_past(rest, b"-->")
        } else if rest.starts_with(b"<![CDATA[") {
            skip_past(rest, b"]]>")
        } else if rest.starts_with(b"<?") {
            skip_past(rest, b"?>")
        } else if rest.starts_with(b"<!") {
            skip_declaration(rest)
        } else if rest.starts_with(b"</") {
            depth = depth.saturating_sub(1);
            skip_past(rest, b">")
        } else {
            let (len, self_closing) = scan_start_tag(rest);
            if !self_closing {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            len
        };
    }
    false
}

/// Bytes up to and including the first `end`, or everything if absent.
fn skip_past(hay: &[u8], end: &[u8]) -> usize {
    hay.windows(end.len())
        .position(|w| w == end)
        .map_or(hay.len(), |p| p + end.len())
}

/// Length of a `<!...>` declaration, including any `[...]` internal subset.
fn skip_declaration(hay: &[u8]) -> usize {
    let mut brackets = 0usize;
    let mut quote = None;
    for (i, &c) in hay.iter().enumerate() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(c),
            (None, b'[') => brackets += 1,
            (None, b']') => brackets = brackets.saturating_sub(1),
            (None, b'>') if brackets == 0 => return i + 1,
            _ => {}
        }
    }
    hay.len()
}

/// Length of a start tag and whether it closes itself (`<a/>`).
fn scan_start_tag(hay: &[u8]) -> (usize, bool) {
    let mut quote = None;
    for (i, &c) in hay.iter().enumerate() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(c),
            (None, b'>') => return (i + 1, i > 0 && hay[i - 1] == b'/'),
            _ => {}
        }
    }
    (hay.len(), false)
}
