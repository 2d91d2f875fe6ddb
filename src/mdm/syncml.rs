//! SyncML request building and response parsing.
//!
//! Requests are a bare `<SyncBody>` with one `<Get>`; the local management
//! stack wraps them itself. Responses carry a message-level `<Status>` first
//! and the command-level `<Status>` second.

use roxmltree::{Document, Node, ParsingOptions};

/// Status code reported when the response cannot be parsed.
pub const UNPARSEABLE_STATUS: i32 = -1;

/// Build a `<SyncBody>` containing a single `Get` for `loc_uri`.
pub fn build_get(loc_uri: &str, cmd_id: u32) -> String {
    format!(
        "<SyncBody>\n\
         <Get>\n  \
         <CmdID>{cmd_id}</CmdID>\n  \
         <Item>\n    \
         <Target>\n      \
         <LocURI>{}</LocURI>\n    \
         </Target>\n  \
         </Item>\n\
         </Get>\n\
         </SyncBody>",
        escape_xml(loc_uri)
    )
}

/// Escape the five XML special characters.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// The parts of a SyncML response the client cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResponse {
    /// Command-level status, or [`UNPARSEABLE_STATUS`].
    pub status: i32,
    /// Text of the first `Results/Item/Data`, empty if none.
    pub data: String,
}

impl SyncResponse {
    /// Parse a response body; never fails.
    pub fn parse(xml: &str) -> Self {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        match Document::parse_with_options(xml, options) {
            Ok(doc) => Self {
                status: command_status(&doc).unwrap_or(UNPARSEABLE_STATUS),
                data: result_data(&doc).unwrap_or_default(),
            },
            Err(e) => {
                tracing::debug!(error = %e, "unparseable SyncML response");
                Self {
                    status: UNPARSEABLE_STATUS,
                    data: String::new(),
                }
            }
        }
    }
}

fn named<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn text_of(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

fn command_status(doc: &Document<'_>) -> Option<i32> {
    let status = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Status")
        .nth(1)?;
    named(status, "Data")
        .map(|data| text_of(data).trim().parse::<i32>())
        .find_map(Result::ok)
}

fn result_data(doc: &Document<'_>) -> Option<String> {
    let results = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "Results")?;
    named(results, "Item")
        .find_map(|item| named(item, "Data").next())
        .map(text_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str, data: Option<&str>) -> String {
        let results = data
            .map(|d| {
                format!(
                    "<Results><CmdID>3</CmdID><MsgRef>1</MsgRef><CmdRef>2</CmdRef>\
                     <Item><Source><LocURI>./Vendor/MSFT/Policy</LocURI></Source>\
                     <Meta><Format xmlns=\"syncml:metinf\">int</Format></Meta>\
                     <Data>{d}</Data></Item></Results>"
                )
            })
            .unwrap_or_default();
        format!(
            "<SyncML><SyncBody>\
             <Status><CmdID>1</CmdID><MsgRef>1</MsgRef><CmdRef>0</CmdRef><Cmd>SyncHdr</Cmd><Data>200</Data></Status>\
             <Status><CmdID>2</CmdID><MsgRef>1</MsgRef><CmdRef>2</CmdRef><Cmd>Get</Cmd><Data>{status}</Data></Status>\
             {results}</SyncBody></SyncML>"
        )
    }

    #[test]
    fn request_wraps_single_get() {
        let body = build_get("./Vendor/MSFT/Policy/Config/Camera/AllowCamera", 7);
        let doc = Document::parse(&body).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "SyncBody");
        let get = named(root, "Get").next().unwrap();
        assert_eq!(text_of(named(get, "CmdID").next().unwrap()), "7");
        let loc = get
            .descendants()
            .find(|n| n.tag_name().name() == "LocURI")
            .unwrap();
        assert_eq!(text_of(loc), "./Vendor/MSFT/Policy/Config/Camera/AllowCamera");
    }

    #[test]
    fn request_escapes_address() {
        let body = build_get("./a&b/<c>/\"d\"/'e'", 1);
        assert!(body.contains("<LocURI>./a&amp;b/&lt;c&gt;/&quot;d&quot;/&apos;e&apos;</LocURI>"));
        assert!(Document::parse(&body).is_ok());
    }

    #[test]
    fn second_status_is_the_command_status() {
        let parsed = SyncResponse::parse(&response("404", None));
        assert_eq!(parsed.status, 404);
        assert_eq!(parsed.data, "");
    }

    #[test]
    fn results_data_is_extracted() {
        let parsed = SyncResponse::parse(&response("200", Some("5")));
        assert_eq!(parsed.status, 200);
        assert_eq!(parsed.data, "5");
    }

    #[test]
    fn garbage_and_single_status_are_unparseable() {
        assert_eq!(SyncResponse::parse("not xml").status, UNPARSEABLE_STATUS);
        assert_eq!(SyncResponse::parse("").status, UNPARSEABLE_STATUS);
        let single = "<SyncML><SyncBody><Status><Data>200</Data></Status></SyncBody></SyncML>";
        assert_eq!(SyncResponse::parse(single).status, UNPARSEABLE_STATUS);
        let non_numeric = response("OK", None);
        assert_eq!(SyncResponse::parse(&non_numeric).status, UNPARSEABLE_STATUS);
    }
}
