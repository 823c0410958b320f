//! Typed extraction from feed XML
//!
//! The feed is loosely typed: text fields are sometimes absent, sometimes
//! empty, sometimes padded with legacy whitespace. Every field read goes
//! through one of these helpers, each with a single documented default
//! policy: optional fields return `None`, required fields fail with an
//! error naming the tag.

use althingi_common::time::{sensible_date, sensible_datetime};
use althingi_common::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use roxmltree::Node;

/// First descendant element with the given tag name, in document order.
pub fn desc<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

/// All descendant elements with the given tag name, in document order.
pub fn desc_all<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Vec<Node<'a, 'i>> {
    node.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == tag)
        .collect()
}

/// Required descendant element.
pub fn req_desc<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Result<Node<'a, 'i>> {
    desc(node, tag).ok_or_else(|| Error::Xml(format!("missing element <{}>", tag)))
}

/// Trimmed text content of a node; `None` when absent or empty.
pub fn text(node: Node) -> Option<String> {
    let text = node.text()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Trimmed text of the first descendant with the given tag; `None` when the
/// tag is absent or holds no text.
pub fn child_text(node: Node, tag: &str) -> Option<String> {
    desc(node, tag).and_then(text)
}

/// Required non-empty text of a descendant tag.
pub fn req_child_text(node: Node, tag: &str) -> Result<String> {
    child_text(node, tag).ok_or_else(|| Error::Xml(format!("missing text in <{}>", tag)))
}

/// Integer attribute, required.
pub fn req_attr_int(node: Node, attr: &str) -> Result<i64> {
    let value = node
        .attribute(attr)
        .ok_or_else(|| Error::Xml(format!("missing attribute \"{}\"", attr)))?;
    value
        .trim()
        .parse()
        .map_err(|_| Error::Xml(format!("attribute \"{}\" is not a number: {}", attr, value)))
}

/// Integer attribute, optional; unparseable values count as absent.
pub fn opt_attr_int(node: Node, attr: &str) -> Option<i64> {
    node.attribute(attr)?.trim().parse().ok()
}

/// Integer text of a descendant tag, required.
pub fn req_child_int(node: Node, tag: &str) -> Result<i64> {
    let value = req_child_text(node, tag)?;
    value
        .parse()
        .map_err(|_| Error::Xml(format!("<{}> is not a number: {}", tag, value)))
}

/// Integer text of a descendant tag; absent or unparseable yields `None`.
pub fn opt_child_int(node: Node, tag: &str) -> Option<i64> {
    child_text(node, tag)?.parse().ok()
}

/// Date-time text of a descendant tag, required.
pub fn req_child_datetime(node: Node, tag: &str) -> Result<DateTime<Utc>> {
    sensible_datetime(&req_child_text(node, tag)?)
}

/// Date-time text of a descendant tag; absent or empty yields `None`,
/// malformed content is an error.
pub fn opt_child_datetime(node: Node, tag: &str) -> Result<Option<DateTime<Utc>>> {
    match child_text(node, tag) {
        Some(value) => sensible_datetime(&value).map(Some),
        None => Ok(None),
    }
}

/// Date text of a descendant tag; absent yields `None`.
pub fn opt_child_date(node: Node, tag: &str) -> Result<Option<NaiveDate>> {
    match child_text(node, tag) {
        Some(value) => sensible_date(&value).map(Some),
        None => Ok(None),
    }
}

/// Collapse internal whitespace runs to single spaces and trim.
///
/// Names from old terms (around the 116th parliament and earlier) carry
/// padding baggage that would otherwise defeat equality comparison.
pub fn collapse_ws(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <þingmaður id="1166">
            <nafn> Helgi Hrafn Gunnarsson </nafn>
            <fæðingardagur>1980-10-24</fæðingardagur>
            <netfang>
                <nafn>helgihg</nafn>
                <lén>althingi.is</lén>
            </netfang>
            <þingseta>
                <þing>148</þing>
                <inn>2017-12-14T00:00:00</inn>
                <þingsalssæti>17</þingsalssæti>
            </þingseta>
        </þingmaður>
    "#;

    #[test]
    fn test_desc_and_text() {
        let doc = roxmltree::Document::parse(SAMPLE).unwrap();
        let root = doc.root_element();

        assert_eq!(
            req_child_text(root, "nafn").unwrap(),
            "Helgi Hrafn Gunnarsson"
        );
        // desc finds the first <nafn> in document order, which is the
        // person's name, not the email account name.
        let email = req_desc(root, "netfang").unwrap();
        assert_eq!(req_child_text(email, "nafn").unwrap(), "helgihg");
    }

    #[test]
    fn test_attr_and_int_extraction() {
        let doc = roxmltree::Document::parse(SAMPLE).unwrap();
        let root = doc.root_element();

        assert_eq!(req_attr_int(root, "id").unwrap(), 1166);
        assert!(req_attr_int(root, "missing").is_err());

        let seat = req_desc(root, "þingseta").unwrap();
        assert_eq!(req_child_int(seat, "þing").unwrap(), 148);
        assert_eq!(opt_child_int(seat, "þingsalssæti"), Some(17));
        assert_eq!(opt_child_int(seat, "út"), None);
    }

    #[test]
    fn test_datetime_extraction() {
        let doc = roxmltree::Document::parse(SAMPLE).unwrap();
        let seat = req_desc(doc.root_element(), "þingseta").unwrap();

        let timing_in = req_child_datetime(seat, "inn").unwrap();
        assert_eq!(timing_in.to_rfc3339(), "2017-12-14T00:00:00+00:00");
        assert_eq!(opt_child_datetime(seat, "út").unwrap(), None);
    }

    #[test]
    fn test_empty_text_is_absent() {
        let doc = roxmltree::Document::parse("<a><b>   </b></a>").unwrap();
        assert_eq!(child_text(doc.root_element(), "b"), None);
    }

    #[test]
    fn test_collapse_ws() {
        assert_eq!(collapse_ws("  Umhverfis-   og  samgöngunefnd "), "Umhverfis- og samgöngunefnd");
    }
}
