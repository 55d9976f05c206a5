//! Owned markup tree.
//!
//! Pages are parsed with `scraper` and immediately converted into a plain
//! owned tree of [`MarkupNode`] values. The owned tree is `Send`, so a parsed
//! page can be carried across `.await` points inside worker tasks, and the
//! query helpers in [`query`] stay independent of the parser.

pub mod query;

use std::collections::HashMap;

use scraper::{ElementRef, Html, Node};

pub use query::{
    find_all, find_all_in, find_by_attr, find_by_class, find_by_id, find_by_tag, find_with_attr,
    text_content,
};

/// A node of a parsed page: either an element or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    Text(String),
}

/// An element node with its tag, attributes and ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<MarkupNode>,
}

impl Element {
    /// Create an element without attributes or children.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style child element append.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(MarkupNode::Element(child));
        self
    }

    /// Builder-style text append.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(MarkupNode::Text(text.into()));
        self
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the whitespace-separated `class` attribute contains `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Parse an HTML document into an owned tree rooted at the `<html>` element.
///
/// Parsing never fails: malformed markup is repaired by the HTML5 parser the
/// same way a browser would. Comments, doctypes and processing instructions
/// are dropped.
#[must_use]
pub fn parse_html(html: &str) -> Element {
    let document = Html::parse_document(html);
    convert_element(document.root_element())
}

fn convert_element(element: ElementRef<'_>) -> Element {
    let value = element.value();
    let attributes = value
        .attrs()
        .map(|(name, val)| (name.to_string(), val.to_string()))
        .collect();

    let mut children = Vec::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => children.push(MarkupNode::Text(String::from(&**text))),
            Node::Element(_) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    children.push(MarkupNode::Element(convert_element(child_ref)));
                }
            }
            _ => {}
        }
    }

    Element {
        tag: value.name().to_string(),
        attributes,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_html_builds_owned_tree() {
        let root = parse_html(
            r#"<html><body><div id="main" class="a b">Hello <b>world</b><!-- note --></div></body></html>"#,
        );

        assert_eq!(root.tag, "html");
        let divs = find_by_tag(&root, "div");
        assert_eq!(divs.len(), 1);
        assert_eq!(divs[0].attr("id"), Some("main"));
        assert!(divs[0].has_class("b"));
        assert_eq!(divs[0].children.len(), 2);
        assert_eq!(text_content(divs[0]), "Hello world");
    }

    #[test]
    fn test_parse_html_lowercases_tags_and_attributes() {
        let root = parse_html(
            r##"<TABLE CellSpacing="10"><TR><TD BGCOLOR="#ffffff">x</TD></TR></TABLE>"##,
        );

        let cells = find_by_attr(&root, "bgcolor", "#ffffff");
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].tag, "td");
        assert_eq!(find_by_attr(&root, "cellspacing", "10").len(), 1);
    }

    #[test]
    fn test_parse_html_decodes_entities() {
        let root = parse_html("<p>Od:&nbsp;Jano</p>");
        let p = find_by_tag(&root, "p");
        assert_eq!(text_content(p[0]), "Od:\u{a0}Jano");
    }

    #[test]
    fn test_has_class_matches_tokens_only() {
        let el = Element::new("div").with_attr("class", "box_title wide");
        assert!(el.has_class("box_title"));
        assert!(el.has_class("wide"));
        assert!(!el.has_class("box"));
    }
}
