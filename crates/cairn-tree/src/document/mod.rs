//! Parsed HTML documents.
//!
//! A [`Document`] is the structured form of a page's HTML content. Renderers
//! that need to edit markup (inject assets, rewrite links) work on the
//! document; the page keeps raw and parsed forms in sync through
//! [`Content`](crate::Content).

mod entities;
mod parser;
mod serializer;

use std::fmt;

/// Parsed HTML document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    /// Doctype declaration body (e.g. `"html"`), if present.
    pub doctype: Option<String>,
    /// Top-level nodes.
    pub children: Vec<DocNode>,
}

/// Node inside a [`Document`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocNode {
    /// Element with attributes and children.
    Element(Element),
    /// Text run (unescaped).
    Text(String),
    /// Comment body.
    Comment(String),
}

/// HTML element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<DocNode>,
}

/// Error raised when HTML cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// Markup parsing error.
    #[error("HTML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    /// Encoding error while decoding markup.
    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

impl Document {
    /// Parse an HTML string.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if the markup is too malformed to tokenize.
    pub fn parse(html: &str) -> Result<Self, DocumentError> {
        parser::parse(html)
    }

    /// Serialize back to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        serializer::serialize(self)
    }

    /// First element named `name`, depth-first.
    #[must_use]
    pub fn find_first(&self, name: &str) -> Option<&Element> {
        find_in(&self.children, name)
    }

    /// Mutable first element named `name`, depth-first.
    pub fn find_first_mut(&mut self, name: &str) -> Option<&mut Element> {
        find_in_mut(&mut self.children, name)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

impl Element {
    /// Create an element without attributes or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Concatenated text of all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![DocNode::Text(text.into())];
    }

    /// Append a child node.
    pub fn append(&mut self, node: DocNode) {
        self.children.push(node);
    }
}

fn collect_text(nodes: &[DocNode], out: &mut String) {
    for node in nodes {
        match node {
            DocNode::Text(text) => out.push_str(text),
            DocNode::Element(element) => collect_text(&element.children, out),
            DocNode::Comment(_) => {}
        }
    }
}

fn find_in<'a>(nodes: &'a [DocNode], name: &str) -> Option<&'a Element> {
    nodes.iter().find_map(|node| match node {
        DocNode::Element(element) if element.name == name => Some(element),
        DocNode::Element(element) => find_in(&element.children, name),
        _ => None,
    })
}

fn find_in_mut<'a>(nodes: &'a mut [DocNode], name: &str) -> Option<&'a mut Element> {
    for node in nodes {
        if let DocNode::Element(element) = node {
            if element.name == name {
                return Some(element);
            }
            if let Some(found) = find_in_mut(&mut element.children, name) {
                return Some(found);
            }
        }
    }
    None
}

/// Elements that never have children or an end tag.
pub(crate) fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose body is unescaped text up to the end tag.
pub(crate) fn is_raw_text(name: &str) -> bool {
    matches!(name, "script" | "style")
}
