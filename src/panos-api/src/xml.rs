//! Owned XML tree and `<response>` envelope handling.

use crate::{PanosError, Result};

/// An element of a parsed API response.
///
/// `roxmltree` borrows the source text, so responses are copied into this
/// owned form before they leave the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Direct text content, concatenated and trimmed.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the given tag.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a `/`-separated chain of direct children.
    pub fn child_path(&self, path: &str) -> Option<&XmlElement> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Every element below this one, depth first, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// First descendant with the given tag.
    pub fn descendant(&self, name: &str) -> Option<&XmlElement> {
        self.descendants().find(|e| e.name == name)
    }

    /// Text content, `None` when empty.
    pub fn text_opt(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }

    /// Non-empty text of the direct `member` children.
    pub fn members(&self) -> Vec<String> {
        self.children_named("member")
            .filter_map(XmlElement::text_opt)
            .map(str::to_string)
            .collect()
    }

    /// Direct `entry` children of `container`.
    ///
    /// Accepts the container directly under `self`, `entry` elements directly
    /// under `self` (XPaths ending in `/entry`), or the container anywhere below.
    pub fn container_entries<'a>(&'a self, container: &str) -> Vec<&'a XmlElement> {
        if let Some(node) = self.child(container) {
            return node.children_named("entry").collect();
        }
        let direct: Vec<_> = self.children_named("entry").collect();
        if !direct.is_empty() {
            return direct;
        }
        self.descendant(container)
            .map(|node| node.children_named("entry").collect())
            .unwrap_or_default()
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut text = String::new();
        let mut children = Vec::new();
        for child in node.children() {
            if child.is_element() {
                children.push(Self::from_node(child));
            } else if child.is_text() {
                if let Some(t) = child.text() {
                    text.push_str(t);
                }
            }
        }
        Self {
            name: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            text: text.trim().to_string(),
            children,
        }
    }
}

/// Depth-first iterator over an element's descendants.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Parse a response body into its `<response>` root.
///
/// Only checks that the body is well-formed XML with a `response` root; the
/// `status` attribute is judged by [`check_status`].
pub fn parse_envelope(body: &str) -> Result<XmlElement> {
    if body.trim().is_empty() {
        return Err(PanosError::MalformedResponse("empty body".to_string()));
    }
    let doc = roxmltree::Document::parse(body)
        .map_err(|e| PanosError::MalformedResponse(format!("invalid XML: {e}")))?;
    let root = doc.root_element();
    if root.tag_name().name() != "response" {
        return Err(PanosError::MalformedResponse(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }
    Ok(XmlElement::from_node(root))
}

/// Turn a non-success envelope into [`PanosError::Api`].
pub(crate) fn check_status(root: XmlElement) -> Result<XmlElement> {
    if root.attr("status") == Some("success") {
        return Ok(root);
    }
    Err(PanosError::Api {
        message: error_message(&root),
        code: root.attr("code").map(str::to_string),
    })
}

fn error_message(root: &XmlElement) -> String {
    if let Some(msg) = root.descendant("msg") {
        let lines: Vec<&str> = std::iter::once(msg)
            .chain(msg.descendants())
            .filter(|e| e.name == "line")
            .filter_map(XmlElement::text_opt)
            .collect();
        if !lines.is_empty() {
            return lines.join("; ");
        }
        if let Some(text) = msg.text_opt() {
            return text.to_string();
        }
    }
    "Unknown error".to_string()
}
