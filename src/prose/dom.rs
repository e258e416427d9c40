//! A minimal DOM: element trees and the shared mount target.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::Mutex;
use smallvec::SmallVec;

/// Element attributes. Most elements carry zero to two.
pub type Attrs = SmallVec<[(CompactString, CompactString); 2]>;

/// An element or text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Element {
        tag: CompactString,
        attrs: Attrs,
        children: Vec<DomNode>,
    },
    Text(String),
}

impl DomNode {
    pub fn element(tag: impl Into<CompactString>) -> Self {
        Self::Element {
            tag: tag.into(),
            attrs: Attrs::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Set an attribute, replacing an existing one. No-op on text nodes.
    pub fn with_attr(mut self, key: impl Into<CompactString>, value: impl Into<CompactString>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            let (key, value) = (key.into(), value.into());
            match attrs.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => attrs.push((key, value)),
            }
        }
        self
    }

    /// Append a child. No-op on text nodes.
    pub fn with_child(mut self, child: DomNode) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            Self::Text(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()),
            Self::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[DomNode] {
        match self {
            Self::Element { children, .. } => children,
            Self::Text(_) => &[],
        }
    }

    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Element { children, .. } => children.iter().map(DomNode::text_content).collect(),
        }
    }

    /// Serialize as HTML. Text is escaped; there are no void elements.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Self::Text(text) => escape_into(text, out),
            Self::Element { tag, attrs, children } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attrs {
                    let _ = write!(out, " {key}=\"");
                    escape_into(value, out);
                    out.push('"');
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

impl fmt::Display for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

// =============================================================================
// Root
// =============================================================================

/// Mount target shared between the host and the editor view.
///
/// Cloning yields another handle to the same element.
#[derive(Clone)]
pub struct Root {
    inner: Arc<Mutex<Vec<DomNode>>>,
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}

impl Root {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn append_child(&self, node: DomNode) {
        self.inner.lock().push(node);
    }

    /// Replace the first child with `attr == value`, or append.
    pub fn upsert_child(&self, attr: &str, value: &str, node: DomNode) {
        let mut children = self.inner.lock();
        match children.iter_mut().find(|c| c.attr(attr) == Some(value)) {
            Some(slot) => *slot = node,
            None => children.push(node),
        }
    }

    /// Remove the first child with `attr == value`.
    pub fn remove_child_where(&self, attr: &str, value: &str) -> Option<DomNode> {
        let mut children = self.inner.lock();
        let index = children.iter().position(|c| c.attr(attr) == Some(value))?;
        Some(children.remove(index))
    }

    pub fn first_child(&self) -> Option<DomNode> {
        self.inner.lock().first().cloned()
    }

    pub fn remove_first_child(&self) -> Option<DomNode> {
        let mut children = self.inner.lock();
        (!children.is_empty()).then(|| children.remove(0))
    }

    pub fn children(&self) -> Vec<DomNode> {
        self.inner.lock().clone()
    }

    pub fn child_count(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn ptr_eq(&self, other: &Root) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("children", &self.child_count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_html_escapes() {
        let node = DomNode::element("p")
            .with_attr("class", "a\"b")
            .with_child(DomNode::text("1 < 2"));
        assert_eq!(node.to_html(), r#"<p class="a&quot;b">1 &lt; 2</p>"#);
        assert_eq!(node.text_content(), "1 < 2");
    }

    #[test]
    fn test_with_attr_replaces() {
        let node = DomNode::element("div").with_attr("id", "a").with_attr("id", "b");
        assert_eq!(node.attr("id"), Some("b"));
        assert_eq!(DomNode::text("x").with_attr("id", "a").attr("id"), None);
    }

    #[test]
    fn test_root_children() {
        let root = Root::new();
        root.append_child(DomNode::element("header"));
        root.upsert_child("data-id", "1", DomNode::element("div").with_attr("data-id", "1"));
        root.upsert_child("data-id", "1", DomNode::element("main").with_attr("data-id", "1"));
        assert_eq!(root.child_count(), 2);
        assert_eq!(root.children()[1].tag(), Some("main"));

        assert_eq!(root.remove_child_where("data-id", "1").and_then(|n| n.tag().map(String::from)), Some("main".into()));
        assert_eq!(root.remove_first_child().map(|n| n.to_html()), Some("<header></header>".into()));
        assert!(root.remove_first_child().is_none());
    }
}
