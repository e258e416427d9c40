use serde_json::Value;

use crate::prose::DomNode;

/// Initial document content. Exactly one representation is active.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Parsed with `PARSER`.
    Markdown(String),
    /// Parsed with `DOM_PARSER`.
    Html(DomNode),
    /// Checked against the schema and used as is.
    Json(Value),
}

impl DefaultValue {
    /// Empty markdown.
    pub fn empty() -> Self {
        Self::Markdown(String::new())
    }
}

impl Default for DefaultValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for DefaultValue {
    fn from(markdown: &str) -> Self {
        Self::Markdown(markdown.to_owned())
    }
}

impl From<String> for DefaultValue {
    fn from(markdown: String) -> Self {
        Self::Markdown(markdown)
    }
}

impl From<DomNode> for DefaultValue {
    fn from(dom: DomNode) -> Self {
        Self::Html(dom)
    }
}

impl From<Value> for DefaultValue {
    fn from(json: Value) -> Self {
        Self::Json(json)
    }
}
