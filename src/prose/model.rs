//! Document model: nodes, marks and the schema that validates them.
//!
//! Nodes serialize to the editing engine's JSON shape:
//!
//! ```json
//! { "type": "paragraph", "content": [ { "type": "text", "text": "hi", "marks": [ { "type": "strong" } ] } ] }
//! ```

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised when building a schema or checking a document against it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown node type `{0}`")]
    UnknownNode(CompactString),

    #[error("unknown mark type `{0}`")]
    UnknownMark(CompactString),

    #[error("schema is missing required node type `{0}`")]
    MissingNode(&'static str),

    #[error("text node without text")]
    EmptyText,

    #[error("invalid document json: {0}")]
    InvalidJson(String),
}

// =============================================================================
// Mark / Node
// =============================================================================

/// Inline annotation on a text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub type_name: CompactString,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl Mark {
    pub fn new(type_name: impl Into<CompactString>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Map::new(),
        }
    }
}

/// A document node.
///
/// Empty `attrs`, `content` and `marks` are omitted when serialized, so JSON
/// spelling them out as `[]`/`{}` reads back into an equal `Node` but
/// serializes without them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub type_name: CompactString,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    /// Create an empty node of `type_name`.
    pub fn new(type_name: impl Into<CompactString>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Map::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        }
    }

    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new("text")
        }
    }

    /// An empty `doc` node.
    pub fn empty_doc() -> Self {
        Self::new("doc")
    }

    pub fn child(mut self, child: Node) -> Self {
        self.content.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.content.extend(children);
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn mark(mut self, mark: Mark) -> Self {
        self.marks.push(mark);
        self
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        self.type_name == "text"
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }

    /// Visit this node and every descendant, depth first.
    pub fn descendants(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        for child in &self.content {
            child.descendants(f);
        }
    }

    /// Total node count including `self`.
    pub fn node_size(&self) -> usize {
        let mut n = 0;
        self.descendants(&mut |_| n += 1);
        n
    }

    pub fn to_json(&self) -> Value {
        // Node only holds strings, maps and vectors; this cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Specs and schema
// =============================================================================

/// Description of a node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: CompactString,
    pub group: Option<CompactString>,
    pub inline: bool,
}

impl NodeSpec {
    pub fn block(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            group: Some("block".into()),
            inline: false,
        }
    }

    pub fn inline(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            group: Some("inline".into()),
            inline: true,
        }
    }
}

/// Description of a mark type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkSpec {
    pub name: CompactString,
    pub inclusive: bool,
}

impl MarkSpec {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            inclusive: true,
        }
    }
}

/// The set of node and mark types a document may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    nodes: Vec<NodeSpec>,
    marks: Vec<MarkSpec>,
}

impl Schema {
    /// Build a schema. Later specs with an already-used name replace the
    /// earlier one in place. `doc` and `text` are required.
    pub fn new(
        nodes: impl IntoIterator<Item = NodeSpec>,
        marks: impl IntoIterator<Item = MarkSpec>,
    ) -> Result<Self, SchemaError> {
        let mut node_list: Vec<NodeSpec> = Vec::new();
        for spec in nodes {
            match node_list.iter_mut().find(|n| n.name == spec.name) {
                Some(existing) => *existing = spec,
                None => node_list.push(spec),
            }
        }
        let mut mark_list: Vec<MarkSpec> = Vec::new();
        for spec in marks {
            match mark_list.iter_mut().find(|m| m.name == spec.name) {
                Some(existing) => *existing = spec,
                None => mark_list.push(spec),
            }
        }

        for required in ["doc", "text"] {
            if !node_list.iter().any(|n| n.name == required) {
                return Err(SchemaError::MissingNode(required));
            }
        }

        Ok(Self {
            nodes: node_list,
            marks: mark_list,
        })
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn mark_type(&self, name: &str) -> Option<&MarkSpec> {
        self.marks.iter().find(|m| m.name == name)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    pub fn mark_names(&self) -> impl Iterator<Item = &str> {
        self.marks.iter().map(|m| m.name.as_str())
    }

    /// Check that every node and mark in `node` is known.
    pub fn check(&self, node: &Node) -> Result<(), SchemaError> {
        if self.node_type(&node.type_name).is_none() {
            return Err(SchemaError::UnknownNode(node.type_name.clone()));
        }
        if node.is_text() && node.text.as_deref().is_none_or(str::is_empty) {
            return Err(SchemaError::EmptyText);
        }
        if let Some(mark) = node.marks.iter().find(|m| self.mark_type(&m.type_name).is_none()) {
            return Err(SchemaError::UnknownMark(mark.type_name.clone()));
        }
        node.content.iter().try_for_each(|child| self.check(child))
    }

    /// Deserialize and check a JSON document.
    pub fn node_from_json(&self, value: &Value) -> Result<Node, SchemaError> {
        let node: Node =
            serde_json::from_value(value.clone()).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        self.check(&node)?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(
            [NodeSpec::block("doc"), NodeSpec::block("paragraph"), NodeSpec::inline("text")],
            [MarkSpec::new("strong")],
        )
        .unwrap()
    }

    #[test]
    fn test_json_shape() {
        let doc = Node::empty_doc().child(Node::new("paragraph").child(Node::text("hi").mark(Mark::new("strong"))));
        assert_eq!(
            doc.to_json(),
            json!({
                "type": "doc",
                "content": [{
                    "type": "paragraph",
                    "content": [{ "type": "text", "text": "hi", "marks": [{ "type": "strong" }] }]
                }]
            })
        );
        assert_eq!(doc.text_content(), "hi");
        assert_eq!(doc.node_size(), 3);
    }

    #[test]
    fn test_node_from_json_validates() {
        let schema = schema();
        let value = json!({ "type": "doc", "content": [{ "type": "paragraph" }] });
        let node = schema.node_from_json(&value).unwrap();
        assert_eq!(node.to_json(), value);

        let bad = json!({ "type": "doc", "content": [{ "type": "table" }] });
        assert_eq!(schema.node_from_json(&bad), Err(SchemaError::UnknownNode("table".into())));

        let bad_mark = json!({ "type": "text", "text": "x", "marks": [{ "type": "em" }] });
        assert_eq!(schema.node_from_json(&bad_mark), Err(SchemaError::UnknownMark("em".into())));

        assert!(matches!(schema.node_from_json(&json!(3)), Err(SchemaError::InvalidJson(_))));
    }

    #[test]
    fn test_schema_requires_doc_and_text() {
        let err = Schema::new([NodeSpec::block("doc")], []).unwrap_err();
        assert_eq!(err, SchemaError::MissingNode("text"));
    }

    #[test]
    fn test_schema_later_spec_replaces() {
        let schema = Schema::new(
            [
                NodeSpec::block("doc"),
                NodeSpec::inline("text"),
                NodeSpec::block("image"),
                NodeSpec::inline("image"),
            ],
            [],
        )
        .unwrap();
        assert!(schema.node_type("image").unwrap().inline);
        assert_eq!(schema.node_names().collect::<Vec<_>>(), vec!["doc", "text", "image"]);
    }
}
