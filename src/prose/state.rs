//! Editor state, transactions and commands.

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::model::{Node, Schema};
use super::plugin::ProsePlugin;

/// A state transition built from an [`EditorState`].
#[derive(Debug, Clone)]
pub struct Transaction {
    before: Node,
    doc: Node,
    meta: FxHashMap<CompactString, Value>,
}

impl Transaction {
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut Node {
        &mut self.doc
    }

    /// Replace the whole document.
    pub fn replace_doc(mut self, doc: Node) -> Self {
        self.doc = doc;
        self
    }

    pub fn set_meta(mut self, key: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    pub fn doc_changed(&self) -> bool {
        self.before != self.doc
    }
}

/// Immutable editor state. Cloning is cheap except for the document.
#[derive(Clone)]
pub struct EditorState {
    doc: Node,
    schema: Arc<Schema>,
    plugins: Arc<[ProsePlugin]>,
}

impl EditorState {
    /// A state over `doc` with `plugins` installed.
    pub fn create(schema: Arc<Schema>, doc: Node, plugins: impl IntoIterator<Item = ProsePlugin>) -> Self {
        Self {
            doc,
            schema,
            plugins: plugins.into_iter().collect(),
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Installed engine plugins, in order.
    pub fn plugins(&self) -> &[ProsePlugin] {
        &self.plugins
    }

    /// Start a transaction from this state.
    pub fn tr(&self) -> Transaction {
        Transaction {
            before: self.doc.clone(),
            doc: self.doc.clone(),
            meta: FxHashMap::default(),
        }
    }

    /// Apply a transaction, producing the next state.
    pub fn apply(&self, tr: Transaction) -> Self {
        Self {
            doc: tr.doc,
            schema: Arc::clone(&self.schema),
            plugins: Arc::clone(&self.plugins),
        }
    }

    /// Same state with another plugin list.
    pub fn reconfigure(&self, plugins: impl IntoIterator<Item = ProsePlugin>) -> Self {
        Self {
            doc: self.doc.clone(),
            schema: Arc::clone(&self.schema),
            plugins: plugins.into_iter().collect(),
        }
    }
}

impl fmt::Debug for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorState")
            .field("doc", &self.doc.type_name)
            .field("nodes", &self.doc.node_size())
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

/// A function over editor state that may produce a transition.
///
/// `None` means "not applicable here".
pub type Command = Arc<dyn Fn(&EditorState) -> Option<Transaction> + Send + Sync>;

/// Wrap a closure as a [`Command`].
pub fn command(f: impl Fn(&EditorState) -> Option<Transaction> + Send + Sync + 'static) -> Command {
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prose::model::NodeSpec;

    fn state() -> EditorState {
        let schema = Schema::new([NodeSpec::block("doc"), NodeSpec::inline("text")], []).unwrap();
        EditorState::create(Arc::new(schema), Node::empty_doc(), [])
    }

    #[test]
    fn test_apply_transaction() {
        let state = state();
        let tr = state.tr().replace_doc(Node::empty_doc().child(Node::text("x"))).set_meta("origin", "test");
        assert!(tr.doc_changed());
        assert_eq!(tr.get_meta("origin"), Some(&Value::from("test")));

        let next = state.apply(tr);
        assert_eq!(next.doc().text_content(), "x");
        assert_eq!(state.doc().text_content(), "");
    }

    #[test]
    fn test_command_not_applicable() {
        let only_empty = command(|state| {
            state
                .doc()
                .content
                .is_empty()
                .then(|| state.tr().replace_doc(Node::empty_doc().child(Node::text("filled"))))
        });
        let state = state();
        let next = state.apply(only_empty(&state).unwrap());
        assert!(only_empty(&next).is_none());
    }
}
