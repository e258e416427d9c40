//! Editing-engine plugins (distinct from [`MilkdownPlugin`](crate::MilkdownPlugin)).

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;

use super::keymap::Keymap;
use super::state::{EditorState, Transaction};

/// Fallback key handler, consulted after the plugin's keymap.
pub type KeyHandler = Arc<dyn Fn(&EditorState, &str) -> Option<Transaction> + Send + Sync>;

/// An engine plugin: key bindings plus an optional key handler.
#[derive(Clone)]
pub struct ProsePlugin {
    key: CompactString,
    keymap: Option<Keymap>,
    handle_key: Option<KeyHandler>,
}

impl ProsePlugin {
    pub fn new(key: impl Into<CompactString>) -> Self {
        Self {
            key: key.into(),
            keymap: None,
            handle_key: None,
        }
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = Some(keymap);
        self
    }

    pub fn with_key_handler(
        mut self,
        f: impl Fn(&EditorState, &str) -> Option<Transaction> + Send + Sync + 'static,
    ) -> Self {
        self.handle_key = Some(Arc::new(f));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn keymap(&self) -> Option<&Keymap> {
        self.keymap.as_ref()
    }

    /// Keymap first, then the fallback handler.
    pub fn handle_key(&self, state: &EditorState, key: &str) -> Option<Transaction> {
        if let Some(command) = self.keymap.as_ref().and_then(|k| k.get(key)) {
            if let Some(tr) = command(state) {
                return Some(tr);
            }
        }
        self.handle_key.as_ref().and_then(|f| f(state, key))
    }
}

impl fmt::Debug for ProsePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProsePlugin")
            .field("key", &self.key)
            .field("keymap", &self.keymap)
            .field("handle_key", &self.handle_key.is_some())
            .finish()
    }
}
