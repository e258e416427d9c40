//! The editing engine the plugins configure.
//!
//! A deliberately small model: a JSON-shaped document tree, a schema that
//! validates it, immutable states advanced by transactions, keymaps, and a
//! view that renders into a shared [`Root`].

mod dom;
mod keymap;
mod model;
mod plugin;
mod state;
mod view;

pub use dom::{Attrs, DomNode, Root};
pub use keymap::{Keymap, combined_keymap, keymap, normalize_key_name};
pub use model::{Mark, MarkSpec, Node, NodeSpec, Schema, SchemaError};
pub use plugin::{KeyHandler, ProsePlugin};
pub use state::{Command, EditorState, Transaction, command};
pub use view::{DispatchHook, EditorView, NodeView, NodeViewConstructor, VIEW_ID_ATTR};
