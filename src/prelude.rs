//! Prelude module for common imports.
//!
//! ```
//! use milkdown::prelude::*;
//! ```

// Context
pub use crate::ctx::{Ctx, Signal, SliceType};

// Plugins
pub use crate::plugin::{Activation, MilkdownPlugin, plugin, plugin_fn};

// Editor
pub use crate::editor::{Editor, EditorStatus, on_destroy};

// Built-in context
pub use crate::internal::{
    COMMANDS, DEFAULT_VALUE, DefaultValue, EDITOR_STATE, EDITOR_VIEW, PROSE_PLUGINS, ROOT, SCHEMA, defaults,
};

// Factories
pub use crate::composable::{Composable, ctx_slice, mark, node, node_view, prose_plugin, shortcut};

// Engine
pub use crate::prose::{Keymap, Node, ProsePlugin, Root};

// Error
pub use crate::error::{BoxError, CtxError, CtxResult, EditorError, LifecycleError};

// Macros
pub use crate::define_signal;

#[cfg(feature = "listener")]
pub use crate::listener::{LISTENER, ListenerPlugin};
