//! milkdown - Plugin-composable editor core
//!
//! ## Core Concepts
//!
//! **Context store**: every editor owns one [`Ctx`], a typed key/value store
//! addressed by [`SliceType`] constants. Plugins communicate only through it.
//!
//! **Signals**: one-shot readiness flags ([`Signal`]). A plugin suspends on
//! `ctx.wait(&SIGNAL)` until another plugin calls `ctx.resolve(&SIGNAL)`, so
//! the activation order follows the data dependencies rather than the
//! registration order.
//!
//! **Plugins**: a [`MilkdownPlugin`] has a synchronous `setup` and returns an
//! asynchronous activation. [`Editor::create`] runs every setup, then polls all
//! activations together and settles once each one finished.
//!
//! ## Modules
//! - `ctx`: context store, slices, signals
//! - `plugin`: the plugin trait and closure adapters
//! - `editor`: builder and lifecycle
//! - `internal`: built-in plugins (schema, parser, state, view, ...)
//! - `composable`: plugin factories (`shortcut`, `node`, `command`, ...)
//! - `prose`: the editing engine the plugins configure
//! - `listener`: change callbacks (feature `listener`)
//! - `bridge`: host UI framework binding (feature `bridge`)
//! - `utils`: closures for `Editor::action`
//!
//! ## Usage
//!
//! ```
//! use milkdown::Editor;
//! use milkdown::composable::shortcut;
//! use milkdown::internal::{DEFAULT_VALUE, DefaultValue, defaults};
//! use milkdown::prose::{Keymap, command};
//! use milkdown::utils::get_markdown;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let editor = Editor::make();
//! editor
//!     .use_plugins(defaults())?
//!     .use_plugin(shortcut(|_| Keymap::new().bind("Mod-z", command(|_| None))))?
//!     .config(|ctx| ctx.set(&DEFAULT_VALUE, DefaultValue::from("Hello")))?;
//! editor.create().await?;
//!
//! assert_eq!(editor.action(get_markdown())??, "Hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

/// Context store: slices and signals
pub mod ctx;

/// Error types
pub mod error;

/// Plugin trait and adapters
pub mod plugin;

/// Editor builder and lifecycle
pub mod editor;

/// Editing engine
pub mod prose;

/// Built-in plugins
pub mod internal;

/// Plugin factories
pub mod composable;

/// Closures for `Editor::action`
pub mod utils;

/// Change listeners
#[cfg(feature = "listener")]
pub mod listener;

/// Host UI framework binding
#[cfg(feature = "bridge")]
pub mod bridge;

/// Prelude for common imports
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

// Context
pub use ctx::{Ctx, Signal, SliceType, Wait, WaitAll, WeakCtx};

// Plugins
pub use plugin::{Activation, BoxedPlugin, FnPlugin, MilkdownPlugin, plugin, plugin_fn};

// Editor
pub use editor::{CLEANUP, Cleanup, Editor, EditorStatus, on_destroy};

// Error types
pub use error::{
    ActivationError, ActivationErrors, BoxError, CtxError, CtxResult, EditorError, EditorResult, LifecycleError,
};
