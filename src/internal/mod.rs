//! Built-in plugins and the context they share.
//!
//! Each built-in plugin waits on a timer list, produces one slice and resolves
//! one signal:
//!
//! ```text
//! INIT_TIMER ──► init ──► INIT_READY
//! SCHEMA_TIMER ──► schema ──► SCHEMA_READY ──┬──► parser      ──► PARSER_READY
//!                                            ├──► serializer  ──► SERIALIZER_READY
//!                                            └──► commands    ──► COMMANDS_READY
//! EDITOR_STATE_TIMER ──► editor state ──► EDITOR_STATE_READY
//! EDITOR_VIEW_TIMER  ──► editor view  ──► EDITOR_VIEW_READY
//! ```
//!
//! Timer lists are `Vec<Signal>` slices. A plugin that must contribute
//! before a producer runs appends its own gate signal during setup and
//! resolves it once its contribution is merged.

mod commands;
mod default_value;
mod editor_state;
mod editor_view;
mod init;
mod parser;
mod schema;

use std::sync::Arc;

use compact_str::CompactString;

use crate::ctx::{Ctx, Signal, SliceType};
use crate::define_signal;
use crate::error::BoxError;
use crate::plugin::MilkdownPlugin;
use crate::prose::{EditorState, EditorView, MarkSpec, NodeSpec, NodeViewConstructor, ProsePlugin, Root, Schema};

pub use commands::{CommandError, CommandManager, CommandsPlugin};
pub use default_value::DefaultValue;
pub use editor_state::EditorStatePlugin;
pub use editor_view::EditorViewPlugin;
pub use init::InitPlugin;
pub use parser::{DomParser, Parser, ParserPlugin, Serializer, SerializerPlugin, default_dom_parser, default_parser, default_serializer};
pub use schema::SchemaPlugin;

// =============================================================================
// Signals
// =============================================================================

define_signal!(
    /// Every `INIT_TIMER` signal resolved.
    INIT_READY,
    "InitReady"
);
define_signal!(
    /// `SCHEMA` is built.
    SCHEMA_READY,
    "SchemaReady"
);
define_signal!(PARSER_READY, "ParserReady");
define_signal!(SERIALIZER_READY, "SerializerReady");
define_signal!(
    /// `COMMANDS` is available for registration.
    COMMANDS_READY,
    "CommandsReady"
);
define_signal!(
    /// `EDITOR_STATE` holds the initial state.
    EDITOR_STATE_READY,
    "EditorStateReady"
);
define_signal!(
    /// `EDITOR_VIEW` is mounted.
    EDITOR_VIEW_READY,
    "EditorViewReady"
);

// =============================================================================
// Timer lists
// =============================================================================

fn init_timers() -> Vec<Signal> {
    Vec::new()
}

fn schema_timers() -> Vec<Signal> {
    vec![INIT_READY]
}

fn editor_state_timers() -> Vec<Signal> {
    vec![PARSER_READY, SERIALIZER_READY, COMMANDS_READY]
}

fn editor_view_timers() -> Vec<Signal> {
    vec![EDITOR_STATE_READY]
}

/// Signals `init` waits on. Empty by default.
pub const INIT_TIMER: SliceType<Vec<Signal>> = SliceType::with_default("initTimer", init_timers);
/// Signals `schema` waits on. Starts with `INIT_READY`.
pub const SCHEMA_TIMER: SliceType<Vec<Signal>> = SliceType::with_default("schemaTimer", schema_timers);
/// Signals `editor state` waits on: parser, serializer and commands ready.
pub const EDITOR_STATE_TIMER: SliceType<Vec<Signal>> =
    SliceType::with_default("editorStateTimer", editor_state_timers);
/// Signals `editor view` waits on. Starts with `EDITOR_STATE_READY`.
pub const EDITOR_VIEW_TIMER: SliceType<Vec<Signal>> = SliceType::with_default("editorViewTimer", editor_view_timers);

// =============================================================================
// Slices
// =============================================================================

fn base_nodes() -> Vec<NodeSpec> {
    vec![NodeSpec::block("doc"), NodeSpec::block("paragraph"), NodeSpec::inline("text")]
}

fn no_root() -> Option<Root> {
    None
}

/// Node types the schema is built from. Starts with `doc`, `paragraph`, `text`.
pub const NODES: SliceType<Vec<NodeSpec>> = SliceType::with_default("nodes", base_nodes);
pub const MARKS: SliceType<Vec<MarkSpec>> = SliceType::with_default("marks", Vec::new);
pub const SCHEMA: SliceType<Arc<Schema>> = SliceType::new("schema");

pub const PARSER: SliceType<Parser> = SliceType::new("parser");
pub const DOM_PARSER: SliceType<DomParser> = SliceType::new("domParser");
pub const SERIALIZER: SliceType<Serializer> = SliceType::new("serializer");
pub const COMMANDS: SliceType<CommandManager> = SliceType::with_default("commands", CommandManager::new);

pub const DEFAULT_VALUE: SliceType<DefaultValue> = SliceType::with_default("defaultValue", DefaultValue::empty);
pub const EDITOR_STATE: SliceType<EditorState> = SliceType::new("editorState");
/// Engine plugins the initial state is created with.
pub const PROSE_PLUGINS: SliceType<Vec<ProsePlugin>> = SliceType::with_default("prosePlugins", Vec::new);

/// Mount target. Without one the view renders detached.
pub const ROOT: SliceType<Option<Root>> = SliceType::with_default("root", no_root);
pub const EDITOR_VIEW: SliceType<EditorView> = SliceType::new("editorView");
pub const NODE_VIEWS: SliceType<Vec<(CompactString, NodeViewConstructor)>> =
    SliceType::with_default("nodeViews", Vec::new);

/// Resolve `ready` whatever `result` is.
///
/// Dependents of a failed producer then fail on the missing slice instead of
/// waiting forever, and `create()` reports every failure.
fn settle(ctx: &Ctx, ready: &Signal, result: Result<(), BoxError>) -> Result<(), BoxError> {
    if let Err(err) = &result {
        tracing::debug!(signal = %ready, error = %err, "producer failed");
    }
    ctx.resolve(ready);
    result
}

/// The built-in plugins, in load order.
pub fn defaults() -> Vec<Arc<dyn MilkdownPlugin>> {
    vec![
        Arc::new(InitPlugin),
        Arc::new(SchemaPlugin),
        Arc::new(ParserPlugin),
        Arc::new(SerializerPlugin),
        Arc::new(CommandsPlugin),
        Arc::new(EditorStatePlugin),
        Arc::new(EditorViewPlugin),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Editor, EditorStatus};
    use crate::prose::{DomNode, Node};
    use serde_json::json;

    async fn create(configure: impl FnOnce(&crate::Ctx) -> crate::CtxResult<()> + Send + 'static) -> Editor {
        let editor = Editor::make();
        editor.use_plugins(defaults()).unwrap().config(configure).unwrap();
        editor.create().await.unwrap();
        editor
    }

    #[tokio::test]
    async fn test_defaults_resolve_every_signal() {
        let editor = create(|_| Ok(())).await;
        assert_eq!(editor.status(), EditorStatus::Created);
        editor
            .action(|ctx| {
                for signal in [
                    INIT_READY,
                    SCHEMA_READY,
                    PARSER_READY,
                    SERIALIZER_READY,
                    COMMANDS_READY,
                    EDITOR_STATE_READY,
                    EDITOR_VIEW_READY,
                ] {
                    assert!(ctx.is_resolved(&signal), "{signal} unresolved");
                }
                assert!(ctx.pending_signals().is_empty());
                let schema = ctx.get(&SCHEMA).unwrap();
                assert_eq!(schema.node_names().collect::<Vec<_>>(), vec!["doc", "paragraph", "text"]);
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_json_default_value() {
        let value = json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "hello" }] }]
        });
        let expected = value.clone();
        let editor = create(move |ctx| ctx.set(&DEFAULT_VALUE, DefaultValue::Json(value))).await;

        let snapshot = editor.action(|ctx| ctx.get(&EDITOR_VIEW).map(|v| v.state().doc().to_json())).unwrap();
        assert_eq!(snapshot, Ok(expected));
    }

    #[tokio::test]
    async fn test_empty_arrays_in_json_default_value() {
        let value = json!({ "type": "doc", "content": [] });
        let expected: Node = serde_json::from_value(value.clone()).unwrap();
        let editor = create(move |ctx| ctx.set(&DEFAULT_VALUE, DefaultValue::Json(value))).await;

        // Empty arrays are omitted when serialized; compare as documents.
        let doc = editor.action(|ctx| ctx.get(&EDITOR_STATE).map(|s| s.doc().clone())).unwrap().unwrap();
        assert_eq!(doc, expected);
        assert_eq!(doc.to_json(), json!({ "type": "doc" }));
    }

    #[tokio::test]
    async fn test_failed_producer_fails_create() {
        let editor = Editor::make();
        editor
            .use_plugins(defaults())
            .unwrap()
            .config(|ctx| ctx.set(&DEFAULT_VALUE, DefaultValue::Json(json!({ "type": "table" }))))
            .unwrap();

        let err = editor.create().await.unwrap_err();
        let errors = err.activation().unwrap();
        assert_eq!(errors.plugins(), vec!["editorState", "editorView"]);
        assert!(errors.errors[0].to_string().contains("unknown node type `table`"));

        assert_eq!(editor.status(), EditorStatus::Failed);
        assert!(editor.ctx().is_resolved(&EDITOR_STATE_READY));
        assert!(editor.ctx().pending_signals().is_empty());
    }

    #[tokio::test]
    async fn test_markdown_and_html_default_values() {
        let markdown = create(|ctx| ctx.set(&DEFAULT_VALUE, DefaultValue::Markdown("one\n\ntwo".into()))).await;
        let doc = markdown.action(|ctx| ctx.get(&EDITOR_STATE).map(|s| s.doc().clone())).unwrap().unwrap();
        assert_eq!(doc.content.len(), 2);
        assert_eq!(doc.text_content(), "onetwo");

        let dom = DomNode::element("div").with_child(DomNode::element("p").with_child(DomNode::text("from html")));
        let html = create(move |ctx| ctx.set(&DEFAULT_VALUE, DefaultValue::Html(dom))).await;
        let doc = html.action(|ctx| ctx.get(&EDITOR_STATE).map(|s| s.doc().clone())).unwrap().unwrap();
        assert_eq!(doc.content[0].type_name, "paragraph");
        assert_eq!(doc.text_content(), "from html");
    }

    #[tokio::test]
    async fn test_view_mounts_on_root_and_unmounts_on_destroy() {
        let root = Root::new();
        let target = root.clone();
        let editor = create(move |ctx| ctx.set(&ROOT, Some(target))).await;
        assert_eq!(root.child_count(), 1);

        editor.destroy().unwrap();
        assert_eq!(root.child_count(), 0);
    }

    #[tokio::test]
    async fn test_late_gate_delays_schema() {
        use crate::plugin::plugin_fn;

        let gate = Signal::unique("test");
        let editor = Editor::make();
        let setup_gate = gate.clone();
        editor
            .use_plugins(defaults())
            .unwrap()
            .use_plugin(plugin_fn("late", move |ctx: &crate::Ctx| -> crate::plugin::Activation {
                let gate = setup_gate.clone();
                let _ = ctx.update_mut(&SCHEMA_TIMER, |timers| timers.push(gate.clone()));
                let ctx = ctx.clone();
                Box::pin(async move {
                    ctx.wait(&INIT_READY).await;
                    ctx.update_mut(&NODES, |nodes| nodes.push(NodeSpec::block("heading")))?;
                    ctx.resolve(&gate);
                    Ok::<(), crate::BoxError>(())
                })
            }))
            .unwrap();
        editor.create().await.unwrap();
        let schema = editor.action(|ctx| ctx.get(&SCHEMA)).unwrap().unwrap();
        assert!(schema.node_type("heading").is_some());
    }
}
