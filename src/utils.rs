//! Ready-made closures for [`Editor::action`](crate::Editor::action).
//!
//! ```no_run
//! # async fn run(editor: milkdown::Editor) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! use milkdown::utils::{get_markdown, replace_all};
//!
//! editor.action(replace_all("# Title"))??;
//! let markdown = editor.action(get_markdown())??;
//! # Ok(()) }
//! ```

use serde_json::Value;

use crate::ctx::Ctx;
use crate::error::{BoxError, CtxResult};
use crate::internal::{COMMANDS, EDITOR_VIEW, PARSER, SCHEMA, SERIALIZER};
use crate::prose::Node;

/// The current document as JSON.
pub fn get_json() -> impl FnOnce(&Ctx) -> CtxResult<Value> {
    |ctx| Ok(ctx.get(&EDITOR_VIEW)?.state().doc().to_json())
}

/// The current document serialized with `SERIALIZER`.
pub fn get_markdown() -> impl FnOnce(&Ctx) -> CtxResult<String> {
    |ctx| {
        let serialize = ctx.get(&SERIALIZER)?;
        Ok(serialize(ctx.get(&EDITOR_VIEW)?.state().doc()))
    }
}

/// The rendered view as HTML.
pub fn get_html() -> impl FnOnce(&Ctx) -> CtxResult<String> {
    |ctx| Ok(ctx.get(&EDITOR_VIEW)?.dom().to_html())
}

/// Replace the whole document with parsed `markdown`.
pub fn replace_all(markdown: impl Into<String>) -> impl FnOnce(&Ctx) -> Result<(), BoxError> {
    let markdown = markdown.into();
    move |ctx| {
        let parse = ctx.get(&PARSER)?;
        let doc = parse(&markdown)?;
        replace_doc(ctx, doc)
    }
}

/// Replace the whole document with a JSON document checked against the schema.
pub fn set_json(value: Value) -> impl FnOnce(&Ctx) -> Result<(), BoxError> {
    move |ctx| {
        let doc = ctx.get(&SCHEMA)?.node_from_json(&value)?;
        replace_doc(ctx, doc)
    }
}

/// Run a registered command. `Ok(false)` when it was not applicable.
pub fn call_command(key: impl Into<String>) -> impl FnOnce(&Ctx) -> Result<bool, BoxError> {
    let key = key.into();
    move |ctx| {
        let commands = ctx.get(&COMMANDS)?;
        let view = ctx.get(&EDITOR_VIEW)?;
        Ok(commands.call(&key, &view)?)
    }
}

fn replace_doc(ctx: &Ctx, doc: Node) -> Result<(), BoxError> {
    let view = ctx.get(&EDITOR_VIEW)?;
    let tr = view.state().tr().replace_doc(doc);
    if !view.dispatch(tr) {
        return Err("editor view is destroyed".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composable;
    use crate::editor::Editor;
    use crate::internal::{DEFAULT_VALUE, DefaultValue, defaults};
    use crate::prose::{Node, command};
    use serde_json::json;

    async fn editor(markdown: &'static str) -> Editor {
        let editor = Editor::make();
        editor
            .use_plugins(defaults())
            .unwrap()
            .use_plugin(composable::command("Clear", |_| {
                command(|state| (!state.doc().content.is_empty()).then(|| state.tr().replace_doc(Node::empty_doc())))
            }))
            .unwrap()
            .config(move |ctx| ctx.set(&DEFAULT_VALUE, DefaultValue::from(markdown)))
            .unwrap();
        editor.create().await.unwrap();
        editor
    }

    #[tokio::test]
    async fn test_markdown_round_trip() {
        let editor = editor("first\n\nsecond").await;
        assert_eq!(editor.action(get_markdown()).unwrap().unwrap(), "first\n\nsecond");

        editor.action(replace_all("replaced")).unwrap().unwrap();
        assert_eq!(editor.action(get_markdown()).unwrap().unwrap(), "replaced");
        assert_eq!(
            editor.action(get_html()).unwrap().unwrap(),
            format!(
                r#"<div class="milkdown" data-milkdown-view="{}"><paragraph>replaced</paragraph></div>"#,
                editor.action(|ctx| ctx.get(&EDITOR_VIEW).map(|v| v.id().to_owned())).unwrap().unwrap()
            )
        );
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let editor = editor("").await;
        let value = json!({ "type": "doc", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "j" }] }] });

        editor.action(set_json(value.clone())).unwrap().unwrap();
        assert_eq!(editor.action(get_json()).unwrap(), Ok(value));

        let invalid = editor.action(set_json(json!({ "type": "nope" }))).unwrap();
        assert!(invalid.unwrap_err().to_string().contains("unknown node type `nope`"));
    }

    #[tokio::test]
    async fn test_call_command() {
        let editor = editor("text").await;
        assert!(editor.action(call_command("Clear")).unwrap().unwrap());
        assert!(!editor.action(call_command("Clear")).unwrap().unwrap());
        assert!(editor.action(call_command("Missing")).unwrap().is_err());
    }
}
