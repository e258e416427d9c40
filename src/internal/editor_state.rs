use std::borrow::Cow;

use crate::ctx::Ctx;
use crate::error::BoxError;
use crate::plugin::{Activation, MilkdownPlugin};
use crate::prose::EditorState;

use super::{
    DEFAULT_VALUE, DOM_PARSER, DefaultValue, EDITOR_STATE, EDITOR_STATE_READY, EDITOR_STATE_TIMER, PARSER,
    PROSE_PLUGINS, SCHEMA, settle,
};

/// Builds the initial [`EDITOR_STATE`] from [`DEFAULT_VALUE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EditorStatePlugin;

impl MilkdownPlugin for EditorStatePlugin {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("editorState")
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        Box::pin(activate(ctx.clone()))
    }
}

async fn activate(ctx: Ctx) -> Result<(), BoxError> {
    let result = build(&ctx).await;
    settle(&ctx, &EDITOR_STATE_READY, result)
}

async fn build(ctx: &Ctx) -> Result<(), BoxError> {
    let timers = ctx.get(&EDITOR_STATE_TIMER)?;
    ctx.wait_all(timers).await;

    let schema = ctx.get(&SCHEMA)?;
    let doc = match ctx.get(&DEFAULT_VALUE)? {
        DefaultValue::Markdown(markdown) => ctx.get(&PARSER)?(&markdown)?,
        DefaultValue::Html(dom) => ctx.get(&DOM_PARSER)?(&dom)?,
        DefaultValue::Json(value) => schema.node_from_json(&value)?,
    };
    let plugins = ctx.get(&PROSE_PLUGINS)?;
    tracing::debug!(nodes = doc.node_size(), plugins = plugins.len(), "initial editor state");

    ctx.set(&EDITOR_STATE, EditorState::create(schema, doc, plugins))?;
    Ok(())
}
