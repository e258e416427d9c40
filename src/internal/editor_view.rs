use std::borrow::Cow;

use crate::ctx::Ctx;
use crate::editor::on_destroy;
use crate::error::BoxError;
use crate::plugin::{Activation, MilkdownPlugin};
use crate::prose::EditorView;

use super::{EDITOR_STATE, EDITOR_VIEW, EDITOR_VIEW_READY, EDITOR_VIEW_TIMER, NODE_VIEWS, ROOT, settle};

/// Creates [`EDITOR_VIEW`] and mounts it on [`ROOT`].
///
/// The view is destroyed with the editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditorViewPlugin;

impl MilkdownPlugin for EditorViewPlugin {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("editorView")
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        Box::pin(activate(ctx.clone()))
    }
}

async fn activate(ctx: Ctx) -> Result<(), BoxError> {
    let result = mount(&ctx).await;
    settle(&ctx, &EDITOR_VIEW_READY, result)
}

async fn mount(ctx: &Ctx) -> Result<(), BoxError> {
    let timers = ctx.get(&EDITOR_VIEW_TIMER)?;
    ctx.wait_all(timers).await;

    let root = ctx.get(&ROOT)?;
    let state = ctx.get(&EDITOR_STATE)?;
    let node_views = ctx.get(&NODE_VIEWS)?;
    let view = EditorView::new(root, state, node_views);

    let mounted = view.clone();
    on_destroy(ctx, move |_| mounted.destroy())?;
    ctx.set(&EDITOR_VIEW, view)?;
    Ok(())
}
