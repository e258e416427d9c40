use compact_str::CompactString;

use crate::ctx::Ctx;
use crate::internal::{EDITOR_VIEW_TIMER, NODE_VIEWS, SCHEMA_READY};
use crate::prose::NodeViewConstructor;

use super::Composable;

/// A custom view for every node of `node_type`.
pub fn node_view(
    node_type: impl Into<CompactString>,
    f: impl Fn(&Ctx) -> NodeViewConstructor + Send + Sync + 'static,
) -> Composable<NodeViewConstructor> {
    let node_type = node_type.into();
    Composable::new(
        "$view",
        SCHEMA_READY,
        move |ctx| Ok(f(ctx)),
        move |ctx, constructor: &NodeViewConstructor| {
            ctx.update_mut(&NODE_VIEWS, |views| views.push((node_type.clone(), constructor.clone())))
        },
    )
    .gate(EDITOR_VIEW_TIMER)
}
