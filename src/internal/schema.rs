use std::borrow::Cow;
use std::sync::Arc;

use crate::ctx::Ctx;
use crate::error::BoxError;
use crate::plugin::{Activation, MilkdownPlugin};
use crate::prose::Schema;

use super::{MARKS, NODES, SCHEMA, SCHEMA_READY, SCHEMA_TIMER, settle};

/// Builds [`SCHEMA`] from `NODES` and `MARKS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaPlugin;

impl MilkdownPlugin for SchemaPlugin {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("schema")
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        Box::pin(activate(ctx.clone()))
    }
}

async fn activate(ctx: Ctx) -> Result<(), BoxError> {
    let result = build(&ctx).await;
    settle(&ctx, &SCHEMA_READY, result)
}

async fn build(ctx: &Ctx) -> Result<(), BoxError> {
    let timers = ctx.get(&SCHEMA_TIMER)?;
    ctx.wait_all(timers).await;

    let nodes = ctx.get(&NODES)?;
    let marks = ctx.get(&MARKS)?;
    let schema = Schema::new(nodes, marks)?;
    tracing::debug!(
        nodes = schema.node_names().count(),
        marks = schema.mark_names().count(),
        "schema built"
    );
    ctx.set(&SCHEMA, Arc::new(schema))?;
    Ok(())
}
