use std::borrow::Cow;

use crate::ctx::Ctx;
use crate::error::BoxError;
use crate::plugin::{Activation, MilkdownPlugin};

use super::{INIT_READY, INIT_TIMER, settle};

/// Resolves [`INIT_READY`] once every `INIT_TIMER` signal resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitPlugin;

impl MilkdownPlugin for InitPlugin {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("init")
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        Box::pin(activate(ctx.clone()))
    }
}

async fn activate(ctx: Ctx) -> Result<(), BoxError> {
    let result = match ctx.get(&INIT_TIMER) {
        Ok(timers) => {
            ctx.wait_all(timers).await;
            Ok(())
        }
        Err(err) => Err(err.into()),
    };
    settle(&ctx, &INIT_READY, result)
}
