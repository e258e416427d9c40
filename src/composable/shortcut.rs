use crate::ctx::Ctx;
use crate::internal::{EDITOR_STATE_TIMER, PROSE_PLUGINS, SCHEMA_READY};
use crate::prose::{Keymap, ProsePlugin, keymap};

use super::Composable;

/// Key bindings, installed as an engine keymap plugin.
///
/// Keymaps are appended in activation order; for a key bound twice the
/// binding activated last wins.
pub fn shortcut(f: impl Fn(&Ctx) -> Keymap + Send + Sync + 'static) -> Composable<Keymap> {
    Composable::new(
        "$shortcut",
        SCHEMA_READY,
        move |ctx| Ok(f(ctx)),
        |ctx, bindings: &Keymap| ctx.update_mut(&PROSE_PLUGINS, |plugins| plugins.push(keymap(bindings.clone()))),
    )
    .gate(EDITOR_STATE_TIMER)
}

/// An arbitrary engine plugin.
pub fn prose_plugin(f: impl Fn(&Ctx) -> ProsePlugin + Send + Sync + 'static) -> Composable<ProsePlugin> {
    Composable::new(
        "$prose",
        SCHEMA_READY,
        move |ctx| Ok(f(ctx)),
        |ctx, plugin: &ProsePlugin| ctx.update_mut(&PROSE_PLUGINS, |plugins| plugins.push(plugin.clone())),
    )
    .gate(EDITOR_STATE_TIMER)
}
