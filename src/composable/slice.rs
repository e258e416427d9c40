use std::borrow::Cow;
use std::fmt;

use compact_str::format_compact;

use crate::ctx::{Ctx, SliceType};
use crate::error::BoxError;
use crate::plugin::{Activation, MilkdownPlugin};

/// Injects a slice value during setup, before any activation runs.
///
/// An existing value is kept.
pub struct CtxSlice<T> {
    slice: SliceType<T>,
    value: T,
}

/// Declare `slice` with an initial `value`.
pub fn ctx_slice<T>(slice: SliceType<T>, value: T) -> CtxSlice<T>
where
    T: Clone + Send + Sync + 'static,
{
    CtxSlice { slice, value }
}

impl<T> CtxSlice<T> {
    /// The declared slice, for reading the value back.
    pub fn key(&self) -> &SliceType<T> {
        &self.slice
    }
}

impl<T> MilkdownPlugin for CtxSlice<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(format_compact!("$ctx({})", self.slice.name()).into())
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        let result = ctx.inject(&self.slice, self.value.clone()).map(drop).map_err(BoxError::from);
        Box::pin(std::future::ready(result))
    }
}

impl<T> fmt::Debug for CtxSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtxSlice").field("slice", &self.slice).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use crate::plugin::plugin;

    #[tokio::test]
    async fn test_slice_visible_to_every_activation() {
        let theme = ctx_slice(SliceType::<String>::dynamic("theme"), "dark".to_string());
        let key = theme.key().clone();
        assert_eq!(theme.name(), "$ctx(theme)");

        const SEEN: SliceType<String> = SliceType::new("seen");
        let reader_key = key.clone();
        let editor = Editor::make();
        editor
            .use_plugin(plugin("reader", move |ctx| {
                let key = reader_key.clone();
                async move {
                    let theme = ctx.get(&key)?;
                    ctx.set(&SEEN, theme)?;
                    Ok(())
                }
            }))
            .unwrap()
            .use_plugin(theme)
            .unwrap();
        editor.create().await.unwrap();

        assert_eq!(editor.action(|ctx| ctx.get(&SEEN)).unwrap(), Ok("dark".to_string()));
    }

    #[tokio::test]
    async fn test_existing_value_is_kept() {
        const MODE: SliceType<u8> = SliceType::new("mode");
        let editor = Editor::make();
        editor.use_plugin(ctx_slice(MODE, 1)).unwrap().use_plugin(ctx_slice(MODE, 2)).unwrap();
        editor.create().await.unwrap();
        assert_eq!(editor.action(|ctx| ctx.get(&MODE)).unwrap(), Ok(1));
    }
}
