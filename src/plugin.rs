//! The plugin protocol.
//!
//! A plugin is run in two steps:
//!
//! 1. `setup(&ctx)` runs synchronously while the editor is being created, in
//!    registration order. It may inject slices or append gate signals to timer
//!    lists, and returns the plugin's [`Activation`].
//! 2. The activation future is polled together with every other plugin's
//!    activation. It suspends at `ctx.wait(..)` and reads/writes the context
//!    between suspension points.
//!
//! # Example
//!
//! ```
//! use milkdown::{SliceType, plugin};
//! use milkdown::internal::SCHEMA_READY;
//!
//! const ANSWER: SliceType<u32> = SliceType::new("answer");
//!
//! let answer = plugin("answer", |ctx| async move {
//!     ctx.wait(&SCHEMA_READY).await;
//!     ctx.set(&ANSWER, 42)?;
//!     Ok(())
//! });
//! # let _ = answer;
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::ctx::Ctx;
use crate::error::BoxError;

/// The asynchronous part of a plugin.
pub type Activation = BoxFuture<'static, Result<(), BoxError>>;

/// A unit of editor behavior.
pub trait MilkdownPlugin: Send + Sync {
    /// Name used in logs and activation errors.
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    /// Synchronous setup; returns the activation routine.
    fn setup(&self, ctx: &Ctx) -> Activation;
}

impl<P: MilkdownPlugin + ?Sized> MilkdownPlugin for Arc<P> {
    fn name(&self) -> Cow<'_, str> {
        (**self).name()
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        (**self).setup(ctx)
    }
}

impl<P: MilkdownPlugin + ?Sized> MilkdownPlugin for Box<P> {
    fn name(&self) -> Cow<'_, str> {
        (**self).name()
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        (**self).setup(ctx)
    }
}

// =============================================================================
// Named closure plugin
// =============================================================================

/// A closure plugin with a readable name. Built by [`plugin_fn`].
pub struct FnPlugin<F> {
    name: Cow<'static, str>,
    f: F,
}

/// Wrap a closure as a named plugin.
pub fn plugin_fn<F>(name: impl Into<Cow<'static, str>>, f: F) -> FnPlugin<F>
where
    F: Fn(&Ctx) -> Activation + Send + Sync,
{
    FnPlugin { name: name.into(), f }
}

/// Wrap an async closure as a named plugin with no synchronous setup.
///
/// The closure receives its own clone of the context.
pub fn plugin<F, Fut>(
    name: impl Into<Cow<'static, str>>,
    f: F,
) -> FnPlugin<impl Fn(&Ctx) -> Activation + Send + Sync>
where
    F: Fn(Ctx) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    plugin_fn(name, move |ctx: &Ctx| -> Activation { Box::pin(f(ctx.clone())) })
}

impl<F> MilkdownPlugin for FnPlugin<F>
where
    F: Fn(&Ctx) -> Activation + Send + Sync,
{
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        (self.f)(ctx)
    }
}

impl<F> fmt::Debug for FnPlugin<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPlugin").field("name", &self.name).finish()
    }
}

/// Boxed plugin as stored by the editor.
pub type BoxedPlugin = Box<dyn MilkdownPlugin>;
