//! The context store.
//!
//! A [`Ctx`] is shared by every plugin of one editor. It holds typed values
//! addressed by [`SliceType`] and the resolution state of every [`Signal`].
//!
//! # Access rules
//!
//! - `get` / `with` / `update` materialize a slice default on first access and
//!   fail with [`CtxError::NotFound`] when the slice has no value and no default.
//! - `update` is a read-modify-write under one lock. Use it for additive
//!   registrations (appending to a list slot) instead of `get` then `set`.
//! - Closures passed to `with` / `update` must not access the context again.
//!
//! # Example
//!
//! ```
//! use milkdown::{Ctx, SliceType};
//!
//! const ITEMS: SliceType<Vec<&'static str>> = SliceType::with_default("items", Vec::new);
//!
//! let ctx = Ctx::new();
//! ctx.update(&ITEMS, |mut items| {
//!     items.push("a");
//!     items
//! })
//! .unwrap();
//! assert_eq!(ctx.get(&ITEMS).unwrap(), vec!["a"]);
//! ```

mod clock;
mod container;
mod slice;

use std::fmt;
use std::sync::{Arc, Weak};

use compact_str::CompactString;
use parking_lot::RwLock;

use crate::error::{CtxError, CtxResult};

pub use clock::{Signal, Wait, WaitAll};
pub use slice::SliceType;

use clock::SharedClock;
use container::Container;

struct CtxInner {
    container: RwLock<Container>,
    clock: SharedClock,
}

/// Handle to one editor's context store. Cloning shares the store.
#[derive(Clone)]
pub struct Ctx {
    inner: Arc<CtxInner>,
}

impl Default for Ctx {
    fn default() -> Self {
        Self::new()
    }
}

impl Ctx {
    /// Create an empty context.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CtxInner {
                container: RwLock::new(Container::default()),
                clock: SharedClock::default(),
            }),
        }
    }

    // =========================================================================
    // Slices
    // =========================================================================

    /// Clone the current value of a slice.
    pub fn get<T>(&self, slice: &SliceType<T>) -> CtxResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Some(value) = self.inner.container.read().peek(slice)? {
            return Ok(value.clone());
        }
        self.inner.container.write().entry(slice).map(|v| v.clone())
    }

    /// Borrow the current value of a slice.
    pub fn with<T, R>(&self, slice: &SliceType<T>, f: impl FnOnce(&T) -> R) -> CtxResult<R>
    where
        T: Send + Sync + 'static,
    {
        {
            let container = self.inner.container.read();
            if let Some(value) = container.peek(slice)? {
                return Ok(f(value));
            }
        }
        let mut container = self.inner.container.write();
        let value = container.entry(slice)?;
        Ok(f(value))
    }

    /// Store a value, overwriting any previous one.
    pub fn set<T>(&self, slice: &SliceType<T>, value: T) -> CtxResult<()>
    where
        T: Send + Sync + 'static,
    {
        self.inner.container.write().set(slice, value)
    }

    /// Store a value only if the slice holds none. Returns whether it was stored.
    pub fn inject<T>(&self, slice: &SliceType<T>, value: T) -> CtxResult<bool>
    where
        T: Send + Sync + 'static,
    {
        let mut container = self.inner.container.write();
        if container.peek(slice)?.is_some() {
            return Ok(false);
        }
        container.set(slice, value)?;
        Ok(true)
    }

    /// Replace the value with `f(current)` atomically.
    pub fn update<T>(&self, slice: &SliceType<T>, f: impl FnOnce(T) -> T) -> CtxResult<()>
    where
        T: Send + Sync + 'static,
    {
        self.inner.container.write().update(slice, f)
    }

    /// Mutate the value in place atomically.
    pub fn update_mut<T, R>(&self, slice: &SliceType<T>, f: impl FnOnce(&mut T) -> R) -> CtxResult<R>
    where
        T: Send + Sync + 'static,
    {
        let mut container = self.inner.container.write();
        let value = container.entry(slice)?;
        Ok(f(value))
    }

    /// Clear a slice. Returns the removed value.
    pub fn remove<T>(&self, slice: &SliceType<T>) -> CtxResult<Option<T>>
    where
        T: Send + Sync + 'static,
    {
        self.inner.container.write().remove(slice)
    }

    /// Whether the slice currently holds a value.
    pub fn contains<T>(&self, slice: &SliceType<T>) -> bool {
        self.inner.container.read().contains(slice.name())
    }

    /// Names of all populated slices, sorted.
    pub fn slice_names(&self) -> Vec<CompactString> {
        self.inner.container.read().names()
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Wait until `signal` is resolved.
    ///
    /// Completes on the first poll if it already is.
    pub fn wait(&self, signal: &Signal) -> Wait {
        self.inner.clock.wait(signal)
    }

    /// Wait until every signal in `signals` is resolved.
    pub fn wait_all(&self, signals: impl IntoIterator<Item = Signal>) -> WaitAll {
        WaitAll::new(signals.into_iter().map(|s| self.wait(&s)))
    }

    /// Resolve `signal`, waking all waiters.
    ///
    /// Returns `false` if it was already resolved; nothing is woken then.
    pub fn resolve(&self, signal: &Signal) -> bool {
        self.inner.clock.resolve(signal)
    }

    /// Whether `signal` has been resolved.
    pub fn is_resolved(&self, signal: &Signal) -> bool {
        self.inner.clock.is_resolved(signal)
    }

    /// Unresolved signals that currently have waiters.
    ///
    /// An editor whose `create()` never completes has a non-empty list here.
    pub fn pending_signals(&self) -> Vec<CompactString> {
        self.inner.clock.pending()
    }

    // =========================================================================
    // Lifetime
    // =========================================================================

    /// Weak handle for callbacks stored inside the context itself.
    pub fn downgrade(&self) -> WeakCtx {
        WeakCtx(Arc::downgrade(&self.inner))
    }

    /// Drop every slice value. Later access fails with [`CtxError::Destroyed`].
    pub(crate) fn destroy(&self) {
        self.inner.container.write().destroy();
    }

    /// Whether `Editor::destroy` tore this context down.
    pub fn is_destroyed(&self) -> bool {
        self.inner.container.read().is_destroyed()
    }

    /// Whether two handles share one store.
    pub fn ptr_eq(&self, other: &Ctx) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("slices", &self.slice_names())
            .field("pending_signals", &self.pending_signals())
            .finish()
    }
}

/// Non-owning [`Ctx`] handle.
#[derive(Clone)]
pub struct WeakCtx(Weak<CtxInner>);

impl WeakCtx {
    /// The context, if it is still alive.
    pub fn upgrade(&self) -> Option<Ctx> {
        self.0.upgrade().map(|inner| Ctx { inner })
    }
}

impl fmt::Debug for WeakCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakCtx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Ctx: Send, Sync, Clone);
    assert_impl_all!(Wait: Send, Unpin);

    const SCHEMA: SliceType<u32> = SliceType::new("schema");
    const LIST: SliceType<Vec<u32>> = SliceType::with_default("list", Vec::new);

    crate::define_signal!(READY, "Ready");

    #[test]
    fn test_get_missing_slice() {
        let ctx = Ctx::new();
        assert_eq!(ctx.get(&SCHEMA), Err(CtxError::not_found("schema")));
        assert_eq!(ctx.update(&SCHEMA, |v| v + 1), Err(CtxError::not_found("schema")));
    }

    #[test]
    fn test_set_get_update_remove() {
        let ctx = Ctx::new();
        ctx.set(&SCHEMA, 42).unwrap();
        assert_eq!(ctx.get(&SCHEMA), Ok(42));

        ctx.update(&SCHEMA, |v| v * 2).unwrap();
        assert_eq!(ctx.get(&SCHEMA), Ok(84));

        assert_eq!(ctx.remove(&SCHEMA), Ok(Some(84)));
        assert!(!ctx.contains(&SCHEMA));
        assert!(ctx.get(&SCHEMA).is_err());

        ctx.set(&SCHEMA, 1).unwrap();
        assert_eq!(ctx.get(&SCHEMA), Ok(1));
    }

    #[test]
    fn test_default_is_materialized() {
        let ctx = Ctx::new();
        assert_eq!(ctx.get(&LIST), Ok(vec![]));
        ctx.update(&LIST, |mut l| {
            l.push(1);
            l
        })
        .unwrap();
        ctx.update_mut(&LIST, |l| l.push(2)).unwrap();
        assert_eq!(ctx.with(&LIST, |l| l.len()), Ok(2));
        assert_eq!(ctx.slice_names(), vec![CompactString::from("list")]);
    }

    #[test]
    fn test_inject_keeps_existing() {
        let ctx = Ctx::new();
        assert_eq!(ctx.inject(&SCHEMA, 1), Ok(true));
        assert_eq!(ctx.inject(&SCHEMA, 2), Ok(false));
        assert_eq!(ctx.get(&SCHEMA), Ok(1));
    }

    #[test]
    fn test_type_mismatch() {
        let ctx = Ctx::new();
        ctx.set(&SCHEMA, 1).unwrap();
        let wrong: SliceType<String> = SliceType::new("schema");
        assert!(matches!(ctx.get(&wrong), Err(CtxError::TypeMismatch { .. })));
        assert!(matches!(ctx.set(&wrong, "x".into()), Err(CtxError::TypeMismatch { .. })));
    }

    #[test]
    fn test_wait_all() {
        let ctx = Ctx::new();
        let a = Signal::new("A");
        let b = Signal::new("B");
        let mut both = Box::pin(ctx.wait_all([a.clone(), b.clone()]));

        ctx.resolve(&a);
        assert!(both.as_mut().now_or_never().is_none());
        ctx.resolve(&b);
        assert!(both.now_or_never().is_some());
    }

    #[tokio::test]
    async fn test_wait_wakes_task() {
        let ctx = Ctx::new();
        let waiter = {
            let ctx = ctx.clone();
            async move {
                ctx.wait(&READY).await;
                ctx.get(&SCHEMA)
            }
        };
        let resolver = async {
            ctx.set(&SCHEMA, 7).unwrap();
            ctx.resolve(&READY);
        };
        let (value, ()) = futures_util::future::join(waiter, resolver).await;
        assert_eq!(value, Ok(7));
        assert!(ctx.pending_signals().is_empty());
    }

    #[test]
    fn test_weak_ctx() {
        let ctx = Ctx::new();
        let weak = ctx.downgrade();
        assert!(weak.upgrade().is_some_and(|c| c.ptr_eq(&ctx)));
        drop(ctx);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_destroy() {
        let ctx = Ctx::new();
        ctx.set(&SCHEMA, 1).unwrap();
        ctx.destroy();
        assert!(ctx.is_destroyed());
        assert_eq!(ctx.get(&SCHEMA), Err(CtxError::Destroyed));
    }
}
