//! Readiness signals.
//!
//! A [`Signal`] is a one-shot milestone: pending until resolved, resolved
//! forever after. Waiting on a resolved signal completes on the first poll;
//! resolving twice does nothing the second time.
//!
//! ```text
//!   wait(S) ──poll──► pending? ──yes──► park waker ──resolve(S)──► wake
//!                        │
//!                        no ──► Ready (no suspension)
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, Waker};

use compact_str::CompactString;
use futures_util::future::{JoinAll, join_all};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

// =============================================================================
// Signal
// =============================================================================

/// A named readiness milestone. Identity is the name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signal {
    name: Cow<'static, str>,
}

impl Signal {
    /// Declare a signal with a static name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    /// Mint a process-unique signal named `{prefix}#{n}`.
    ///
    /// Factories use this to add their own gate to a timer list.
    pub fn unique(prefix: &str) -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        Self {
            name: Cow::Owned(format!("{prefix}#{n}")),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal({})", self.name)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Declare documented signal constants.
///
/// ```
/// milkdown::define_signal!(
///     /// Resolved once the toolbar is mounted
///     TOOLBAR_READY,
///     "ToolbarReady"
/// );
///
/// assert_eq!(TOOLBAR_READY.name(), "ToolbarReady");
/// ```
#[macro_export]
macro_rules! define_signal {
    ($(#[$meta:meta])* $name:ident, $display:literal) => {
        $(#[$meta])*
        pub const $name: $crate::Signal = $crate::Signal::new($display);
    };
}

// =============================================================================
// Clock
// =============================================================================

/// Parked wakers, keyed by the id of the [`Wait`] that parked them.
type Waiters = SmallVec<[(u64, Waker); 2]>;

#[derive(Default)]
struct TimerState {
    resolved: bool,
    waiters: Waiters,
}

/// Resolution state of every signal seen by one context.
#[derive(Default)]
pub(crate) struct Clock {
    timers: FxHashMap<CompactString, TimerState>,
    next_waiter: u64,
}

impl Clock {
    fn next_waiter(&mut self) -> u64 {
        self.next_waiter += 1;
        self.next_waiter
    }

    /// Poll on behalf of waiter `id`. A replaced waker is returned so it is
    /// dropped after the lock is released.
    fn poll_wait(&mut self, name: &str, id: u64, cx: &mut Context<'_>) -> (Poll<()>, Option<Waker>) {
        let state = self.timers.entry(name.into()).or_default();
        if state.resolved {
            return (Poll::Ready(()), None);
        }
        match state.waiters.iter_mut().find(|(waiter, _)| *waiter == id) {
            Some((_, waker)) if waker.will_wake(cx.waker()) => (Poll::Pending, None),
            Some((_, waker)) => (Poll::Pending, Some(std::mem::replace(waker, cx.waker().clone()))),
            None => {
                state.waiters.push((id, cx.waker().clone()));
                (Poll::Pending, None)
            }
        }
    }

    /// Forget waiter `id`, returning its waker.
    fn cancel(&mut self, name: &str, id: u64) -> Option<Waker> {
        let waiters = &mut self.timers.get_mut(name)?.waiters;
        let index = waiters.iter().position(|(waiter, _)| *waiter == id)?;
        Some(waiters.remove(index).1)
    }

    /// Mark resolved. Returns the wakers to notify, or `None` if the signal
    /// was already resolved.
    fn resolve(&mut self, name: &str) -> Option<Waiters> {
        let state = self.timers.entry(name.into()).or_default();
        if state.resolved {
            return None;
        }
        state.resolved = true;
        Some(std::mem::take(&mut state.waiters))
    }

    fn is_resolved(&self, name: &str) -> bool {
        self.timers.get(name).is_some_and(|s| s.resolved)
    }

    fn pending(&self) -> Vec<CompactString> {
        let mut names: Vec<_> = self
            .timers
            .iter()
            .filter(|(_, s)| !s.resolved && !s.waiters.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Shared handle to a [`Clock`].
#[derive(Clone, Default)]
pub(crate) struct SharedClock(Arc<Mutex<Clock>>);

impl SharedClock {
    /// Future resolving once `signal` is resolved.
    pub fn wait(&self, signal: &Signal) -> Wait {
        let id = self.0.lock().next_waiter();
        Wait {
            clock: self.clone(),
            signal: signal.clone(),
            id,
            parked: false,
        }
    }

    /// Resolve `signal`. `true` when this call changed it.
    pub fn resolve(&self, signal: &Signal) -> bool {
        // Wake outside the lock: a waker may poll inline.
        let wakers = self.0.lock().resolve(signal.name());
        match wakers {
            Some(wakers) => {
                tracing::trace!(signal = %signal, waiters = wakers.len(), "signal resolved");
                wakers.into_iter().for_each(|(_, waker)| waker.wake());
                true
            }
            None => false,
        }
    }

    /// Whether `signal` has been resolved.
    pub fn is_resolved(&self, signal: &Signal) -> bool {
        self.0.lock().is_resolved(signal.name())
    }

    /// Unresolved signals with at least one live waiter, sorted.
    pub fn pending(&self) -> Vec<CompactString> {
        self.0.lock().pending()
    }
}

// =============================================================================
// Wait future
// =============================================================================

/// Future returned by [`Ctx::wait`](super::Ctx::wait).
#[must_use = "futures do nothing unless awaited"]
///
/// Dropping a pending `Wait` unregisters it, so the signal no longer counts
/// as waited on.
pub struct Wait {
    clock: SharedClock,
    signal: Signal,
    id: u64,
    parked: bool,
}

impl Wait {
    /// The awaited signal.
    pub fn signal(&self) -> &Signal {
        &self.signal
    }
}

impl Future for Wait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let (poll, replaced) = this.clock.0.lock().poll_wait(this.signal.name(), this.id, cx);
        drop(replaced);
        match poll {
            Poll::Pending if !this.parked => {
                this.parked = true;
                tracing::trace!(signal = %this.signal, "waiting");
            }
            Poll::Ready(()) => this.parked = false,
            Poll::Pending => {}
        }
        poll
    }
}

impl Drop for Wait {
    fn drop(&mut self) {
        if self.parked {
            let waker = self.clock.0.lock().cancel(self.signal.name(), self.id);
            drop(waker);
        }
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait").field("signal", &self.signal).finish()
    }
}

/// Future returned by [`Ctx::wait_all`](super::Ctx::wait_all).
#[must_use = "futures do nothing unless awaited"]
pub struct WaitAll(Pin<Box<JoinAll<Wait>>>);

impl WaitAll {
    pub(crate) fn new(waits: impl IntoIterator<Item = Wait>) -> Self {
        Self(Box::pin(join_all(waits)))
    }
}

impl Future for WaitAll {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.0.as_mut().poll(cx).map(|_| ())
    }
}

impl fmt::Debug for WaitAll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WaitAll")
    }
}
