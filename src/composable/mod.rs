//! Plugin factories.
//!
//! A composable turns a configuration function `Fn(&Ctx) -> T` into a plugin
//! whose activation
//!
//! 1. waits on a fixed prerequisite signal,
//! 2. builds the value,
//! 3. folds it into a shared slice,
//! 4. stores it in the plugin's output cell.
//!
//! When the target slice is read by a producer that may run before this
//! plugin, the composable also registers a gate on the producer's timer list
//! during setup. The gate is resolved after the merge, whether or not the
//! build succeeded, so a failing contribution surfaces as an activation error
//! rather than a stalled editor.
//!
//! # Example
//!
//! ```
//! use milkdown::Editor;
//! use milkdown::composable::shortcut;
//! use milkdown::internal::defaults;
//! use milkdown::prose::{Keymap, command};
//!
//! let save = shortcut(|_ctx| Keymap::new().bind("Mod-s", command(|_| None)));
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let editor = Editor::make();
//! editor.use_plugins(defaults())?.use_plugin(save.clone())?;
//! editor.create().await?;
//! assert!(save.output().is_some_and(|k| k.contains("Ctrl-s")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

mod command;
mod schema;
mod shortcut;
mod slice;
mod view;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::RwLock;

use crate::ctx::{Ctx, Signal, SliceType};
use crate::error::{BoxError, CtxResult};
use crate::plugin::{Activation, MilkdownPlugin};

pub use command::command;
pub use schema::{mark, node};
pub use shortcut::{prose_plugin, shortcut};
pub use slice::{CtxSlice, ctx_slice};
pub use view::node_view;

type BuildFn<T> = Box<dyn Fn(&Ctx) -> Result<T, BoxError> + Send + Sync>;
type MergeFn<T> = Box<dyn Fn(&Ctx, &T) -> CtxResult<()> + Send + Sync>;

struct Shared<T> {
    name: CompactString,
    prerequisite: Signal,
    gate: Option<SliceType<Vec<Signal>>>,
    build: BuildFn<T>,
    merge: MergeFn<T>,
    output: RwLock<Option<T>>,
}

impl<T> Shared<T> {
    fn run(&self, ctx: &Ctx) -> Result<(), BoxError> {
        let value = (self.build)(ctx)?;
        (self.merge)(ctx, &value)?;
        *self.output.write() = Some(value);
        tracing::trace!(plugin = %self.name, "composable merged");
        Ok(())
    }
}

/// A plugin built from a configuration function. See the module docs.
///
/// Clones share the output cell, so a clone kept by the caller observes the
/// value produced by the clone handed to the editor.
pub struct Composable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Composable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Composable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<CompactString>,
        prerequisite: Signal,
        build: impl Fn(&Ctx) -> Result<T, BoxError> + Send + Sync + 'static,
        merge: impl Fn(&Ctx, &T) -> CtxResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self::with_gate(name, prerequisite, None, build, merge)
    }

    fn with_gate(
        name: impl Into<CompactString>,
        prerequisite: Signal,
        gate: Option<SliceType<Vec<Signal>>>,
        build: impl Fn(&Ctx) -> Result<T, BoxError> + Send + Sync + 'static,
        merge: impl Fn(&Ctx, &T) -> CtxResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                prerequisite,
                gate,
                build: Box::new(build),
                merge: Box::new(merge),
                output: RwLock::new(None),
            }),
        }
    }

    /// Hold back the producer reading `timer` until this plugin merged.
    ///
    /// Only meaningful before the composable is shared.
    pub fn gate(self, timer: SliceType<Vec<Signal>>) -> Self {
        match Arc::try_unwrap(self.shared) {
            Ok(mut shared) => {
                shared.gate = Some(timer);
                Self {
                    shared: Arc::new(shared),
                }
            }
            Err(shared) => {
                tracing::debug!(plugin = %shared.name, "gate ignored on shared composable");
                Self { shared }
            }
        }
    }

    /// The value produced by the last successful activation.
    pub fn output(&self) -> Option<T> {
        self.shared.output.read().clone()
    }

    pub fn prerequisite(&self) -> &Signal {
        &self.shared.prerequisite
    }
}

impl<T> MilkdownPlugin for Composable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.shared.name)
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        let gate = match &self.shared.gate {
            Some(timer) => {
                let signal = Signal::unique(&self.shared.name);
                if let Err(err) = ctx.update_mut(timer, |timers| timers.push(signal.clone())) {
                    return Box::pin(std::future::ready(Err::<(), BoxError>(err.into())));
                }
                Some(signal)
            }
            None => None,
        };
        Box::pin(activate(ctx.clone(), Arc::clone(&self.shared), gate))
    }
}

async fn activate<T>(ctx: Ctx, shared: Arc<Shared<T>>, gate: Option<Signal>) -> Result<(), BoxError>
where
    T: Send + Sync + 'static,
{
    ctx.wait(&shared.prerequisite).await;
    let result = shared.run(&ctx);
    if let Some(gate) = &gate {
        ctx.resolve(gate);
    }
    result
}

impl<T> fmt::Debug for Composable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composable")
            .field("name", &self.shared.name)
            .field("prerequisite", &self.shared.prerequisite)
            .field("gated", &self.shared.gate.is_some())
            .field("has_output", &self.shared.output.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use crate::internal::{self, EDITOR_VIEW, NODES, SCHEMA};
    use crate::prose::{Keymap, NodeSpec, command as prose_command};

    const COUNTER: SliceType<Vec<u32>> = SliceType::with_default("counter", Vec::new);

    fn counter(value: u32) -> Composable<u32> {
        Composable::new(
            format!("counter{value}"),
            internal::INIT_READY,
            move |_| Ok(value),
            |ctx, v: &u32| ctx.update_mut(&COUNTER, |c| c.push(*v)),
        )
    }

    #[tokio::test]
    async fn test_output_is_shared_with_clones() {
        let plugin = counter(7);
        assert_eq!(plugin.output(), None);

        let editor = Editor::make();
        editor.use_plugins(internal::defaults()).unwrap().use_plugin(plugin.clone()).unwrap();
        editor.create().await.unwrap();

        assert_eq!(plugin.output(), Some(7));
        assert_eq!(editor.action(|ctx| ctx.get(&COUNTER)).unwrap(), Ok(vec![7]));
    }

    #[tokio::test]
    async fn test_failed_build_still_opens_gate() {
        let failing: Composable<NodeSpec> = Composable::new(
            "broken",
            internal::INIT_READY,
            |_| Err("no spec".into()),
            |ctx, spec: &NodeSpec| ctx.update_mut(&NODES, |n| n.push(spec.clone())),
        )
        .gate(internal::SCHEMA_TIMER);

        let editor = Editor::make();
        editor.use_plugins(internal::defaults()).unwrap().use_plugin(failing.clone()).unwrap();
        let err = editor.create().await.unwrap_err();

        assert_eq!(err.activation().unwrap().plugins(), vec!["broken"]);
        assert!(editor.ctx().contains(&EDITOR_VIEW));
        assert_eq!(failing.output(), None);
    }

    async fn snapshot(plugins: Vec<Arc<dyn MilkdownPlugin>>) -> (Vec<CompactString>, Vec<String>, Vec<String>) {
        let editor = Editor::make();
        editor.use_plugins(plugins).unwrap();
        editor.create().await.unwrap();
        editor
            .action(|ctx| {
                let schema = ctx.get(&SCHEMA).unwrap();
                let keys = crate::prose::combined_keymap(ctx.get(&EDITOR_VIEW).unwrap().state().plugins());
                (
                    ctx.slice_names(),
                    schema.node_names().map(String::from).collect(),
                    keys.keys().into_iter().map(String::from).collect(),
                )
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_registration_order_converges() {
        let heading = node(|_| NodeSpec::block("heading"));
        let keys = shortcut(|_| Keymap::new().bind("Enter", prose_command(|_| None)));

        let mut forward = internal::defaults();
        forward.push(Arc::new(heading.clone()));
        forward.push(Arc::new(keys.clone()));

        let mut reverse: Vec<Arc<dyn MilkdownPlugin>> = vec![Arc::new(keys), Arc::new(heading)];
        reverse.extend(internal::defaults().into_iter().rev());

        assert_eq!(snapshot(forward).await, snapshot(reverse).await);
    }
}
