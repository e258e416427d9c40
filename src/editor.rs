//! Plugin loader and editor lifecycle.
//!
//! ```text
//!   Idle ──create()──► OnCreate ──all activations ok──► Created ──destroy()──► Destroyed
//!                          │                                                      ▲
//!                          └──any activation failed──► Failed ──destroy()─────────┘
//! ```
//!
//! `create()` runs in three steps:
//!
//! 1. `setup(&ctx)` for each plugin, in registration order
//! 2. every `config` callback, in order
//! 3. all activations polled together until each one finished
//!
//! # Example
//!
//! ```
//! use milkdown::{Editor, SliceType, plugin};
//! use milkdown::internal::SCHEMA_READY;
//!
//! const SCHEMA: SliceType<u32> = SliceType::new("schema");
//! const DERIVED: SliceType<u32> = SliceType::new("derived");
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let editor = Editor::make();
//! editor
//!     .use_plugin(plugin("producer", |ctx| async move {
//!         ctx.set(&SCHEMA, 42)?;
//!         ctx.resolve(&SCHEMA_READY);
//!         Ok(())
//!     }))?
//!     .use_plugin(plugin("consumer", |ctx| async move {
//!         ctx.wait(&SCHEMA_READY).await;
//!         let schema = ctx.get(&SCHEMA)?;
//!         ctx.set(&DERIVED, schema * 2)?;
//!         Ok(())
//!     }))?;
//! editor.create().await?;
//!
//! assert_eq!(editor.action(|ctx| ctx.get(&DERIVED))?, Ok(84));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use futures_util::future::join_all;
use parking_lot::Mutex;

use crate::ctx::{Ctx, SliceType};
use crate::error::{
    ActivationError, ActivationErrors, BoxError, CtxResult, EditorError, EditorResult, LifecycleError,
};
use crate::plugin::MilkdownPlugin;

// =============================================================================
// Status
// =============================================================================

/// Lifecycle status of an [`Editor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorStatus {
    /// Accepting plugins and config callbacks.
    Idle,
    /// `create` is running.
    OnCreate,
    /// Every activation finished successfully.
    Created,
    /// At least one activation or config callback failed.
    Failed,
    /// `destroy` ran; the context is gone.
    Destroyed,
}

impl EditorStatus {
    /// Lowercase name used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::OnCreate => "on-create",
            Self::Created => "created",
            Self::Failed => "failed",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for EditorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Cleanup hooks
// =============================================================================

/// Teardown callback run by [`Editor::destroy`].
pub type Cleanup = Arc<dyn Fn(&Ctx) + Send + Sync>;

/// Cleanup hooks, run latest first on destroy.
pub const CLEANUP: SliceType<Vec<Cleanup>> = SliceType::with_default("cleanup", Vec::new);

/// Register a teardown callback.
pub fn on_destroy(ctx: &Ctx, f: impl Fn(&Ctx) + Send + Sync + 'static) -> CtxResult<()> {
    let hook: Cleanup = Arc::new(f);
    ctx.update_mut(&CLEANUP, |hooks| hooks.push(hook))
}

// =============================================================================
// Editor
// =============================================================================

type ConfigFn = Box<dyn FnOnce(&Ctx) -> Result<(), BoxError> + Send>;

struct Registry {
    status: EditorStatus,
    plugins: Vec<Arc<dyn MilkdownPlugin>>,
    configs: Vec<ConfigFn>,
}

struct EditorInner {
    ctx: Ctx,
    registry: Mutex<Registry>,
}

/// An editor under construction or constructed.
///
/// Cloning yields another handle to the same editor.
#[derive(Clone)]
pub struct Editor {
    inner: Arc<EditorInner>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::make()
    }
}

impl Editor {
    /// Create an editor with no plugins.
    pub fn make() -> Self {
        Self {
            inner: Arc::new(EditorInner {
                ctx: Ctx::new(),
                registry: Mutex::new(Registry {
                    status: EditorStatus::Idle,
                    plugins: Vec::new(),
                    configs: Vec::new(),
                }),
            }),
        }
    }

    fn check_idle(registry: &Registry) -> Result<(), LifecycleError> {
        match registry.status {
            EditorStatus::Idle => Ok(()),
            EditorStatus::Destroyed => Err(LifecycleError::Destroyed),
            _ => Err(LifecycleError::AlreadyCreated),
        }
    }

    /// Register a plugin.
    pub fn use_plugin(&self, plugin: impl MilkdownPlugin + 'static) -> Result<&Self, LifecycleError> {
        self.use_arc(Arc::new(plugin))
    }

    /// Register a shared plugin.
    pub fn use_arc(&self, plugin: Arc<dyn MilkdownPlugin>) -> Result<&Self, LifecycleError> {
        let mut registry = self.inner.registry.lock();
        Self::check_idle(&registry)?;
        tracing::trace!(plugin = %plugin.name(), index = registry.plugins.len(), "plugin registered");
        registry.plugins.push(plugin);
        Ok(self)
    }

    /// Register several plugins in order.
    pub fn use_plugins(
        &self,
        plugins: impl IntoIterator<Item = Arc<dyn MilkdownPlugin>>,
    ) -> Result<&Self, LifecycleError> {
        let mut registry = self.inner.registry.lock();
        Self::check_idle(&registry)?;
        registry.plugins.extend(plugins);
        Ok(self)
    }

    /// Register a synchronous configuration callback.
    ///
    /// Callbacks run after every plugin's setup and before any activation.
    pub fn config<F, E>(&self, f: F) -> Result<&Self, LifecycleError>
    where
        F: FnOnce(&Ctx) -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        let mut registry = self.inner.registry.lock();
        Self::check_idle(&registry)?;
        registry.configs.push(Box::new(move |ctx: &Ctx| f(ctx).map_err(Into::into)));
        Ok(self)
    }

    /// Run every plugin and wait for all activations.
    ///
    /// On failure the editor is left in [`EditorStatus::Failed`]; context
    /// writes made by successful plugins are kept.
    pub async fn create(&self) -> EditorResult<&Self> {
        let (plugins, configs) = {
            let mut registry = self.inner.registry.lock();
            Self::check_idle(&registry)?;
            registry.status = EditorStatus::OnCreate;
            (registry.plugins.clone(), std::mem::take(&mut registry.configs))
        };
        let ctx = &self.inner.ctx;
        tracing::debug!(plugins = plugins.len(), configs = configs.len(), "creating editor");

        let activations: Vec<_> = plugins
            .iter()
            .enumerate()
            .map(|(index, plugin)| {
                let name = CompactString::from(plugin.name());
                tracing::trace!(plugin = %name, index, "plugin setup");
                let activation = plugin.setup(ctx);
                async move {
                    let result = activation.await;
                    match &result {
                        Ok(()) => tracing::trace!(plugin = %name, "plugin activated"),
                        Err(err) => tracing::debug!(plugin = %name, error = %err, "plugin failed"),
                    }
                    result.map_err(|err| ActivationError::new(name, index, err))
                }
            })
            .collect();

        let mut errors = ActivationErrors::new();
        for (index, configure) in configs.into_iter().enumerate() {
            if let Err(err) = configure(ctx) {
                errors.push(ActivationError::new(format!("config#{index}"), index, err));
            }
        }
        if !errors.is_empty() {
            self.set_status(EditorStatus::Failed);
            return Err(EditorError::Activation(errors));
        }

        for result in join_all(activations).await {
            if let Err(err) = result {
                errors.push(err);
            }
        }

        if errors.is_empty() {
            self.set_status(EditorStatus::Created);
            tracing::debug!("editor created");
            Ok(self)
        } else {
            self.set_status(EditorStatus::Failed);
            tracing::debug!(failed = errors.len(), "editor creation failed");
            Err(EditorError::Activation(errors))
        }
    }

    /// Run `f` with the live context. Only valid once `create()` succeeded.
    pub fn action<R>(&self, f: impl FnOnce(&Ctx) -> R) -> Result<R, LifecycleError> {
        match self.status() {
            EditorStatus::Created => Ok(f(&self.inner.ctx)),
            EditorStatus::Destroyed => Err(LifecycleError::Destroyed),
            status => Err(LifecycleError::NotCreated { status }),
        }
    }

    /// Run cleanup hooks and tear down the context.
    pub fn destroy(&self) -> Result<(), LifecycleError> {
        let status = self.status();
        match status {
            EditorStatus::Destroyed => return Err(LifecycleError::Destroyed),
            EditorStatus::OnCreate => return Err(LifecycleError::NotCreated { status }),
            _ => {}
        }

        let ctx = &self.inner.ctx;
        let hooks = ctx.remove(&CLEANUP).ok().flatten().unwrap_or_default();
        tracing::debug!(hooks = hooks.len(), "destroying editor");
        for hook in hooks.iter().rev() {
            hook(ctx);
        }
        ctx.destroy();
        self.set_status(EditorStatus::Destroyed);
        Ok(())
    }

    /// Current lifecycle status.
    pub fn status(&self) -> EditorStatus {
        self.inner.registry.lock().status
    }

    /// The context regardless of status.
    ///
    /// For hosts that need to inspect a failed or in-flight editor; plugin
    /// code should go through [`action`](Self::action).
    pub fn ctx(&self) -> &Ctx {
        &self.inner.ctx
    }

    /// Number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.inner.registry.lock().plugins.len()
    }

    /// Names of registered plugins, in registration order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.inner
            .registry
            .lock()
            .plugins
            .iter()
            .map(|p| p.name().into_owned())
            .collect()
    }

    fn set_status(&self, status: EditorStatus) {
        let mut registry = self.inner.registry.lock();
        tracing::trace!(from = %registry.status, to = %status, "editor status");
        registry.status = status;
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("Editor")
            .field("status", &registry.status)
            .field("plugins", &registry.plugins.len())
            .finish()
    }
}
