//! Change listeners.
//!
//! Register callbacks on the [`LISTENER`] slice (usually in a `config`
//! callback) and add [`ListenerPlugin`]:
//!
//! ```
//! use milkdown::Editor;
//! use milkdown::internal::defaults;
//! use milkdown::listener::{LISTENER, ListenerPlugin};
//!
//! let editor = Editor::make();
//! editor
//!     .use_plugins(defaults())?
//!     .use_plugin(ListenerPlugin)?
//!     .config(|ctx| {
//!         ctx.update_mut(&LISTENER, |listener| {
//!             listener.markdown(|_ctx, markdown, _prev| println!("{markdown}"));
//!         })
//!     })?;
//! # Ok::<(), milkdown::LifecycleError>(())
//! ```
//!
//! Callbacks of one kind run in registration order. The manager is read on
//! every change, so callbacks added after creation take effect too.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::ctx::{Ctx, SliceType};
use crate::editor::on_destroy;
use crate::error::BoxError;
use crate::internal::{EDITOR_VIEW, EDITOR_VIEW_READY, SERIALIZER};
use crate::plugin::{Activation, MilkdownPlugin};
use crate::prose::{EditorState, Node};

/// `(ctx, markdown, previous_markdown)`
pub type MarkdownListener = Arc<dyn Fn(&Ctx, &str, &str) + Send + Sync>;
/// `(ctx, doc, previous_doc)`
pub type DocListener = Arc<dyn Fn(&Ctx, &Node, &Node) + Send + Sync>;
pub type LifecycleListener = Arc<dyn Fn(&Ctx) + Send + Sync>;

/// Ordered callback lists, one per event.
#[derive(Clone, Default)]
pub struct ListenerManager {
    markdown: Vec<MarkdownListener>,
    doc: Vec<DocListener>,
    updated: Vec<DocListener>,
    mounted: Vec<LifecycleListener>,
    destroy: Vec<LifecycleListener>,
}

impl ListenerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized markdown changed.
    pub fn markdown(&mut self, f: impl Fn(&Ctx, &str, &str) + Send + Sync + 'static) -> &mut Self {
        self.markdown.push(Arc::new(f));
        self
    }

    /// Document changed.
    pub fn doc(&mut self, f: impl Fn(&Ctx, &Node, &Node) + Send + Sync + 'static) -> &mut Self {
        self.doc.push(Arc::new(f));
        self
    }

    /// Any transaction was dispatched, changed or not.
    pub fn updated(&mut self, f: impl Fn(&Ctx, &Node, &Node) + Send + Sync + 'static) -> &mut Self {
        self.updated.push(Arc::new(f));
        self
    }

    /// The view was mounted.
    pub fn mounted(&mut self, f: impl Fn(&Ctx) + Send + Sync + 'static) -> &mut Self {
        self.mounted.push(Arc::new(f));
        self
    }

    /// The editor is being destroyed.
    pub fn destroy(&mut self, f: impl Fn(&Ctx) + Send + Sync + 'static) -> &mut Self {
        self.destroy.push(Arc::new(f));
        self
    }

    fn emit_change(&self, ctx: &Ctx, prev: &EditorState, next: &EditorState) {
        for f in &self.updated {
            f(ctx, next.doc(), prev.doc());
        }
        if prev.doc() == next.doc() {
            return;
        }
        for f in &self.doc {
            f(ctx, next.doc(), prev.doc());
        }
        if self.markdown.is_empty() {
            return;
        }
        let Ok(serialize) = ctx.get(&SERIALIZER) else {
            tracing::debug!("no serializer, markdown listeners skipped");
            return;
        };
        let (markdown, previous) = (serialize(next.doc()), serialize(prev.doc()));
        if markdown != previous {
            for f in &self.markdown {
                f(ctx, &markdown, &previous);
            }
        }
    }
}

impl fmt::Debug for ListenerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerManager")
            .field("markdown", &self.markdown.len())
            .field("doc", &self.doc.len())
            .field("updated", &self.updated.len())
            .field("mounted", &self.mounted.len())
            .field("destroy", &self.destroy.len())
            .finish()
    }
}

pub const LISTENER: SliceType<ListenerManager> = SliceType::with_default("listener", ListenerManager::new);

/// Forwards view changes and lifecycle events to [`LISTENER`] callbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerPlugin;

impl MilkdownPlugin for ListenerPlugin {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("listener")
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        Box::pin(activate(ctx.clone()))
    }
}

async fn activate(ctx: Ctx) -> Result<(), BoxError> {
    ctx.wait(&EDITOR_VIEW_READY).await;
    let view = ctx.get(&EDITOR_VIEW)?;

    // The view lives in the context; hold the context weakly from its hook.
    let weak = ctx.downgrade();
    view.on_dispatch(move |prev, next| {
        let Some(ctx) = weak.upgrade() else { return };
        match ctx.get(&LISTENER) {
            Ok(listener) => listener.emit_change(&ctx, prev, next),
            Err(err) => tracing::debug!(error = %err, "listener unavailable"),
        }
    });

    on_destroy(&ctx, |ctx| {
        if let Ok(listener) = ctx.get(&LISTENER) {
            for f in &listener.destroy {
                f(ctx);
            }
        }
    })?;

    let listener = ctx.get(&LISTENER)?;
    tracing::trace!(callbacks = listener.mounted.len(), "view mounted");
    for f in &listener.mounted {
        f(&ctx);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use crate::internal::defaults;
    use parking_lot::Mutex;

    fn paragraph(text: &str) -> Node {
        Node::empty_doc().child(Node::new("paragraph").child(Node::text(text)))
    }

    #[tokio::test]
    async fn test_events_in_order() {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = log.clone();

        let editor = Editor::make();
        editor
            .use_plugin(ListenerPlugin)
            .unwrap()
            .use_plugins(defaults())
            .unwrap()
            .config(move |ctx| {
                let (a, b, c, d, e) = (sink.clone(), sink.clone(), sink.clone(), sink.clone(), sink);
                ctx.update_mut(&LISTENER, move |listener| {
                    listener
                        .mounted(move |_| a.lock().push("mounted".into()))
                        .updated(move |_, _, _| b.lock().push("updated".into()))
                        .doc(move |_, doc, _| c.lock().push(format!("doc:{}", doc.text_content())))
                        .markdown(move |_, md, prev| d.lock().push(format!("md:{prev}->{md}")))
                        .destroy(move |_| e.lock().push("destroy".into()));
                })
            })
            .unwrap();
        editor.create().await.unwrap();
        assert_eq!(*log.lock(), vec!["mounted"]);

        let view = editor.action(|ctx| ctx.get(&EDITOR_VIEW)).unwrap().unwrap();
        view.dispatch(view.state().tr().replace_doc(paragraph("hi")));
        view.dispatch(view.state().tr());
        editor.destroy().unwrap();

        assert_eq!(
            *log.lock(),
            vec!["mounted", "updated", "doc:hi", "md:->hi", "updated", "destroy"]
        );
    }

    #[tokio::test]
    async fn test_late_registration_is_seen() {
        let count = Arc::new(Mutex::new(0));
        let editor = Editor::make();
        editor.use_plugins(defaults()).unwrap().use_plugin(ListenerPlugin).unwrap();
        editor.create().await.unwrap();

        let counter = count.clone();
        editor
            .action(|ctx| {
                ctx.update_mut(&LISTENER, |l| {
                    l.doc(move |_, _, _| *counter.lock() += 1);
                })
            })
            .unwrap()
            .unwrap();
        let view = editor.action(|ctx| ctx.get(&EDITOR_VIEW)).unwrap().unwrap();
        view.dispatch(view.state().tr().replace_doc(paragraph("x")));
        assert_eq!(*count.lock(), 1);
    }
}
