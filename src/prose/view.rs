//! The editor view: renders state into a [`Root`] and routes input.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use compact_str::{CompactString, ToCompactString};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::dom::{DomNode, Root};
use super::model::Node;
use super::state::{EditorState, Transaction};

/// Attribute tagging the element a view mounted into its root.
pub const VIEW_ID_ATTR: &str = "data-milkdown-view";

/// Custom rendering for one node.
pub trait NodeView: Send {
    fn dom(&self) -> DomNode;

    /// Called when the view is dropped from the rendered document.
    fn destroy(&mut self) {}
}

/// Builds a [`NodeView`] for a node of the type it was registered for.
pub type NodeViewConstructor = Arc<dyn Fn(&Node) -> Box<dyn NodeView> + Send + Sync>;

/// Called after every dispatched transaction with `(previous, next)`.
pub type DispatchHook = Arc<dyn Fn(&EditorState, &EditorState) + Send + Sync>;

struct ViewInner {
    id: CompactString,
    root: Option<Root>,
    state: RwLock<EditorState>,
    dom: Mutex<DomNode>,
    node_views: Vec<(CompactString, NodeViewConstructor)>,
    mounted: Mutex<Vec<Box<dyn NodeView>>>,
    hooks: Mutex<Vec<DispatchHook>>,
    destroyed: AtomicBool,
}

/// Handle to a mounted view. Cloning shares the view.
#[derive(Clone)]
pub struct EditorView {
    inner: Arc<ViewInner>,
}

impl EditorView {
    /// Create a view and render it into `root`, if any.
    ///
    /// For a node type with several constructors the last one wins.
    pub fn new(
        root: Option<Root>,
        state: EditorState,
        node_views: impl IntoIterator<Item = (CompactString, NodeViewConstructor)>,
    ) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed).to_compact_string();

        let view = Self {
            inner: Arc::new(ViewInner {
                id,
                root,
                state: RwLock::new(state),
                dom: Mutex::new(DomNode::element("div")),
                node_views: node_views.into_iter().collect(),
                mounted: Mutex::new(Vec::new()),
                hooks: Mutex::new(Vec::new()),
                destroyed: AtomicBool::new(false),
            }),
        };
        view.render();
        tracing::debug!(view = %view.inner.id, mounted = view.inner.root.is_some(), "editor view created");
        view
    }

    /// Unique id, rendered as the `data-milkdown-view` attribute.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> EditorState {
        self.inner.state.read().clone()
    }

    /// The rendered element.
    pub fn dom(&self) -> DomNode {
        self.inner.dom.lock().clone()
    }

    /// The mount target, if any.
    pub fn root(&self) -> Option<&Root> {
        self.inner.root.as_ref()
    }

    /// Whether `destroy` ran.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Apply a transaction, re-render and notify dispatch hooks.
    ///
    /// Returns `false` once the view is destroyed.
    pub fn dispatch(&self, tr: Transaction) -> bool {
        if self.is_destroyed() {
            tracing::debug!(view = %self.inner.id, "dispatch on destroyed view ignored");
            return false;
        }
        let changed = tr.doc_changed();
        let (prev, next) = {
            let mut state = self.inner.state.write();
            let prev = state.clone();
            *state = prev.apply(tr);
            (prev, state.clone())
        };
        self.after_update(&prev, &next, changed);
        true
    }

    /// Replace the whole state, e.g. after reconfiguring plugins.
    pub fn update_state(&self, next: EditorState) {
        if self.is_destroyed() {
            return;
        }
        let prev = std::mem::replace(&mut *self.inner.state.write(), next.clone());
        let changed = prev.doc() != next.doc();
        self.after_update(&prev, &next, changed);
    }

    fn after_update(&self, prev: &EditorState, next: &EditorState, changed: bool) {
        if changed {
            self.render();
        }
        let hooks = self.inner.hooks.lock().clone();
        for hook in &hooks {
            hook(prev, next);
        }
    }

    /// Offer a key press to the engine plugins, latest registered first.
    pub fn handle_key(&self, key: &str) -> bool {
        let state = self.state();
        let handled = state.plugins().iter().rev().find_map(|p| p.handle_key(&state, key).map(|tr| (p.key(), tr)));
        match handled {
            Some((plugin, tr)) => {
                tracing::trace!(view = %self.inner.id, key, plugin, "key handled");
                self.dispatch(tr)
            }
            None => false,
        }
    }

    /// Register a dispatch hook.
    pub fn on_dispatch(&self, hook: impl Fn(&EditorState, &EditorState) + Send + Sync + 'static) {
        self.inner.hooks.lock().push(Arc::new(hook));
    }

    /// Tear down node views, unmount from the root and drop hooks.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let views = std::mem::take(&mut *self.inner.mounted.lock());
        for mut view in views {
            view.destroy();
        }
        if let Some(root) = &self.inner.root {
            root.remove_child_where(VIEW_ID_ATTR, &self.inner.id);
        }
        self.inner.hooks.lock().clear();
        tracing::debug!(view = %self.inner.id, "editor view destroyed");
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn render(&self) {
        let state = self.state();
        let mut views = Vec::new();
        let dom = state
            .doc()
            .content
            .iter()
            .fold(
                DomNode::element("div")
                    .with_attr("class", "milkdown")
                    .with_attr(VIEW_ID_ATTR, self.inner.id.clone()),
                |dom, child| dom.with_child(self.render_node(child, &mut views)),
            );

        let stale = std::mem::replace(&mut *self.inner.mounted.lock(), views);
        for mut view in stale {
            view.destroy();
        }
        if let Some(root) = &self.inner.root {
            root.upsert_child(VIEW_ID_ATTR, &self.inner.id, dom.clone());
        }
        *self.inner.dom.lock() = dom;
    }

    fn render_node(&self, node: &Node, views: &mut Vec<Box<dyn NodeView>>) -> DomNode {
        if node.is_text() {
            let text = DomNode::text(node.text.clone().unwrap_or_default());
            return node
                .marks
                .iter()
                .rev()
                .fold(text, |inner, mark| DomNode::element(mark.type_name.clone()).with_child(inner));
        }

        if let Some((_, construct)) = self.inner.node_views.iter().rev().find(|(name, _)| *name == node.type_name) {
            let view = construct(node);
            let dom = view.dom();
            views.push(view);
            return dom;
        }

        let element = node.attrs.iter().fold(DomNode::element(node.type_name.clone()), |el, (key, value)| {
            let value = match value {
                Value::String(s) => s.to_compact_string(),
                other => other.to_compact_string(),
            };
            el.with_attr(key.as_str(), value)
        });
        node.content
            .iter()
            .fold(element, |el, child| el.with_child(self.render_node(child, views)))
    }
}

impl fmt::Debug for EditorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorView")
            .field("id", &self.inner.id)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
