//! Host components rendered inside the document.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use compact_str::{CompactString, format_compact};
use parking_lot::Mutex;

use crate::ctx::Ctx;
use crate::prose::{DomNode, Node, NodeView, NodeViewConstructor};

/// A host component: renders one document node.
pub type Component = Arc<dyn Fn(&Node) -> DomNode + Send + Sync>;

/// Attribute carrying the portal key on a node view's element.
pub const PORTAL_KEY_ATTR: &str = "data-portal";

struct Portal {
    key: CompactString,
    component: Component,
    node: Node,
}

/// Live component instances, keyed.
///
/// Cloning shares the registry.
#[derive(Clone, Default)]
pub struct Portals {
    entries: Arc<Mutex<Vec<Portal>>>,
}

impl Portals {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component` rendering `node` under `key`.
    pub fn add(&self, key: impl Into<CompactString>, component: Component, node: Node) {
        let key = key.into();
        tracing::trace!(portal = %key, "portal added");
        self.entries.lock().push(Portal { key, component, node });
    }

    /// Remove by key. Unknown keys are ignored.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|p| p.key == key) {
            Some(index) => {
                entries.remove(index);
                tracing::trace!(portal = key, "portal removed");
                true
            }
            None => false,
        }
    }

    /// Registered keys, in insertion order.
    pub fn keys(&self) -> Vec<CompactString> {
        self.entries.lock().iter().map(|p| p.key.clone()).collect()
    }

    /// Number of live portals.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no portal is live.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Render one portal's component.
    pub fn render(&self, key: &str) -> Option<DomNode> {
        let (component, node) = {
            let entries = self.entries.lock();
            let portal = entries.iter().find(|p| p.key == key)?;
            (Arc::clone(&portal.component), portal.node.clone())
        };
        Some(component(&node))
    }
}

impl fmt::Debug for Portals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

struct PortalView {
    key: CompactString,
    dom: DomNode,
    portals: Portals,
}

impl NodeView for PortalView {
    fn dom(&self) -> DomNode {
        self.dom.clone()
    }

    fn destroy(&mut self) {
        self.portals.remove(&self.key);
    }
}

/// Turns host components into node-view constructors backed by [`Portals`].
#[derive(Clone, Debug, Default)]
pub struct RenderView {
    portals: Portals,
}

impl RenderView {
    /// Render node views through `portals`.
    pub fn new(portals: Portals) -> Self {
        Self { portals }
    }

    /// The registry node views register into.
    pub fn portals(&self) -> &Portals {
        &self.portals
    }

    /// A node-view factory for `component`, for use with
    /// [`node_view`](crate::composable::node_view).
    ///
    /// Each rendered node gets its own portal, removed when the node view is
    /// destroyed.
    pub fn render(&self, component: Component) -> impl Fn(&Ctx) -> NodeViewConstructor + Send + Sync + 'static {
        let portals = self.portals.clone();
        move |_ctx| {
            let portals = portals.clone();
            let component = Arc::clone(&component);
            let constructor: NodeViewConstructor = Arc::new(move |node: &Node| -> Box<dyn NodeView> {
                static NEXT_KEY: AtomicU64 = AtomicU64::new(0);
                let key = format_compact!("portal-{}", NEXT_KEY.fetch_add(1, Ordering::Relaxed));
                let dom = DomNode::element("div")
                    .with_attr(PORTAL_KEY_ATTR, key.clone())
                    .with_child(component(node));
                portals.add(key.clone(), Arc::clone(&component), node.clone());
                Box::new(PortalView {
                    key,
                    dom,
                    portals: portals.clone(),
                })
            });
            constructor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_lifecycle() {
        let render = RenderView::default();
        let component: Component = Arc::new(|node: &Node| DomNode::element("x-card").with_child(DomNode::text(node.text_content())));
        let factory = render.render(component);
        let construct = factory(&Ctx::new());

        let mut view = construct(&Node::new("paragraph").child(Node::text("hi")));
        let dom = view.dom();
        let key = dom.attr(PORTAL_KEY_ATTR).unwrap().to_owned();
        assert_eq!(dom.text_content(), "hi");
        assert_eq!(render.portals().keys(), vec![CompactString::from(key.as_str())]);
        assert_eq!(render.portals().render(&key).map(|d| d.to_html()), Some("<x-card>hi</x-card>".into()));

        view.destroy();
        assert!(render.portals().is_empty());
        assert!(!render.portals().remove(&key));
    }
}
