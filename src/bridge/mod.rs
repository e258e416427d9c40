//! Binding to a host UI framework.
//!
//! The host drives a [`HostEditor`] through its component lifecycle:
//!
//! ```text
//! before_mount()  ── marks this host as the active root instance
//! mounted().await ── calls GetEditor with the mount target, then create()
//! unmounted()     ── detaches the view and clears the active root instance
//! ```
//!
//! Node views rendered by host components go through [`RenderView`] and are
//! tracked as [`Portals`] owned by the host.

mod portal;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::editor::Editor;
use crate::error::EditorResult;
use crate::internal::{EDITOR_VIEW, ROOT};
use crate::prose::Root;

pub use portal::{Component, PORTAL_KEY_ATTR, Portals, RenderView};

/// Builds the editor for a mount target.
pub type GetEditor = Arc<dyn Fn(Root, RenderView) -> Editor + Send + Sync>;

/// Wrap a closure as a [`GetEditor`].
pub fn use_editor(f: impl Fn(Root, RenderView) -> Editor + Send + Sync + 'static) -> GetEditor {
    Arc::new(f)
}

// =============================================================================
// EditorRef
// =============================================================================

/// Handle given to the host for reaching the editor and its mount target.
#[derive(Clone)]
pub struct EditorRef {
    editor: Arc<Mutex<Option<Editor>>>,
    root: Root,
}

impl EditorRef {
    /// The editor, once created successfully.
    pub fn get(&self) -> Option<Editor> {
        self.editor.lock().clone()
    }

    /// The mount target handed to `GetEditor`.
    pub fn dom(&self) -> &Root {
        &self.root
    }
}

impl fmt::Debug for EditorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorRef")
            .field("created", &self.editor.lock().is_some())
            .finish()
    }
}

// =============================================================================
// EditorComponent
// =============================================================================

/// Owns the mount target and the created editor.
pub struct EditorComponent {
    get_editor: GetEditor,
    render: RenderView,
    handle: EditorRef,
}

impl EditorComponent {
    /// A component with a fresh, empty mount target.
    pub fn new(get_editor: GetEditor, render: RenderView) -> Self {
        Self {
            get_editor,
            render,
            handle: EditorRef {
                editor: Arc::default(),
                root: Root::new(),
            },
        }
    }

    /// Handle to the editor and its mount target.
    pub fn editor_ref(&self) -> EditorRef {
        self.handle.clone()
    }

    /// Build and create the editor. The handle is kept only on success.
    pub async fn mounted(&self) -> EditorResult<()> {
        let editor = (self.get_editor)(self.handle.root.clone(), self.render.clone());
        match editor.create().await {
            Ok(_) => {
                tracing::debug!("editor mounted");
                *self.handle.editor.lock() = Some(editor);
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "editor creation failed");
                Err(err)
            }
        }
    }

    /// Detach the root's first child and destroy the view.
    pub fn unmounted(&self) {
        let Some(editor) = self.handle.editor.lock().clone() else {
            return;
        };
        let view = editor.action(|ctx| ctx.get(&EDITOR_VIEW)).ok().and_then(Result::ok);
        let root = editor.action(|ctx| ctx.get(&ROOT)).ok().and_then(Result::ok).flatten();

        if let Some(root) = root {
            root.remove_first_child();
        }
        if let Some(view) = view {
            view.destroy();
        }
        tracing::debug!("editor unmounted");
    }
}

impl fmt::Debug for EditorComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorComponent").field("handle", &self.handle).finish()
    }
}

// =============================================================================
// HostEditor
// =============================================================================

static ROOT_INSTANCE: Mutex<Option<u64>> = parking_lot::const_mutex(None);

/// Id of the host currently between `before_mount` and `unmounted`.
///
/// Only one host is active at a time; the latest `before_mount` wins.
pub fn root_instance() -> Option<u64> {
    *ROOT_INSTANCE.lock()
}

/// The root host component: owns the portals and the editor component.
pub struct HostEditor {
    id: u64,
    portals: Portals,
    component: EditorComponent,
}

impl HostEditor {
    /// A host with its own portal registry.
    pub fn new(get_editor: GetEditor) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let portals = Portals::new();
        let component = EditorComponent::new(get_editor, RenderView::new(portals.clone()));
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            portals,
            component,
        }
    }

    /// Process-unique id, as reported by [`root_instance`].
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Portals rendered by node views of this host.
    pub fn portals(&self) -> &Portals {
        &self.portals
    }

    /// Handle to the editor and its mount target.
    pub fn editor_ref(&self) -> EditorRef {
        self.component.editor_ref()
    }

    /// Make this host the active root instance.
    pub fn before_mount(&self) {
        *ROOT_INSTANCE.lock() = Some(self.id);
    }

    /// Create the editor. See [`EditorComponent::mounted`].
    pub async fn mounted(&self) -> EditorResult<()> {
        self.component.mounted().await
    }

    /// Detach the view and release the root instance.
    pub fn unmounted(&self) {
        self.component.unmounted();
        let mut active = ROOT_INSTANCE.lock();
        if *active == Some(self.id) {
            *active = None;
        }
    }
}

impl fmt::Debug for HostEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEditor")
            .field("id", &self.id)
            .field("portals", &self.portals)
            .finish()
    }
}
