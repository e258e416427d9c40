//! Error types for milkdown.
//!
//! Each concern has its own error: context access ([`CtxError`]), builder
//! misuse ([`LifecycleError`]) and plugin activation ([`ActivationError`],
//! aggregated into [`ActivationErrors`]). [`EditorError`] is what
//! [`Editor::create`](crate::Editor::create) returns.

use std::error::Error as StdError;
use std::fmt;

use compact_str::CompactString;
use thiserror::Error;

use crate::editor::EditorStatus;

/// Boxed error returned by plugin activations.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// =============================================================================
// CtxError
// =============================================================================

/// Errors raised by the context store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CtxError {
    /// The slice was never set and declares no default.
    #[error("context slice `{slice}` not found")]
    NotFound {
        /// Slice name
        slice: CompactString,
    },

    /// The slice name is already bound to a value of another type.
    #[error("context slice `{slice}` holds `{found}`, requested as `{expected}`")]
    TypeMismatch {
        /// Slice name
        slice: CompactString,
        /// Type requested by the caller
        expected: &'static str,
        /// Type the slice was first registered with
        found: &'static str,
    },

    /// The context was torn down by `Editor::destroy`.
    #[error("context has been destroyed")]
    Destroyed,
}

/// Result type alias for context operations.
pub type CtxResult<T> = Result<T, CtxError>;

impl CtxError {
    /// Create a not-found error for a slice name.
    pub fn not_found(slice: impl Into<CompactString>) -> Self {
        Self::NotFound { slice: slice.into() }
    }
}

// =============================================================================
// LifecycleError
// =============================================================================

/// Builder API misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `use_plugin`, `config` or `create` after `create` was invoked.
    #[error("editor creation already started")]
    AlreadyCreated,

    /// `action` before `create` resolved successfully.
    #[error("editor is not created (status: {status})")]
    NotCreated {
        /// Status at the time of the call
        status: EditorStatus,
    },

    /// Any call after `destroy`.
    #[error("editor has been destroyed")]
    Destroyed,
}

// =============================================================================
// ActivationError
// =============================================================================

/// A single plugin activation failure.
#[derive(Debug, Error)]
#[error("plugin `{plugin}` failed: {source}")]
pub struct ActivationError {
    /// Name of the failing plugin.
    pub plugin: CompactString,
    /// Registration index of the failing plugin.
    pub index: usize,
    /// Underlying cause.
    #[source]
    pub source: BoxError,
}

impl ActivationError {
    /// Create a new activation error.
    pub fn new(plugin: impl Into<CompactString>, index: usize, source: BoxError) -> Self {
        Self {
            plugin: plugin.into(),
            index,
            source,
        }
    }
}

/// Every activation failure of one `create()` call.
#[derive(Debug, Default, Error)]
pub struct ActivationErrors {
    /// Failures in registration order.
    pub errors: Vec<ActivationError>,
}

impl ActivationErrors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, error: ActivationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Names of the failing plugins, in registration order.
    pub fn plugins(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.plugin.as_str()).collect()
    }

    /// The first failure, if any.
    pub fn into_single(self) -> Option<ActivationError> {
        self.errors.into_iter().next()
    }
}

impl fmt::Display for ActivationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} plugin(s) failed to activate", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

// =============================================================================
// EditorError
// =============================================================================

/// Errors returned by `Editor::create`.
#[derive(Debug, Error)]
pub enum EditorError {
    /// `create` was called in the wrong state.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// One or more plugins or config callbacks failed.
    #[error(transparent)]
    Activation(#[from] ActivationErrors),

    /// Context access failed outside any plugin.
    #[error(transparent)]
    Ctx(#[from] CtxError),
}

/// Result type alias for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

impl EditorError {
    /// The aggregated activation failures, if this is one.
    pub fn activation(&self) -> Option<&ActivationErrors> {
        match self {
            Self::Activation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Whether this error reports API misuse.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CtxError::not_found("schema");
        assert_eq!(err.to_string(), "context slice `schema` not found");

        let err = LifecycleError::NotCreated {
            status: EditorStatus::Idle,
        };
        assert_eq!(err.to_string(), "editor is not created (status: idle)");
    }

    #[test]
    fn test_activation_errors_aggregate() {
        let mut errors = ActivationErrors::new();
        errors.push(ActivationError::new("a", 0, "boom".into()));
        errors.push(ActivationError::new("b", 2, "bang".into()));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.plugins(), vec!["a", "b"]);
        assert_eq!(
            errors.to_string(),
            "2 plugin(s) failed to activate\n  - plugin `a` failed: boom\n  - plugin `b` failed: bang"
        );

        let first = errors.into_single().unwrap();
        assert_eq!(first.plugin, "a");
        assert!(ActivationErrors::new().into_single().is_none());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CtxError>();
        assert_send_sync::<EditorError>();
    }
}
