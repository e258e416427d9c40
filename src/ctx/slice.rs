//! Typed context keys.

use std::any::{TypeId, type_name};
use std::borrow::Cow;
use std::fmt;

/// A typed, named slot in the context store.
///
/// The name is the identity: two `SliceType`s with the same name address the
/// same slot. The value type is fixed by the first write or default
/// materialization; using the name with another `T` fails with
/// [`CtxError::TypeMismatch`](crate::CtxError::TypeMismatch).
///
/// ```
/// use milkdown::SliceType;
///
/// const COUNT: SliceType<u32> = SliceType::with_default("count", || 0);
/// const TITLE: SliceType<String> = SliceType::new("title");
///
/// assert_eq!(COUNT.name(), "count");
/// assert!(COUNT.has_default());
/// assert!(!TITLE.has_default());
/// ```
pub struct SliceType<T> {
    name: Cow<'static, str>,
    default: Option<fn() -> T>,
}

impl<T> SliceType<T> {
    /// Declare a slice without a default value.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            default: None,
        }
    }

    /// Declare a slice whose value is created by `default` on first access.
    pub const fn with_default(name: &'static str, default: fn() -> T) -> Self {
        Self {
            name: Cow::Borrowed(name),
            default: Some(default),
        }
    }

    /// Declare a slice with a runtime name.
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            default: None,
        }
    }

    /// Attach a default value constructor.
    pub fn or_default_with(mut self, default: fn() -> T) -> Self {
        self.default = Some(default);
        self
    }

    /// The slice name; identity within a context.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether reads of an unset slice materialize a default.
    #[inline]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[inline]
    pub(crate) fn make_default(&self) -> Option<T> {
        self.default.map(|f| f())
    }
}

impl<T: 'static> SliceType<T> {
    #[inline]
    pub(crate) fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    #[inline]
    pub(crate) fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

impl<T> Clone for SliceType<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            default: self.default,
        }
    }
}

impl<T> fmt::Debug for SliceType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceType")
            .field("name", &self.name)
            .field("type", &type_name::<T>())
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

impl<T> fmt::Display for SliceType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBERS: SliceType<Vec<u8>> = SliceType::with_default("numbers", Vec::new);

    #[test]
    fn test_const_declaration() {
        assert_eq!(NUMBERS.name(), "numbers");
        assert_eq!(NUMBERS.make_default(), Some(Vec::new()));
        assert_eq!(NUMBERS.to_string(), "numbers");
    }

    #[test]
    fn test_dynamic_slice() {
        let slice: SliceType<u8> = SliceType::dynamic(format!("slot-{}", 3));
        assert_eq!(slice.name(), "slot-3");
        assert!(!slice.has_default());

        let slice = slice.or_default_with(|| 7);
        assert_eq!(slice.make_default(), Some(7));
    }

    #[test]
    fn test_type_identity() {
        let a: SliceType<u8> = SliceType::new("x");
        let b: SliceType<u16> = SliceType::new("x");
        assert_eq!(a.name(), b.name());
        assert_ne!(a.type_id(), b.type_id());
    }
}
