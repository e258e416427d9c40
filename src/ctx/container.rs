//! Slot storage behind [`Ctx`](super::Ctx).

use std::any::{Any, TypeId};

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use super::slice::SliceType;
use crate::error::{CtxError, CtxResult};

type AnyValue = Box<dyn Any + Send + Sync>;

/// One named slot. The type binding outlives `remove`.
struct Slot {
    type_id: TypeId,
    type_name: &'static str,
    value: Option<AnyValue>,
}

/// Map from slice name to type-checked value.
#[derive(Default)]
pub(crate) struct Container {
    slots: FxHashMap<CompactString, Slot>,
    destroyed: bool,
}

impl Container {
    fn live(&self) -> CtxResult<()> {
        if self.destroyed {
            Err(CtxError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn checked<T: 'static>(slot: &Slot, slice: &SliceType<T>) -> CtxResult<()> {
        if slot.type_id == slice.type_id() {
            Ok(())
        } else {
            Err(CtxError::TypeMismatch {
                slice: slice.name().into(),
                expected: slice.type_name(),
                found: slot.type_name,
            })
        }
    }

    fn mismatch<T: 'static>(slice: &SliceType<T>) -> CtxError {
        CtxError::TypeMismatch {
            slice: slice.name().into(),
            expected: slice.type_name(),
            found: "<unknown>",
        }
    }

    /// Borrow the stored value without materializing a default.
    pub fn peek<T: Send + Sync + 'static>(&self, slice: &SliceType<T>) -> CtxResult<Option<&T>> {
        self.live()?;
        let Some(slot) = self.slots.get(slice.name()) else {
            return Ok(None);
        };
        Self::checked(slot, slice)?;
        Ok(slot.value.as_ref().and_then(|v| v.downcast_ref::<T>()))
    }

    /// Borrow the stored value mutably, materializing the default if needed.
    pub fn entry<T: Send + Sync + 'static>(&mut self, slice: &SliceType<T>) -> CtxResult<&mut T> {
        self.live()?;
        if let Some(slot) = self.slots.get(slice.name()) {
            Self::checked(slot, slice)?;
        }

        let needs_default = self
            .slots
            .get(slice.name())
            .is_none_or(|slot| slot.value.is_none());
        if needs_default {
            let value = slice
                .make_default()
                .ok_or_else(|| CtxError::not_found(slice.name()))?;
            self.insert(slice, value);
        }

        self.slots
            .get_mut(slice.name())
            .and_then(|slot| slot.value.as_mut())
            .and_then(|v| v.downcast_mut::<T>())
            .ok_or_else(|| Self::mismatch(slice))
    }

    /// Replace the value with `f(current)`, materializing the default if needed.
    ///
    /// The slot is empty while `f` runs; if `f` panics it stays empty.
    pub fn update<T: Send + Sync + 'static>(&mut self, slice: &SliceType<T>, f: impl FnOnce(T) -> T) -> CtxResult<()> {
        self.entry(slice)?;
        let current = self
            .slots
            .get_mut(slice.name())
            .and_then(|slot| slot.value.take())
            .and_then(|v| v.downcast::<T>().ok())
            .ok_or_else(|| Self::mismatch(slice))?;
        self.insert(slice, f(*current));
        Ok(())
    }

    fn insert<T: Send + Sync + 'static>(&mut self, slice: &SliceType<T>, value: T) {
        self.slots.insert(
            slice.name().into(),
            Slot {
                type_id: slice.type_id(),
                type_name: slice.type_name(),
                value: Some(Box::new(value)),
            },
        );
    }

    pub fn set<T: Send + Sync + 'static>(&mut self, slice: &SliceType<T>, value: T) -> CtxResult<()> {
        self.live()?;
        if let Some(slot) = self.slots.get(slice.name()) {
            Self::checked(slot, slice)?;
        }
        self.insert(slice, value);
        Ok(())
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self, slice: &SliceType<T>) -> CtxResult<Option<T>> {
        self.live()?;
        let Some(slot) = self.slots.get_mut(slice.name()) else {
            return Ok(None);
        };
        Self::checked(slot, slice)?;
        Ok(slot
            .value
            .take()
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .is_some_and(|slot| slot.value.is_some())
    }

    /// Names of populated slots, sorted.
    pub fn names(&self) -> Vec<CompactString> {
        let mut names: Vec<_> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Drop every value and refuse further access.
    pub fn destroy(&mut self) {
        self.slots.clear();
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: SliceType<String> = SliceType::new("name");
    const COUNT: SliceType<u32> = SliceType::with_default("count", || 1);

    #[test]
    fn test_set_and_peek() {
        let mut c = Container::default();
        assert_eq!(c.peek(&NAME).unwrap(), None);

        c.set(&NAME, "milk".to_string()).unwrap();
        assert_eq!(c.peek(&NAME).unwrap().map(String::as_str), Some("milk"));
        assert!(c.contains("name"));
    }

    #[test]
    fn test_entry_materializes_default() {
        let mut c = Container::default();
        *c.entry(&COUNT).unwrap() += 1;
        assert_eq!(c.peek(&COUNT).unwrap(), Some(&2));

        let err = c.entry(&NAME).unwrap_err();
        assert_eq!(err, CtxError::not_found("name"));
    }

    #[test]
    fn test_type_binding_survives_remove() {
        let mut c = Container::default();
        c.set(&NAME, "x".to_string()).unwrap();
        assert_eq!(c.remove(&NAME).unwrap().as_deref(), Some("x"));
        assert!(!c.contains("name"));

        let other: SliceType<u8> = SliceType::new("name");
        assert!(matches!(c.set(&other, 1), Err(CtxError::TypeMismatch { .. })));
    }

    #[test]
    fn test_destroy() {
        let mut c = Container::default();
        c.set(&NAME, "x".to_string()).unwrap();
        c.destroy();
        assert!(c.is_destroyed());
        assert_eq!(c.peek(&NAME).unwrap_err(), CtxError::Destroyed);
        assert!(c.names().is_empty());
    }
}
