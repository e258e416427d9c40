//! Key bindings.
//!
//! Key names are normalized the way the editing engine does it: modifiers
//! first in a fixed order (`Alt-Ctrl-Meta-Shift`), `Mod` meaning `Ctrl`.

use std::fmt;

use compact_str::{CompactString, format_compact};
use rustc_hash::FxHashMap;

use super::plugin::ProsePlugin;
use super::state::Command;

/// Normalize a key combination such as `"shift-Mod-b"` to `"Ctrl-Shift-b"`.
pub fn normalize_key_name(name: &str) -> CompactString {
    let mut parts: Vec<&str> = name.split('-').collect();
    // "Mod--" binds the minus key.
    let mut key = parts.pop().unwrap_or_default();
    if key.is_empty() && name.ends_with('-') {
        parts.pop();
        key = "-";
    }

    let (mut alt, mut ctrl, mut meta, mut shift) = (false, false, false, false);
    for modifier in parts {
        match modifier.to_ascii_lowercase().as_str() {
            "alt" | "a" => alt = true,
            "ctrl" | "control" | "c" | "mod" => ctrl = true,
            "meta" | "cmd" | "m" => meta = true,
            "shift" | "s" => shift = true,
            _ => tracing::debug!(modifier, key = name, "unrecognized modifier"),
        }
    }

    let mut out = CompactString::default();
    for (on, label) in [(alt, "Alt-"), (ctrl, "Ctrl-"), (meta, "Meta-"), (shift, "Shift-")] {
        if on {
            out.push_str(label);
        }
    }
    out.push_str(key);
    out
}

/// Mapping from normalized key combination to command.
#[derive(Clone, Default)]
pub struct Keymap {
    bindings: FxHashMap<CompactString, Command>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, replacing an existing one for the same key.
    pub fn bind(mut self, key: &str, command: Command) -> Self {
        self.insert(key, command);
        self
    }

    pub fn insert(&mut self, key: &str, command: Command) -> Option<Command> {
        self.bindings.insert(normalize_key_name(key), command)
    }

    pub fn get(&self, key: &str) -> Option<&Command> {
        self.bindings.get(&normalize_key_name(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Bound keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.bindings.keys().map(CompactString::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Fold `other` into `self`; bindings of `other` win on conflict.
    pub fn merge(&mut self, other: &Keymap) {
        for (key, command) in &other.bindings {
            self.bindings.insert(key.clone(), command.clone());
        }
    }
}

impl<'a> FromIterator<(&'a str, Command)> for Keymap {
    fn from_iter<I: IntoIterator<Item = (&'a str, Command)>>(iter: I) -> Self {
        let mut keymap = Keymap::new();
        for (key, command) in iter {
            keymap.insert(key, command);
        }
        keymap
    }
}

impl fmt::Debug for Keymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

/// Wrap a keymap as an engine plugin.
pub fn keymap(bindings: Keymap) -> ProsePlugin {
    static NEXT: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let n = NEXT.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    ProsePlugin::new(format_compact!("keymap${n}")).with_keymap(bindings)
}

/// Effective keymap of a plugin list. Plugins later in the list win.
pub fn combined_keymap(plugins: &[ProsePlugin]) -> Keymap {
    let mut combined = Keymap::new();
    for bindings in plugins.iter().filter_map(ProsePlugin::keymap) {
        combined.merge(bindings);
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prose::state::command;

    fn noop() -> Command {
        command(|_| None)
    }

    #[test]
    fn test_normalize_key_name() {
        assert_eq!(normalize_key_name("Mod-b"), "Ctrl-b");
        assert_eq!(normalize_key_name("shift-Mod-b"), "Ctrl-Shift-b");
        assert_eq!(normalize_key_name("Alt-Meta-Enter"), "Alt-Meta-Enter");
        assert_eq!(normalize_key_name("Mod--"), "Ctrl--");
        assert_eq!(normalize_key_name("Enter"), "Enter");
    }

    #[test]
    fn test_bindings_are_normalized() {
        let keymap = Keymap::new().bind("Mod-b", noop());
        assert!(keymap.contains("Ctrl-b"));
        assert_eq!(keymap.keys(), vec!["Ctrl-b"]);
    }

    #[test]
    fn test_combined_keymap_last_wins() {
        let first = command(|state| Some(state.tr().set_meta("by", "first")));
        let second = command(|state| Some(state.tr().set_meta("by", "second")));

        let plugins = [
            keymap(Keymap::new().bind("a", noop()).bind("Mod-s", first)),
            keymap(Keymap::new().bind("b", noop()).bind("Mod-s", second.clone())),
        ];
        let combined = combined_keymap(&plugins);
        assert_eq!(combined.keys(), vec!["Ctrl-s", "a", "b"]);
        assert!(std::sync::Arc::ptr_eq(combined.get("Mod-s").unwrap(), &second));
    }

    #[test]
    fn test_keymap_plugins_have_distinct_keys() {
        let a = keymap(Keymap::new());
        let b = keymap(Keymap::new());
        assert_ne!(a.key(), b.key());
        assert!(a.key().starts_with("keymap$"));
    }
}
