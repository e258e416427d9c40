use std::borrow::Cow;
use std::fmt;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::ctx::Ctx;
use crate::error::BoxError;
use crate::plugin::{Activation, MilkdownPlugin};
use crate::prose::{Command, EditorView};

use super::{COMMANDS, COMMANDS_READY, SCHEMA_READY, settle};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command `{0}` is not registered")]
    Unknown(CompactString),
}

/// Named commands, addressable by key.
#[derive(Clone, Default)]
pub struct CommandManager {
    commands: FxHashMap<CompactString, Command>,
}

impl CommandManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command` under `key`. A later registration replaces the earlier one.
    pub fn register(&mut self, key: impl Into<CompactString>, command: Command) -> Option<Command> {
        let key = key.into();
        let previous = self.commands.insert(key.clone(), command);
        if previous.is_some() {
            tracing::debug!(command = %key, "command replaced");
        }
        previous
    }

    /// The command registered under `key`.
    pub fn get(&self, key: &str) -> Option<&Command> {
        self.commands.get(key)
    }

    /// Run a command against the view's state and dispatch its transaction.
    ///
    /// `Ok(false)` means the command was not applicable.
    pub fn call(&self, key: &str, view: &EditorView) -> Result<bool, CommandError> {
        let command = self.get(key).ok_or_else(|| CommandError::Unknown(key.into()))?;
        match command(&view.state()) {
            Some(tr) => Ok(view.dispatch(tr)),
            None => Ok(false),
        }
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.commands.keys().map(CompactString::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandManager").field("commands", &self.keys()).finish()
    }
}

/// Opens [`COMMANDS`] for registration once the schema exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandsPlugin;

impl MilkdownPlugin for CommandsPlugin {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("commands")
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        Box::pin(activate(ctx.clone()))
    }
}

async fn activate(ctx: Ctx) -> Result<(), BoxError> {
    ctx.wait(&SCHEMA_READY).await;
    let result = ctx.inject(&COMMANDS, CommandManager::new()).map(drop).map_err(Into::into);
    settle(&ctx, &COMMANDS_READY, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prose::{EditorState, Node, NodeSpec, Schema, command};
    use std::sync::Arc;

    #[test]
    fn test_call_dispatches() {
        let schema = Schema::new([NodeSpec::block("doc"), NodeSpec::inline("text")], []).unwrap();
        let view = EditorView::new(None, EditorState::create(Arc::new(schema), Node::empty_doc(), []), []);

        let mut manager = CommandManager::new();
        manager.register("fill", command(|s| Some(s.tr().replace_doc(Node::empty_doc().child(Node::text("x"))))));
        manager.register("never", command(|_| None));

        assert_eq!(manager.call("fill", &view), Ok(true));
        assert_eq!(view.state().doc().text_content(), "x");
        assert_eq!(manager.call("never", &view), Ok(false));
        assert_eq!(manager.call("missing", &view), Err(CommandError::Unknown("missing".into())));
        assert_eq!(manager.keys(), vec!["fill", "never"]);
    }
}
