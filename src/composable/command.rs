use compact_str::CompactString;

use crate::ctx::Ctx;
use crate::internal::{COMMANDS, COMMANDS_READY, EDITOR_STATE_TIMER};
use crate::prose::Command;

use super::Composable;

/// A named command, registered in `COMMANDS` under `key`.
pub fn command(
    key: impl Into<CompactString>,
    f: impl Fn(&Ctx) -> Command + Send + Sync + 'static,
) -> Composable<Command> {
    let key = key.into();
    Composable::new(
        "$command",
        COMMANDS_READY,
        move |ctx| Ok(f(ctx)),
        move |ctx, command: &Command| {
            ctx.update_mut(&COMMANDS, |commands| {
                commands.register(key.clone(), command.clone());
            })
        },
    )
    .gate(EDITOR_STATE_TIMER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use crate::internal::{EDITOR_VIEW, defaults};
    use crate::prose::{Node, command as prose_command};

    #[tokio::test]
    async fn test_command_is_callable() {
        let clear = command("Clear", |_| prose_command(|state| Some(state.tr().replace_doc(Node::empty_doc()))));

        let editor = Editor::make();
        editor.use_plugins(defaults()).unwrap().use_plugin(clear.clone()).unwrap();
        editor.create().await.unwrap();

        assert!(clear.output().is_some());
        let called = editor
            .action(|ctx| {
                let view = ctx.get(&EDITOR_VIEW)?;
                let commands = ctx.get(&COMMANDS)?;
                Ok::<_, Box<dyn std::error::Error>>(commands.call("Clear", &view)?)
            })
            .unwrap()
            .unwrap();
        assert!(called);
    }
}
