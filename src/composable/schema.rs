use crate::ctx::Ctx;
use crate::internal::{INIT_READY, MARKS, NODES, SCHEMA_TIMER};
use crate::prose::{MarkSpec, NodeSpec};

use super::Composable;

/// A node type, merged into the schema.
pub fn node(f: impl Fn(&Ctx) -> NodeSpec + Send + Sync + 'static) -> Composable<NodeSpec> {
    Composable::new(
        "$node",
        INIT_READY,
        move |ctx| Ok(f(ctx)),
        |ctx, spec: &NodeSpec| ctx.update_mut(&NODES, |nodes| nodes.push(spec.clone())),
    )
    .gate(SCHEMA_TIMER)
}

/// A mark type, merged into the schema.
pub fn mark(f: impl Fn(&Ctx) -> MarkSpec + Send + Sync + 'static) -> Composable<MarkSpec> {
    Composable::new(
        "$mark",
        INIT_READY,
        move |ctx| Ok(f(ctx)),
        |ctx, spec: &MarkSpec| ctx.update_mut(&MARKS, |marks| marks.push(spec.clone())),
    )
    .gate(SCHEMA_TIMER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use crate::internal::{DEFAULT_VALUE, DefaultValue, EDITOR_STATE, SCHEMA, defaults};

    #[tokio::test]
    async fn test_node_and_mark_reach_schema_and_parser() {
        let heading = node(|_| NodeSpec::block("heading"));
        let strong = mark(|_| MarkSpec::new("strong"));

        let editor = Editor::make();
        editor
            .use_plugin(strong.clone())
            .unwrap()
            .use_plugins(defaults())
            .unwrap()
            .use_plugin(heading.clone())
            .unwrap()
            .config(|ctx| ctx.set(&DEFAULT_VALUE, DefaultValue::from("# Hi **there**")))
            .unwrap();
        editor.create().await.unwrap();

        let schema = editor.action(|ctx| ctx.get(&SCHEMA)).unwrap().unwrap();
        assert!(schema.node_type("heading").is_some());
        assert!(schema.mark_type("strong").is_some());
        assert_eq!(heading.output().map(|s| s.name), Some("heading".into()));

        let doc = editor.action(|ctx| ctx.get(&EDITOR_STATE)).unwrap().unwrap().doc().clone();
        assert_eq!(doc.content[0].type_name, "heading");
        assert_eq!(doc.content[0].content[1].marks[0].type_name, "strong");
    }
}
