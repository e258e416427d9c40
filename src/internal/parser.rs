//! Markdown and DOM parsing, markdown serialization.
//!
//! The default parser reads CommonMark events and keeps paragraphs, headings
//! and `strong`/`emphasis` spans, mapped onto whichever of these the schema
//! defines. Constructs the schema lacks are kept as literal text. Anything
//! richer is expected to be installed by setting `PARSER` / `SERIALIZER`
//! before these plugins run.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use pulldown_cmark::{Event, Tag, TagEnd};

use crate::ctx::Ctx;
use crate::error::BoxError;
use crate::plugin::{Activation, MilkdownPlugin};
use crate::prose::{DomNode, Mark, Node, Schema};

use super::{DOM_PARSER, PARSER, PARSER_READY, SCHEMA, SCHEMA_READY, SERIALIZER, SERIALIZER_READY, settle};

/// Markdown to document.
pub type Parser = Arc<dyn Fn(&str) -> Result<Node, BoxError> + Send + Sync>;
/// DOM to document.
pub type DomParser = Arc<dyn Fn(&DomNode) -> Result<Node, BoxError> + Send + Sync>;
/// Document to markdown.
pub type Serializer = Arc<dyn Fn(&Node) -> String + Send + Sync>;

const STRONG: &str = "strong";
const EMPHASIS: &str = "emphasis";
const HEADING: &str = "heading";
const PARAGRAPH: &str = "paragraph";

// =============================================================================
// Plugins
// =============================================================================

/// Installs [`PARSER`] and [`DOM_PARSER`] unless already set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserPlugin;

impl MilkdownPlugin for ParserPlugin {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("parser")
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        Box::pin(activate_parser(ctx.clone()))
    }
}

async fn activate_parser(ctx: Ctx) -> Result<(), BoxError> {
    ctx.wait(&SCHEMA_READY).await;
    let result = install_parser(&ctx);
    settle(&ctx, &PARSER_READY, result)
}

fn install_parser(ctx: &Ctx) -> Result<(), BoxError> {
    let schema = ctx.get(&SCHEMA)?;
    if !ctx.inject(&PARSER, default_parser(Arc::clone(&schema)))? {
        tracing::debug!("custom markdown parser kept");
    }
    ctx.inject(&DOM_PARSER, default_dom_parser(schema))?;
    Ok(())
}

/// Installs [`SERIALIZER`] unless already set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializerPlugin;

impl MilkdownPlugin for SerializerPlugin {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("serializer")
    }

    fn setup(&self, ctx: &Ctx) -> Activation {
        Box::pin(activate_serializer(ctx.clone()))
    }
}

async fn activate_serializer(ctx: Ctx) -> Result<(), BoxError> {
    ctx.wait(&SCHEMA_READY).await;
    let result = ctx.inject(&SERIALIZER, default_serializer()).map(drop).map_err(Into::into);
    settle(&ctx, &SERIALIZER_READY, result)
}

// =============================================================================
// Markdown
// =============================================================================

/// The built-in markdown parser for `schema`.
pub fn default_parser(schema: Arc<Schema>) -> Parser {
    Arc::new(move |markdown: &str| parse_markdown(&schema, markdown))
}

fn parse_markdown(schema: &Schema, markdown: &str) -> Result<Node, BoxError> {
    if schema.node_type(PARAGRAPH).is_none() {
        return Err("schema has no `paragraph` node type".into());
    }
    let mut builder = DocBuilder::new(schema, markdown);
    for (event, range) in pulldown_cmark::Parser::new(markdown).into_offset_iter() {
        builder.event(event, range);
    }
    Ok(builder.finish())
}

/// Folds CommonMark events into block nodes.
struct DocBuilder<'a> {
    schema: &'a Schema,
    source: &'a str,
    blocks: Vec<Node>,
    block: Option<Node>,
    marks: Vec<Mark>,
}

impl<'a> DocBuilder<'a> {
    fn new(schema: &'a Schema, source: &'a str) -> Self {
        Self {
            schema,
            source,
            blocks: Vec::new(),
            block: None,
            marks: Vec::new(),
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(Tag::Paragraph) => self.open(Node::new(PARAGRAPH)),
            Event::Start(Tag::Heading { level, .. }) => {
                let level = level as usize;
                if self.schema.node_type(HEADING).is_some() {
                    self.open(Node::new(HEADING).attr("level", level));
                } else {
                    self.open(Node::new(PARAGRAPH));
                    self.text(&format!("{} ", "#".repeat(level)));
                }
            }
            Event::Start(Tag::Strong) => self.start_mark(STRONG, 2, range),
            Event::Start(Tag::Emphasis) => self.start_mark(EMPHASIS, 1, range),
            Event::End(TagEnd::Strong) => self.end_mark(STRONG, 2, range),
            Event::End(TagEnd::Emphasis) => self.end_mark(EMPHASIS, 1, range),
            Event::Text(text) | Event::Code(text) => self.text(&text),
            Event::SoftBreak | Event::HardBreak => self.text("\n"),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock | TagEnd::BlockQuote(_),
            ) => self.close(),
            _ => {}
        }
    }

    fn open(&mut self, node: Node) {
        self.close();
        self.block = Some(node);
    }

    fn close(&mut self) {
        self.blocks.extend(self.block.take());
    }

    fn start_mark(&mut self, name: &str, width: usize, range: Range<usize>) {
        if self.schema.mark_type(name).is_some() {
            self.marks.push(Mark::new(name));
        } else {
            self.literal(range.start..range.start + width);
        }
    }

    fn end_mark(&mut self, name: &str, width: usize, range: Range<usize>) {
        match self.marks.iter().rposition(|mark| mark.type_name == name) {
            Some(index) => {
                self.marks.remove(index);
            }
            None => self.literal(range.end.saturating_sub(width)..range.end),
        }
    }

    fn literal(&mut self, range: Range<usize>) {
        let source = self.source;
        if let Some(delimiter) = source.get(range) {
            self.text(delimiter);
        }
    }

    /// Append text, merging into the previous text node when marks match.
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let block = self.block.get_or_insert_with(|| Node::new(PARAGRAPH));
        if let Some(last) = block.content.last_mut().filter(|last| last.marks == self.marks) {
            if let Some(existing) = &mut last.text {
                existing.push_str(text);
                return;
            }
        }
        block.content.push(Node {
            marks: self.marks.clone(),
            ..Node::text(text)
        });
    }

    fn finish(mut self) -> Node {
        self.close();
        Node::empty_doc().children(self.blocks)
    }
}

/// The built-in markdown serializer.
pub fn default_serializer() -> Serializer {
    Arc::new(serialize_markdown)
}

fn serialize_markdown(doc: &Node) -> String {
    let blocks: Vec<String> = doc.content.iter().map(serialize_block).collect();
    blocks.join("\n\n")
}

fn serialize_block(node: &Node) -> String {
    let mut out = String::new();
    if node.type_name == HEADING {
        let level = node.attrs.get("level").and_then(|v| v.as_u64()).unwrap_or(1).clamp(1, 6);
        for _ in 0..level {
            out.push('#');
        }
        out.push(' ');
    }
    serialize_inline(node, &mut out);
    out
}

fn serialize_inline(node: &Node, out: &mut String) {
    if let Some(text) = &node.text {
        let strong = node.marks.iter().any(|m| m.type_name == STRONG);
        let emphasis = node.marks.iter().any(|m| m.type_name == EMPHASIS);
        let wrap = match (strong, emphasis) {
            (true, true) => "***",
            (true, false) => "**",
            (false, true) => "*",
            (false, false) => "",
        };
        out.push_str(wrap);
        out.push_str(text);
        out.push_str(wrap);
    }
    for child in &node.content {
        serialize_inline(child, out);
    }
}

// =============================================================================
// DOM
// =============================================================================

/// The built-in DOM parser for `schema`.
pub fn default_dom_parser(schema: Arc<Schema>) -> DomParser {
    Arc::new(move |dom: &DomNode| Ok(Node::empty_doc().children(parse_dom_blocks(&schema, dom))))
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', n @ b'1'..=b'6'] => Some(n - b'0'),
        _ => None,
    }
}

fn parse_dom_blocks(schema: &Schema, dom: &DomNode) -> Vec<Node> {
    let tag = match dom {
        DomNode::Text(text) if text.trim().is_empty() => return Vec::new(),
        DomNode::Text(text) => return vec![Node::new(PARAGRAPH).child(Node::text(text.trim()))],
        DomNode::Element { tag, .. } => tag.as_str(),
    };

    let inline = |node: Node| node.children(parse_dom_inline(schema, dom, &[]));
    if tag == "p" {
        return vec![inline(Node::new(PARAGRAPH))];
    }
    if let Some(level) = heading_level(tag) {
        let block = if schema.node_type(HEADING).is_some() {
            Node::new(HEADING).attr("level", level)
        } else {
            Node::new(PARAGRAPH)
        };
        return vec![inline(block)];
    }
    dom.children().iter().flat_map(|child| parse_dom_blocks(schema, child)).collect()
}

fn parse_dom_inline(schema: &Schema, dom: &DomNode, marks: &[Mark]) -> Vec<Node> {
    dom.children()
        .iter()
        .flat_map(|child| match child {
            DomNode::Text(text) if text.is_empty() => Vec::new(),
            DomNode::Text(text) => vec![marks.iter().cloned().fold(Node::text(text.as_str()), Node::mark)],
            DomNode::Element { tag, .. } => {
                let mark = match tag.as_str() {
                    "strong" | "b" => Some(STRONG),
                    "em" | "i" => Some(EMPHASIS),
                    _ => None,
                };
                match mark.filter(|name| schema.mark_type(name).is_some()) {
                    Some(name) => {
                        let mut nested = marks.to_vec();
                        nested.push(Mark::new(name));
                        parse_dom_inline(schema, child, &nested)
                    }
                    None => parse_dom_inline(schema, child, marks),
                }
            }
        })
        .collect()
}
