//! Content node tree produced by the renderer.

use crate::fence::FencedBlock;

/// Root of a rendered document body. Blocks are in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentTree {
    pub blocks: Vec<Block>,
}

/// Block-level content node.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        /// Heading level (1-6)
        level: u8,
        /// Anchor id, unique within the document
        id: String,
        content: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    List(List),
    Table(Table),
    Fence(FencedBlock),
    /// Indented code block
    Preformatted(String),
    BlockQuote(Vec<Block>),
    Html(String),
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub ordered: bool,
    /// First number of an ordered list
    pub start: Option<u64>,
    /// Tight lists render item text without paragraph wrappers
    pub tight: bool,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListItem {
    /// Task list state, if this is a task item
    pub checked: Option<bool>,
    pub content: Vec<Block>,
}

/// Column alignment from the delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

/// A table cell holds inline content only.
pub type Cell = Vec<Inline>;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

/// Inline content node.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link {
        href: String,
        title: String,
        content: Vec<Inline>,
    },
    Image {
        src: String,
        title: String,
        alt: String,
    },
    Html(String),
    SoftBreak,
    HardBreak,
}

impl Inline {
    /// Plain text of this node and its children.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Link {
                content: children, ..
            } => children.iter().for_each(|c| c.push_text(out)),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            Inline::Html(_) => {}
        }
    }
}

/// Concatenated plain text of a run of inline nodes.
pub fn plain_text(inlines: &[Inline]) -> String {
    inlines.iter().map(Inline::plain_text).collect()
}

/// A table of contents entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

impl ContentTree {
    /// Visit every fenced block in document order, including nested ones.
    pub fn for_each_fence(&self, mut f: impl FnMut(&FencedBlock)) {
        fn walk(blocks: &[Block], f: &mut dyn FnMut(&FencedBlock)) {
            for block in blocks {
                match block {
                    Block::Fence(fence) => f(fence),
                    Block::BlockQuote(children) => walk(children, f),
                    Block::List(list) => list.items.iter().for_each(|i| walk(&i.content, f)),
                    _ => {}
                }
            }
        }
        walk(&self.blocks, &mut f);
    }

    /// Mutable variant of [`ContentTree::for_each_fence`].
    pub fn for_each_fence_mut(&mut self, mut f: impl FnMut(&mut FencedBlock)) {
        fn walk(blocks: &mut [Block], f: &mut dyn FnMut(&mut FencedBlock)) {
            for block in blocks {
                match block {
                    Block::Fence(fence) => f(fence),
                    Block::BlockQuote(children) => walk(children, f),
                    Block::List(list) => list
                        .items
                        .iter_mut()
                        .for_each(|i| walk(&mut i.content, f)),
                    _ => {}
                }
            }
        }
        walk(&mut self.blocks, &mut f);
    }

    /// Image sources referenced anywhere in the tree, in document order.
    pub fn images(&self) -> Vec<&str> {
        fn inlines<'a>(nodes: &'a [Inline], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    Inline::Image { src, .. } => out.push(src),
                    Inline::Emphasis(c)
                    | Inline::Strong(c)
                    | Inline::Strikethrough(c)
                    | Inline::Link { content: c, .. } => inlines(c, out),
                    _ => {}
                }
            }
        }
        fn blocks<'a>(nodes: &'a [Block], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    Block::Heading { content, .. } | Block::Paragraph(content) => {
                        inlines(content, out)
                    }
                    Block::List(list) => list.items.iter().for_each(|i| blocks(&i.content, out)),
                    Block::Table(table) => table
                        .header
                        .iter()
                        .chain(table.rows.iter().flatten())
                        .for_each(|cell| inlines(cell, out)),
                    Block::BlockQuote(children) => blocks(children, out),
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        blocks(&self.blocks, &mut out);
        out
    }
}
