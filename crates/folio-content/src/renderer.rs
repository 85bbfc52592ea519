//! Markdown renderer: body text to content tree.

use std::collections::HashSet;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use crate::fence::FencedBlock;
use crate::node::{
    plain_text, Alignment, Block, Cell, ContentTree, Inline, List, ListItem, Table, TocEntry,
};
use crate::slug::slugify;

/// Errors for markdown that is structurally broken.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("line {line}: fenced block opened with {marker} is never closed")]
    UnterminatedFence { line: usize, marker: String },

    #[error("line {line}: table row has {found} cells but the header has {expected}")]
    TableColumnMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// A rendered document body.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub tree: ContentTree,

    /// Table of contents entries
    pub toc: Vec<TocEntry>,
}

/// Render body text into a content tree.
pub fn render(body: &str) -> Result<Rendered, RenderError> {
    render_with_offset(body, 0)
}

/// Render body text whose first line sits `line_offset` lines into its file.
///
/// Line numbers in errors and fenced blocks are reported relative to the file.
pub fn render_with_offset(body: &str, line_offset: usize) -> Result<Rendered, RenderError> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES;

    let mut builder = TreeBuilder::new(body, line_offset);

    for (event, range) in Parser::new_ext(body, options).into_offset_iter() {
        builder.event(event, range)?;
    }

    builder.finish()
}

/// Maps byte offsets to 1-indexed line numbers.
struct LineIndex {
    starts: Vec<usize>,
    offset: usize,
}

impl LineIndex {
    fn new(source: &str, offset: usize) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts, offset }
    }

    fn line(&self, byte: usize) -> usize {
        self.starts.partition_point(|&start| start <= byte) + self.offset
    }
}

/// An open container while walking the event stream.
enum Frame {
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        id: Option<String>,
        content: Vec<Inline>,
    },
    BlockQuote(Vec<Block>),
    List {
        list: List,
        loose: bool,
    },
    Item {
        item: ListItem,
        /// Inline content of a tight item, not yet wrapped in a paragraph
        pending: Vec<Inline>,
        loose: bool,
    },
    Table(Table),
    Row {
        cells: Vec<Cell>,
        head: bool,
    },
    Cell(Vec<Inline>),
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
    Fence {
        block: FencedBlock,
        /// Raw source of the whole block, markers included
        range: Range<usize>,
    },
    Preformatted(String),
    Html(String),
    /// Constructs this renderer does not model
    Ignored,
}

struct TreeBuilder<'a> {
    source: &'a str,
    lines: LineIndex,
    stack: Vec<Frame>,
    root: Vec<Block>,
    toc: Vec<TocEntry>,
    ids: HashSet<String>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str, line_offset: usize) -> Self {
        Self {
            source,
            lines: LineIndex::new(source, line_offset),
            stack: Vec::new(),
            root: Vec::new(),
            toc: Vec::new(),
            ids: HashSet::new(),
        }
    }

    fn finish(mut self) -> Result<Rendered, RenderError> {
        // The parser balances every start with an end; this only drains on malformed input.
        while !self.stack.is_empty() {
            self.end()?;
        }

        Ok(Rendered {
            tree: ContentTree { blocks: self.root },
            toc: self.toc,
        })
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) -> Result<(), RenderError> {
        match event {
            Event::Start(tag) => self.start(tag, range)?,
            Event::End(_) => self.end()?,
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::InlineHtml(html) => self.push_inline(Inline::Html(html.into_string())),
            Event::Html(html) => match self.stack.last_mut() {
                Some(Frame::Html(buf)) => buf.push_str(&html),
                _ => self.push_block(Block::Html(html.into_string())),
            },
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(checked) => self.mark_task(checked),
            _ => {}
        }
        Ok(())
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) -> Result<(), RenderError> {
        let frame = match tag {
            Tag::Paragraph => {
                if let Some(Frame::Item { loose, .. }) = self.stack.last_mut() {
                    *loose = true;
                }
                Frame::Paragraph(Vec::new())
            }
            Tag::Heading { level, id, .. } => Frame::Heading {
                level: level as u8,
                id: id.map(|id| id.into_string()),
                content: Vec::new(),
            },
            Tag::BlockQuote(..) => Frame::BlockQuote(Vec::new()),
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                let line = self.lines.line(range.start);
                Frame::Fence {
                    block: FencedBlock::new(&info, String::new(), line),
                    range,
                }
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => Frame::Preformatted(String::new()),
            Tag::HtmlBlock => Frame::Html(String::new()),
            Tag::List(start) => Frame::List {
                list: List {
                    ordered: start.is_some(),
                    start,
                    tight: true,
                    items: Vec::new(),
                },
                loose: false,
            },
            Tag::Item => Frame::Item {
                item: ListItem::default(),
                pending: Vec::new(),
                loose: false,
            },
            Tag::Table(alignments) => Frame::Table(Table {
                alignments: alignments.iter().map(convert_alignment).collect(),
                header: Vec::new(),
                rows: Vec::new(),
            }),
            Tag::TableHead => Frame::Row {
                cells: Vec::new(),
                head: true,
            },
            Tag::TableRow => {
                self.check_row_width(&range)?;
                Frame::Row {
                    cells: Vec::new(),
                    head: false,
                }
            }
            Tag::TableCell => Frame::Cell(Vec::new()),
            Tag::Emphasis => Frame::Emphasis(Vec::new()),
            Tag::Strong => Frame::Strong(Vec::new()),
            Tag::Strikethrough => Frame::Strikethrough(Vec::new()),
            Tag::Link {
                dest_url, title, ..
            } => Frame::Link {
                href: dest_url.into_string(),
                title: title.into_string(),
                content: Vec::new(),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                src: dest_url.into_string(),
                title: title.into_string(),
                alt: String::new(),
            },
            _ => Frame::Ignored,
        };

        self.stack.push(frame);
        Ok(())
    }

    fn end(&mut self) -> Result<(), RenderError> {
        let Some(frame) = self.stack.pop() else {
            return Ok(());
        };

        match frame {
            Frame::Paragraph(content) => self.push_block(Block::Paragraph(content)),
            Frame::Heading { level, id, content } => {
                let title = plain_text(&content);
                let id = self.unique_id(id.unwrap_or_else(|| slugify(&title)));
                self.toc.push(TocEntry {
                    title,
                    id: id.clone(),
                    level,
                });
                self.push_block(Block::Heading { level, id, content });
            }
            Frame::BlockQuote(children) => self.push_block(Block::BlockQuote(children)),
            Frame::List { mut list, loose } => {
                list.tight = !loose;
                self.push_block(Block::List(list));
            }
            Frame::Item {
                mut item,
                mut pending,
                loose,
            } => {
                flush_pending(&mut pending, &mut item.content);
                if let Some(Frame::List {
                    list,
                    loose: list_loose,
                }) = self.stack.last_mut()
                {
                    list.items.push(item);
                    *list_loose |= loose;
                }
            }
            Frame::Table(table) => self.push_block(Block::Table(table)),
            Frame::Row { cells, head } => {
                if let Some(Frame::Table(table)) = self.stack.last_mut() {
                    if head {
                        table.header = cells;
                    } else {
                        table.rows.push(cells);
                    }
                }
            }
            Frame::Cell(content) => {
                if let Some(Frame::Row { cells, .. }) = self.stack.last_mut() {
                    cells.push(content);
                }
            }
            Frame::Emphasis(content) => self.push_inline(Inline::Emphasis(content)),
            Frame::Strong(content) => self.push_inline(Inline::Strong(content)),
            Frame::Strikethrough(content) => self.push_inline(Inline::Strikethrough(content)),
            Frame::Link {
                href,
                title,
                content,
            } => self.push_inline(Inline::Link {
                href,
                title,
                content,
            }),
            Frame::Image { src, title, alt } => {
                self.push_inline(Inline::Image { src, title, alt })
            }
            Frame::Fence { block, range } => {
                self.check_fence_closed(&block, &range)?;
                self.push_block(Block::Fence(block));
            }
            Frame::Preformatted(text) => self.push_block(Block::Preformatted(text)),
            Frame::Html(html) => self.push_block(Block::Html(html)),
            Frame::Ignored => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::Fence { block, .. }) => block.payload.push_str(text),
            Some(Frame::Preformatted(buf)) | Some(Frame::Html(buf)) => buf.push_str(text),
            _ => self.push_inline(Inline::Text(text.to_string())),
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.stack.last_mut() {
            Some(Frame::Paragraph(content))
            | Some(Frame::Heading { content, .. })
            | Some(Frame::Cell(content))
            | Some(Frame::Emphasis(content))
            | Some(Frame::Strong(content))
            | Some(Frame::Strikethrough(content))
            | Some(Frame::Link { content, .. })
            | Some(Frame::Item {
                pending: content, ..
            }) => append_inline(content, inline),
            Some(Frame::Image { alt, .. }) => alt.push_str(&inline.plain_text()),
            _ => {}
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Frame::BlockQuote(children)) => children.push(block),
            Some(Frame::Item { item, pending, .. }) => {
                flush_pending(pending, &mut item.content);
                item.content.push(block);
            }
            _ => self.root.push(block),
        }
    }

    fn mark_task(&mut self, checked: bool) {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Item { item, .. } = frame {
                item.checked = Some(checked);
                return;
            }
        }
    }

    fn unique_id(&mut self, base: String) -> String {
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };

        let mut candidate = base.clone();
        let mut n = 1;
        while self.ids.contains(&candidate) {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }

        self.ids.insert(candidate.clone());
        candidate
    }

    /// A fenced block must end with a closing marker at least as long as its opener.
    ///
    /// The parser lets an unclosed fence run to the end of its container, which would
    /// swallow the rest of the document. A closed block spans its opener, one source
    /// line per payload line and the closer; anything shorter means the last line that
    /// looks like a closer was really payload, such as a marker indented four spaces.
    fn check_fence_closed(
        &self,
        block: &FencedBlock,
        range: &Range<usize>,
    ) -> Result<(), RenderError> {
        let line = block.line;
        let raw = &self.source[range.clone()];
        let raw_lines = raw.lines().count();
        let mut lines = raw.lines();
        let opening = lines.next().unwrap_or("");

        let Some((marker, at)) = opening
            .find("```")
            .map(|at| ('`', at))
            .or_else(|| opening.find("~~~").map(|at| ('~', at)))
        else {
            return Ok(());
        };
        let width = opening[at..].chars().take_while(|&c| c == marker).count();

        let looks_closed = lines.last().is_some_and(|last| {
            let last = strip_container(last);
            last.chars().count() >= width && last.chars().all(|c| c == marker)
        });
        let closed = looks_closed && raw_lines == block.payload.lines().count() + 2;

        if closed {
            Ok(())
        } else {
            Err(RenderError::UnterminatedFence {
                line,
                marker: marker.to_string().repeat(width),
            })
        }
    }

    /// Body rows must have exactly as many cells as the header.
    ///
    /// The parser pads short rows and drops extra cells, so the raw row is counted.
    fn check_row_width(&self, range: &Range<usize>) -> Result<(), RenderError> {
        let Some(Frame::Table(table)) = self.stack.last() else {
            return Ok(());
        };

        let expected = table.header.len();
        let raw = self.source[range.clone()].lines().next().unwrap_or("");
        let found = count_cells(raw);

        if found == expected {
            Ok(())
        } else {
            Err(RenderError::TableColumnMismatch {
                line: self.lines.line(range.start),
                expected,
                found,
            })
        }
    }
}

fn append_inline(content: &mut Vec<Inline>, inline: Inline) {
    if let (Some(Inline::Text(last)), Inline::Text(next)) = (content.last_mut(), &inline) {
        last.push_str(next);
        return;
    }
    content.push(inline);
}

fn flush_pending(pending: &mut Vec<Inline>, content: &mut Vec<Block>) {
    if !pending.is_empty() {
        content.push(Block::Paragraph(std::mem::take(pending)));
    }
}

fn convert_alignment(alignment: &pulldown_cmark::Alignment) -> Alignment {
    match alignment {
        pulldown_cmark::Alignment::None => Alignment::None,
        pulldown_cmark::Alignment::Left => Alignment::Left,
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
    }
}

/// Strip block quote markers and indentation from a raw line.
fn strip_container(line: &str) -> &str {
    line.trim_start_matches(|c: char| c == '>' || c.is_whitespace())
        .trim_end()
}

/// Count the cells of a raw pipe table row, honouring escaped pipes.
fn count_cells(row: &str) -> usize {
    let row = strip_container(row);
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = match row.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => row,
    };

    let mut count = 1;
    let mut escaped = false;
    for c in row.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '|' => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fence::{DiagramEngine, FenceKind, Language};
    use pretty_assertions::assert_eq;

    const FIRST_POST_BODY: &str = r#"# First Post

Some *emphasis* and **strong** text.

| Stage | Tool | Output |
|-------|------|--------|
| write | `markdown` | *source* |
| build | hugo | html |

```go
package main

func main() {}
```

```mermaid
graph LR
  A[Write] --> B[Build]
```
"#;

    fn fences(tree: &ContentTree) -> Vec<FencedBlock> {
        let mut out = Vec::new();
        tree.for_each_fence(|f| out.push(f.clone()));
        out
    }

    #[test]
    fn renders_table_code_and_diagram() {
        let rendered = render(FIRST_POST_BODY).unwrap();
        let blocks = &rendered.tree.blocks;

        let tables: Vec<&Table> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header.len(), 3);
        assert_eq!(tables[0].rows.len(), 2);
        assert!(tables[0].rows.iter().all(|row| row.len() == 3));

        let fences = fences(&rendered.tree);
        assert_eq!(fences.len(), 2);
        assert_eq!(fences[0].kind, FenceKind::Code(Language::Go));
        assert!(fences[0].payload.contains("package main"));
        assert_eq!(fences[1].kind, FenceKind::Diagram(DiagramEngine::Mermaid));
    }

    #[test]
    fn preserves_source_order() {
        let rendered = render(FIRST_POST_BODY).unwrap();
        let kinds: Vec<&str> = rendered
            .tree
            .blocks
            .iter()
            .map(|b| match b {
                Block::Heading { .. } => "heading",
                Block::Paragraph(_) => "paragraph",
                Block::Table(_) => "table",
                Block::Fence(_) => "fence",
                _ => "other",
            })
            .collect();

        assert_eq!(
            kinds,
            vec!["heading", "paragraph", "table", "fence", "fence"]
        );
    }

    #[test]
    fn table_cells_keep_inline_spans() {
        let rendered = render(FIRST_POST_BODY).unwrap();
        let Some(Block::Table(table)) = rendered
            .tree
            .blocks
            .iter()
            .find(|b| matches!(b, Block::Table(_)))
        else {
            panic!("no table");
        };

        assert_eq!(table.rows[0][1], vec![Inline::Code("markdown".to_string())]);
        assert_eq!(
            table.rows[0][2],
            vec![Inline::Emphasis(vec![Inline::Text("source".to_string())])]
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        let first = render(FIRST_POST_BODY).unwrap();
        let second = render(FIRST_POST_BODY).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn rejects_short_table_row() {
        let body = "| a | b | c |\n|---|---|---|\n| 1 | 2 |\n";

        let err = render(body).unwrap_err();

        assert_eq!(
            err,
            RenderError::TableColumnMismatch {
                line: 3,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn rejects_long_table_row() {
        let body = "| a | b |\n|---|---|\n| 1 | 2 |\n| 1 | 2 | 3 |\n";

        let err = render(body).unwrap_err();

        assert!(matches!(
            err,
            RenderError::TableColumnMismatch {
                line: 4,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn escaped_pipes_are_not_cell_separators() {
        let body = "| a | b |\n|---|---|\n| x \\| y | z |\n";

        let rendered = render(body).unwrap();

        assert!(matches!(rendered.tree.blocks[0], Block::Table(_)));
    }

    #[test]
    fn rejects_unterminated_fence() {
        let body = "Intro\n\n```go\nfunc main() {}\n\n# Not a heading\n";

        let err = render_with_offset(body, 4).unwrap_err();

        assert_eq!(
            err,
            RenderError::UnterminatedFence {
                line: 7,
                marker: "```".to_string()
            }
        );
    }

    #[test]
    fn rejects_fence_closed_by_shorter_marker() {
        let body = "````\ncode\n```\n";

        assert!(matches!(
            render(body),
            Err(RenderError::UnterminatedFence { .. })
        ));
    }

    #[test]
    fn indented_marker_does_not_close_fence() {
        let body = "```go\ncode\n\n# Swallowed heading\n\n    ```\n";

        let err = render(body).unwrap_err();

        assert_eq!(
            err,
            RenderError::UnterminatedFence {
                line: 1,
                marker: "```".to_string()
            }
        );
    }

    #[test]
    fn indented_marker_inside_closed_fence_is_payload() {
        let body = "```\n    ```\n```\n";

        let rendered = render(body).unwrap();

        assert_eq!(fences(&rendered.tree)[0].payload, "    ```\n");
    }

    #[test]
    fn empty_fence_is_closed() {
        let rendered = render("```sh\n```\n").unwrap();

        assert_eq!(fences(&rendered.tree)[0].payload, "");
    }

    #[test]
    fn balanced_fences_yield_one_node_each() {
        let body = "```\none\n```\n\n~~~python\ntwo\n~~~\n\n> ```sh\n> three\n> ```\n";

        let rendered = render(body).unwrap();
        let fences = fences(&rendered.tree);

        assert_eq!(fences.len(), 3);
        assert_eq!(fences[0].kind, FenceKind::Plain);
        assert_eq!(fences[1].kind, FenceKind::Code(Language::Python));
        assert_eq!(fences[2].payload, "three\n");
    }

    #[test]
    fn fence_lines_include_offset() {
        let rendered = render_with_offset("text\n\n```go\nx\n```\n", 5).unwrap();

        assert_eq!(fences(&rendered.tree)[0].line, 8);
    }

    #[test]
    fn builds_heading_ids_and_toc() {
        let body = "# Intro\n\n## Intro\n\n## Setup {#custom}\n";

        let rendered = render(body).unwrap();
        let ids: Vec<_> = rendered.toc.iter().map(|e| e.id.as_str()).collect();

        assert_eq!(ids, vec!["intro", "intro-1", "custom"]);
        assert_eq!(rendered.toc[1].level, 2);
        assert_eq!(rendered.toc[2].title, "Setup");
    }

    #[test]
    fn distinguishes_tight_and_loose_lists() {
        let tight = render("- one\n- two\n").unwrap();
        let loose = render("1. one\n\n2. two\n").unwrap();

        let Block::List(tight) = &tight.tree.blocks[0] else {
            panic!("expected list");
        };
        let Block::List(loose) = &loose.tree.blocks[0] else {
            panic!("expected list");
        };

        assert!(tight.tight);
        assert!(!tight.ordered);
        assert_eq!(tight.items.len(), 2);
        assert_eq!(
            tight.items[0].content,
            vec![Block::Paragraph(vec![Inline::Text("one".to_string())])]
        );

        assert!(!loose.tight);
        assert!(loose.ordered);
        assert_eq!(loose.start, Some(1));
    }

    #[test]
    fn nested_lists_stay_in_order() {
        let rendered = render("- parent\n  - child\n- sibling\n").unwrap();
        let Block::List(list) = &rendered.tree.blocks[0] else {
            panic!("expected list");
        };

        assert_eq!(list.items.len(), 2);
        assert!(matches!(list.items[0].content[0], Block::Paragraph(_)));
        assert!(matches!(list.items[0].content[1], Block::List(_)));
    }

    #[test]
    fn reads_task_items() {
        let rendered = render("- [x] done\n- [ ] todo\n").unwrap();
        let Block::List(list) = &rendered.tree.blocks[0] else {
            panic!("expected list");
        };

        assert_eq!(list.items[0].checked, Some(true));
        assert_eq!(list.items[1].checked, Some(false));
    }

    #[test]
    fn counts_raw_cells() {
        assert_eq!(count_cells("| a | b | c |"), 3);
        assert_eq!(count_cells("a | b"), 2);
        assert_eq!(count_cells("| a \\| b |"), 1);
        assert_eq!(count_cells("> | a | b |"), 2);
    }
}
