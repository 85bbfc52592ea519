//! Structural HTML output for content trees.

use std::fmt::Write;

use crate::fence::{FenceKind, FencedBlock};
use crate::node::{Alignment, Block, ContentTree, Inline, List, Table};

impl ContentTree {
    /// Serialize the tree to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            write_block(&mut out, block, false);
        }
        out
    }
}

/// Plain preformatted rendering of a fence, used when no markup was substituted.
pub fn fence_fallback_html(fence: &FencedBlock) -> String {
    let mut out = String::new();
    match &fence.kind {
        FenceKind::Plain => out.push_str("<pre><code>"),
        kind => {
            let token = kind.token().unwrap_or_default();
            let _ = write!(out, "<pre><code class=\"language-{}\">", escape_html(token));
        }
    }
    out.push_str(&escape_html(&fence.payload));
    out.push_str("</code></pre>\n");
    out
}

fn write_block(out: &mut String, block: &Block, tight: bool) {
    match block {
        Block::Heading { level, id, content } => {
            let _ = write!(out, "<h{} id=\"{}\">", level, escape_html(id));
            write_inlines(out, content);
            let _ = writeln!(out, "</h{}>", level);
        }
        Block::Paragraph(content) if tight => write_inlines(out, content),
        Block::Paragraph(content) => {
            out.push_str("<p>");
            write_inlines(out, content);
            out.push_str("</p>\n");
        }
        Block::List(list) => write_list(out, list),
        Block::Table(table) => write_table(out, table),
        Block::Fence(fence) => match &fence.markup {
            Some(markup) => {
                out.push_str(markup);
                if !markup.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => out.push_str(&fence_fallback_html(fence)),
        },
        Block::Preformatted(text) => {
            let _ = writeln!(out, "<pre><code>{}</code></pre>", escape_html(text));
        }
        Block::BlockQuote(children) => {
            out.push_str("<blockquote>\n");
            for child in children {
                write_block(out, child, false);
            }
            out.push_str("</blockquote>\n");
        }
        Block::Html(html) => out.push_str(html),
        Block::Rule => out.push_str("<hr />\n"),
    }
}

fn write_list(out: &mut String, list: &List) {
    match (list.ordered, list.start) {
        (true, Some(start)) if start != 1 => {
            let _ = writeln!(out, "<ol start=\"{}\">", start);
        }
        (true, _) => out.push_str("<ol>\n"),
        (false, _) => out.push_str("<ul>\n"),
    }

    for item in &list.items {
        out.push_str("<li>");
        if let Some(checked) = item.checked {
            out.push_str(if checked {
                "<input disabled=\"\" type=\"checkbox\" checked=\"\"/>\n"
            } else {
                "<input disabled=\"\" type=\"checkbox\"/>\n"
            });
        }
        for (i, block) in item.content.iter().enumerate() {
            if list.tight && i > 0 && matches!(block, Block::Paragraph(_)) {
                out.push('\n');
            }
            write_block(out, block, list.tight);
        }
        out.push_str("</li>\n");
    }

    out.push_str(if list.ordered { "</ol>\n" } else { "</ul>\n" });
}

fn write_table(out: &mut String, table: &Table) {
    out.push_str("<table>\n<thead>\n<tr>\n");
    for (i, cell) in table.header.iter().enumerate() {
        write_cell(out, "th", alignment_at(table, i), cell);
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in &table.rows {
        out.push_str("<tr>\n");
        for (i, cell) in row.iter().enumerate() {
            write_cell(out, "td", alignment_at(table, i), cell);
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
}

fn alignment_at(table: &Table, column: usize) -> Alignment {
    table
        .alignments
        .get(column)
        .copied()
        .unwrap_or(Alignment::None)
}

fn write_cell(out: &mut String, tag: &str, alignment: Alignment, content: &[Inline]) {
    let style = match alignment {
        Alignment::None => "",
        Alignment::Left => " style=\"text-align: left\"",
        Alignment::Center => " style=\"text-align: center\"",
        Alignment::Right => " style=\"text-align: right\"",
    };
    let _ = write!(out, "<{}{}>", tag, style);
    write_inlines(out, content);
    let _ = writeln!(out, "</{}>", tag);
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        write_inline(out, inline);
    }
}

fn write_inline(out: &mut String, inline: &Inline) {
    match inline {
        Inline::Text(text) => out.push_str(&escape_html(text)),
        Inline::Code(code) => {
            let _ = write!(out, "<code>{}</code>", escape_html(code));
        }
        Inline::Emphasis(children) => wrap(out, "em", children),
        Inline::Strong(children) => wrap(out, "strong", children),
        Inline::Strikethrough(children) => wrap(out, "del", children),
        Inline::Link {
            href,
            title,
            content,
        } => {
            let _ = write!(out, "<a href=\"{}\"", escape_html(href));
            if !title.is_empty() {
                let _ = write!(out, " title=\"{}\"", escape_html(title));
            }
            out.push('>');
            write_inlines(out, content);
            out.push_str("</a>");
        }
        Inline::Image { src, title, alt } => {
            let _ = write!(
                out,
                "<img src=\"{}\" alt=\"{}\"",
                escape_html(src),
                escape_html(alt)
            );
            if !title.is_empty() {
                let _ = write!(out, " title=\"{}\"", escape_html(title));
            }
            out.push_str(" />");
        }
        Inline::Html(html) => out.push_str(html),
        Inline::SoftBreak => out.push('\n'),
        Inline::HardBreak => out.push_str("<br />\n"),
    }
}

fn wrap(out: &mut String, tag: &str, children: &[Inline]) {
    let _ = write!(out, "<{}>", tag);
    write_inlines(out, children);
    let _ = write!(out, "</{}>", tag);
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
