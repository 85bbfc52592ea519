//! Content documents.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

use crate::frontmatter::{extract_frontmatter, FrontMatter, MetadataError};
use crate::renderer::{render_with_offset, RenderError, Rendered};
use crate::slug::{slugify, slugify_path};

/// A content document: front-matter plus raw markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Unique identifier, also the output path prefix
    pub slug: String,

    /// Source file path
    pub source_path: PathBuf,

    /// Path relative to the content root
    pub relative_path: PathBuf,

    pub frontmatter: FrontMatter,

    /// Markdown body without the front-matter block
    pub body: String,

    /// Lines preceding the body in the source file
    pub body_offset: usize,
}

impl Document {
    /// Split a file into front-matter and body.
    pub fn parse(
        source_path: PathBuf,
        relative_path: PathBuf,
        raw: &str,
    ) -> Result<Self, MetadataError> {
        let (frontmatter, body) = extract_frontmatter(raw)?;
        let frontmatter = frontmatter.unwrap_or_default();

        // Count lines in front-matter to offset line numbers
        let consumed = raw.len() - body.len();
        let body_offset = raw[..consumed].lines().count();

        let slug = match &frontmatter.slug {
            Some(slug) => slugify_path(slug),
            None => derive_slug(&relative_path),
        };
        if slug.is_empty() {
            return Err(MetadataError::EmptySlug {
                value: frontmatter.slug.clone().unwrap_or_default(),
            });
        }

        Ok(Self {
            slug,
            source_path,
            relative_path,
            frontmatter,
            body: body.to_string(),
            body_offset,
        })
    }

    /// Title from front-matter, or one derived from the file name.
    pub fn title(&self) -> String {
        if let Some(title) = &self.frontmatter.title {
            return title.clone();
        }

        let stem = self
            .relative_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled");

        let name = if stem == "index" {
            self.relative_path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|s| s.to_str())
                .unwrap_or(stem)
        } else {
            stem
        };

        capitalize(&name.replace(['-', '_'], " "))
    }

    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.frontmatter.date
    }

    pub fn is_draft(&self) -> bool {
        self.frontmatter.draft
    }

    pub fn description(&self) -> Option<&str> {
        self.frontmatter.description.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.frontmatter.tags
    }

    /// Render the body into a content tree, with file-relative line numbers.
    pub fn render(&self) -> Result<Rendered, RenderError> {
        render_with_offset(&self.body, self.body_offset)
    }
}

/// Derive a slug from a path relative to the content root.
///
/// `posts/First Post.md` becomes `posts/first-post`, `guides/index.md` becomes
/// `guides`, and the root `index.md` keeps the slug `index`.
pub fn derive_slug(relative: &Path) -> String {
    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");

    let parent: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| c.as_os_str().to_str())
                .map(slugify)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if stem == "index" && !parent.is_empty() {
        return parent.join("/");
    }

    let mut segments = parent;
    let leaf = slugify(stem);
    segments.push(if leaf.is_empty() {
        "index".to_string()
    } else {
        leaf
    });
    segments.join("/")
}

/// Capitalize first letter of a string.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(relative: &str, raw: &str) -> Document {
        Document::parse(PathBuf::from(relative), PathBuf::from(relative), raw).unwrap()
    }

    #[test]
    fn derives_slugs_from_paths() {
        assert_eq!(derive_slug(Path::new("posts/First Post.md")), "posts/first-post");
        assert_eq!(derive_slug(Path::new("guides/index.md")), "guides");
        assert_eq!(derive_slug(Path::new("index.md")), "index");
        assert_eq!(derive_slug(Path::new("about.markdown")), "about");
    }

    #[test]
    fn slug_override_wins() {
        let doc = parse("posts/a.md", "---\nslug: /Hello There/\n---\n");

        assert_eq!(doc.slug, "hello-there");
    }

    #[test]
    fn slug_without_usable_characters_is_rejected() {
        for raw in ["---\nslug: \"/\"\n---\n", "---\nslug: \"...\"\n---\n"] {
            let err = Document::parse(PathBuf::from("a.md"), PathBuf::from("a.md"), raw)
                .unwrap_err();

            assert!(matches!(err, MetadataError::EmptySlug { .. }), "{raw}");
        }
    }

    #[test]
    fn title_falls_back_to_file_name() {
        assert_eq!(parse("posts/getting-started.md", "").title(), "Getting started");
        assert_eq!(parse("guides/index.md", "").title(), "Guides");
        assert_eq!(
            parse("a.md", "---\ntitle: Real Title\n---\n").title(),
            "Real Title"
        );
    }

    #[test]
    fn tracks_body_offset() {
        let doc = parse("a.md", "---\ntitle: T\ndraft: true\n---\n# Body\n");

        assert_eq!(doc.body_offset, 4);
        assert!(doc.is_draft());
        assert_eq!(doc.body, "# Body\n");
    }

    #[test]
    fn render_reports_file_lines() {
        let doc = parse("a.md", "---\ntitle: T\n---\n\n```go\nunclosed\n");

        let err = doc.render().unwrap_err();

        assert_eq!(
            err,
            RenderError::UnterminatedFence {
                line: 5,
                marker: "```".to_string()
            }
        );
    }
}
