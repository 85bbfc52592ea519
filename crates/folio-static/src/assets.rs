//! Asset pipeline for stylesheets and static files.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// An asset that could not be read or written.
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", path.display())]
pub struct AssetError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl AssetError {
    fn new(path: &Path, source: std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Generate the built-in stylesheet.
    pub fn generate_css() -> String {
        DEFAULT_CSS.to_string()
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }

    /// Copy one file, minifying `.css` when asked. Returns the bytes written.
    pub fn copy_file(source: &Path, dest: &Path, minify: bool) -> Result<u64, AssetError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| AssetError::new(parent, e))?;
        }

        let is_css = source.extension().and_then(|e| e.to_str()) == Some("css");
        if minify && is_css {
            let css = fs::read_to_string(source).map_err(|e| AssetError::new(source, e))?;
            let css = match Self::minify_css(&css) {
                Ok(minified) => minified,
                Err(e) => {
                    tracing::warn!("Keeping {} unminified: {}", source.display(), e);
                    css
                }
            };
            fs::write(dest, &css).map_err(|e| AssetError::new(dest, e))?;
            return Ok(css.len() as u64);
        }

        fs::copy(source, dest).map_err(|e| AssetError::new(dest, e))
    }

    /// Copy a directory tree into `dest`, skipping hidden entries.
    ///
    /// Returns the number of files copied.
    pub fn copy_tree(source: &Path, dest: &Path, minify: bool) -> Result<usize, AssetError> {
        let mut copied = 0;

        let walker = WalkDir::new(source)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                AssetError {
                    path,
                    source: e.into(),
                }
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
            Self::copy_file(entry.path(), &dest.join(relative), minify)?;
            copied += 1;
        }

        Ok(copied)
    }
}

const DEFAULT_CSS: &str = r#"/* folio default theme */

:root {
  --background: #ffffff;
  --foreground: #1f2328;
  --muted: #f6f8fa;
  --muted-foreground: #59636e;
  --border: #d1d9e0;
  --primary: #0969da;
  --content-max-width: 720px;
}

* {
  box-sizing: border-box;
}

body {
  margin: 0;
  font-family: system-ui, -apple-system, sans-serif;
  background: var(--background);
  color: var(--foreground);
  line-height: 1.6;
}

a {
  color: var(--primary);
}

.site-header {
  display: flex;
  justify-content: space-between;
  align-items: baseline;
  max-width: var(--content-max-width);
  margin: 0 auto;
  padding: 1.5rem 1rem;
  border-bottom: 1px solid var(--border);
}

.site-title {
  font-weight: 700;
  font-size: 1.25rem;
  color: var(--foreground);
  text-decoration: none;
}

.main {
  max-width: var(--content-max-width);
  margin: 0 auto;
  padding: 2rem 1rem;
}

.post-title {
  margin-bottom: 0.25rem;
}

.post-meta {
  color: var(--muted-foreground);
  font-size: 0.875rem;
}

.draft-badge {
  margin-left: 0.5rem;
  padding: 0 0.5rem;
  border: 1px solid var(--border);
  border-radius: 0.25rem;
}

.post-tags,
.tag-cloud {
  display: flex;
  flex-wrap: wrap;
  gap: 0.5rem;
  list-style: none;
  padding: 0;
}

.post-tags a,
.tag-cloud a {
  padding: 0.125rem 0.5rem;
  background: var(--muted);
  border-radius: 999px;
  text-decoration: none;
}

.toc {
  margin: 1.5rem 0;
  padding: 1rem;
  background: var(--muted);
  border-radius: 0.375rem;
}

.toc h2 {
  margin-top: 0;
  font-size: 1rem;
}

.toc ul {
  margin: 0;
  padding-left: 1rem;
}

.toc-level-3 {
  margin-left: 1rem;
}

.content pre {
  padding: 1rem;
  overflow-x: auto;
  background: var(--muted);
  border-radius: 0.375rem;
}

.content code {
  font-family: ui-monospace, SFMono-Regular, Menlo, monospace;
  font-size: 0.875em;
}

.content table {
  border-collapse: collapse;
  margin: 1rem 0;
}

.content th,
.content td {
  padding: 0.375rem 0.75rem;
  border: 1px solid var(--border);
}

.content blockquote {
  margin: 1rem 0;
  padding-left: 1rem;
  color: var(--muted-foreground);
  border-left: 4px solid var(--border);
}

.content img {
  max-width: 100%;
}

.diagram {
  text-align: center;
  background: transparent;
}

.entries {
  list-style: none;
  padding: 0;
}

.entry {
  margin-bottom: 1.25rem;
}

.entry time {
  display: block;
  color: var(--muted-foreground);
  font-size: 0.875rem;
}

.post-nav,
.pagination {
  display: flex;
  justify-content: space-between;
  margin-top: 3rem;
  padding-top: 1rem;
  border-top: 1px solid var(--border);
}
"#;
