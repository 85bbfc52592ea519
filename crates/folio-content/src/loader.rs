//! Content discovery.
//!
//! Walks a content root and yields raw document candidates lazily. The loader only
//! reads; it never writes anything.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::document::Document;
use crate::frontmatter::MetadataError;

/// Errors that can occur while discovering content.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("content directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk content directory: {0}")]
    Walk(String),
}

/// Finds content files below a root directory.
#[derive(Debug, Clone)]
pub struct ContentLoader {
    root: PathBuf,
    extensions: Vec<String>,
}

impl ContentLoader {
    /// Create a loader for `.md` and `.markdown` files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["md".to_string(), "markdown".to_string()],
        }
    }

    /// Replace the recognized file extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate content files in file-name order.
    ///
    /// The returned iterator is lazy and single-pass; call again for a fresh walk.
    pub fn candidates(&self) -> Result<Candidates, LoadError> {
        if !self.root.is_dir() {
            return Err(LoadError::RootNotFound(self.root.clone()));
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_visible as fn(&DirEntry) -> bool);

        Ok(Candidates {
            walker,
            root: self.root.clone(),
            extensions: self.extensions.clone(),
        })
    }
}

/// Hidden files and directories are never content.
fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0
        || !entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Lazy sequence of content files.
pub struct Candidates {
    walker: walkdir::FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>,
    root: PathBuf,
    extensions: Vec<String>,
}

impl Iterator for Candidates {
    type Item = Result<SourceFile, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(LoadError::Walk(e.to_string()))),
            };

            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !self.extensions.iter().any(|known| known == ext) {
                continue;
            }

            let relative_path = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_path_buf();

            tracing::debug!("Found content file {}", relative_path.display());

            return Some(
                fs::read_to_string(path)
                    .map(|raw| SourceFile {
                        path: path.to_path_buf(),
                        relative_path,
                        raw,
                    })
                    .map_err(|source| LoadError::Io {
                        path: path.to_path_buf(),
                        source,
                    }),
            );
        }
    }
}

/// A content file read from disk, not yet parsed.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub raw: String,
}

impl SourceFile {
    /// Parse the front-matter block and split off the body.
    pub fn into_document(self) -> Result<Document, MetadataError> {
        Document::parse(self.path, self.relative_path, &self.raw)
    }
}
