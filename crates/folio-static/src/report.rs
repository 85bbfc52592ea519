//! Build report.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

/// Category of a per-document failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Metadata,
    Render,
    Asset,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Metadata => "MetadataError",
            Self::Render => "RenderError",
            Self::Asset => "AssetError",
            Self::Io => "IOError",
        })
    }
}

/// A document that produced a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedDocument {
    pub slug: String,
    /// Path relative to the content root
    pub source: String,
    /// Artifact path relative to the output root
    pub output: String,
    pub draft: bool,
}

/// A recorded failure. The build carries on with other documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub source: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildWarning {
    pub source: String,
    pub message: String,
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// Outcome of one build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub processed: Vec<ProcessedDocument>,
    pub errors: Vec<DocumentFailure>,
    pub warnings: Vec<BuildWarning>,
    pub drafts_skipped: usize,
    /// Files written under the output root
    pub artifacts: usize,
    pub duration_ms: u64,
    pub output_dir: PathBuf,
}

impl BuildReport {
    /// True when no error of any kind was recorded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Pretty-printed JSON for CI wrappers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &DocumentFailure> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

/// Accumulates build results. Consumed exactly once by [`ReportBuilder::finish`].
#[derive(Debug)]
pub struct ReportBuilder {
    processed: Vec<ProcessedDocument>,
    errors: Vec<DocumentFailure>,
    warnings: Vec<BuildWarning>,
    drafts_skipped: usize,
    artifacts: usize,
    started: Instant,
}

impl ReportBuilder {
    pub fn start() -> Self {
        Self {
            processed: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            drafts_skipped: 0,
            artifacts: 0,
            started: Instant::now(),
        }
    }

    pub fn processed(&mut self, document: ProcessedDocument) {
        self.processed.push(document);
    }

    pub fn error(&mut self, source: impl Into<String>, kind: ErrorKind, message: impl Into<String>) {
        let failure = DocumentFailure {
            source: source.into(),
            kind,
            message: message.into(),
        };
        tracing::debug!("{}", failure);
        self.errors.push(failure);
    }

    pub fn warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(BuildWarning {
            source: source.into(),
            message: message.into(),
        });
    }

    pub fn draft_skipped(&mut self) {
        self.drafts_skipped += 1;
    }

    pub fn artifacts(&mut self, count: usize) {
        self.artifacts += count;
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Freeze the report. Entries are sorted so reruns compare equal.
    pub fn finish(mut self, output_dir: PathBuf) -> BuildReport {
        self.processed.sort_by(|a, b| a.source.cmp(&b.source));
        self.errors
            .sort_by(|a, b| (&a.source, a.kind).cmp(&(&b.source, b.kind)));
        // Stable sort keeps per-document warnings in line order
        self.warnings.sort_by(|a, b| a.source.cmp(&b.source));

        BuildReport {
            processed: self.processed,
            errors: self.errors,
            warnings: self.warnings,
            drafts_skipped: self.drafts_skipped,
            artifacts: self.artifacts,
            duration_ms: self.started.elapsed().as_millis() as u64,
            output_dir,
        }
    }
}
