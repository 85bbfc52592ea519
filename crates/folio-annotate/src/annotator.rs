//! Tagging pass over fenced blocks.

use std::fmt;

use folio_content::{ContentTree, DiagramEngine, FenceKind, FencedBlock, Language};

use crate::traits::BlockRenderer;

/// What a fenced block is handed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Known code language, sent to the code renderer
    Highlight(Language),
    /// Reserved diagram engine, sent to the diagram renderer
    Diagram(DiagramEngine),
    /// Kept as plain preformatted text
    Passthrough,
}

impl Annotation {
    /// Classify a fence by its declared kind.
    pub fn classify(kind: &FenceKind) -> Self {
        match kind {
            FenceKind::Diagram(engine) => Self::Diagram(*engine),
            FenceKind::Code(language) if language.is_known() => Self::Highlight(language.clone()),
            _ => Self::Passthrough,
        }
    }
}

/// A degraded fence. Warnings never fail a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationWarning {
    /// Line of the opening fence marker
    pub line: usize,
    pub message: String,
}

impl fmt::Display for AnnotationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Hands tagged fences to external renderers and substitutes their markup.
#[derive(Default)]
pub struct Annotator {
    code: Option<Box<dyn BlockRenderer>>,
    diagrams: Option<Box<dyn BlockRenderer>>,
}

impl Annotator {
    /// Create an annotator with no renderers; every fence stays plain text.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code_renderer(mut self, renderer: impl BlockRenderer + 'static) -> Self {
        self.code = Some(Box::new(renderer));
        self
    }

    pub fn with_diagram_renderer(mut self, renderer: impl BlockRenderer + 'static) -> Self {
        self.diagrams = Some(Box::new(renderer));
        self
    }

    /// Annotate every fence in the tree, in document order.
    pub fn annotate(&self, tree: &mut ContentTree) -> Vec<AnnotationWarning> {
        let mut warnings = Vec::new();
        tree.for_each_fence_mut(|fence| {
            if let Some(warning) = self.annotate_fence(fence) {
                warnings.push(warning);
            }
        });
        warnings
    }

    fn annotate_fence(&self, fence: &mut FencedBlock) -> Option<AnnotationWarning> {
        let (renderer, token) = match Annotation::classify(&fence.kind) {
            Annotation::Highlight(language) => (self.code.as_deref(), language.token().to_string()),
            Annotation::Diagram(engine) => (self.diagrams.as_deref(), engine.token().to_string()),
            Annotation::Passthrough => {
                return match &fence.kind {
                    FenceKind::Code(Language::Other(token)) => Some(AnnotationWarning {
                        line: fence.line,
                        message: format!("unknown fence kind `{}`, rendered as plain text", token),
                    }),
                    _ => None,
                };
            }
        };

        let renderer = renderer?;

        match renderer.render(&token, &fence.payload) {
            Ok(markup) => {
                fence.markup = Some(markup);
                None
            }
            Err(e) => {
                tracing::warn!(
                    "{} renderer could not render `{}` block at line {}: {}",
                    renderer.name(),
                    token,
                    fence.line,
                    e
                );
                Some(AnnotationWarning {
                    line: fence.line,
                    message: format!("`{}` block rendered as plain text: {}", token, e),
                })
            }
        }
    }
}
