//! Trait definitions for external block renderers.

/// Errors a block renderer can report.
///
/// These never fail a build; the annotator keeps the plain preformatted text instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderFailure {
    #[error("no renderer for `{0}`")]
    Unsupported(String),

    #[error("renderer failed: {0}")]
    Failed(String),
}

/// A renderer that turns a fenced block payload into markup.
///
/// Implementations are treated as pure functions of `(token, source)`.
pub trait BlockRenderer: Send + Sync {
    /// Renderer identifier (e.g., "syntect", "client")
    fn name(&self) -> &'static str;

    /// Render a block.
    ///
    /// # Arguments
    /// * `token` - The canonical kind token (language or diagram engine)
    /// * `source` - The raw payload between the fence markers
    fn render(&self, token: &str, source: &str) -> Result<String, RenderFailure>;
}
