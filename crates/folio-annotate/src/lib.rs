//! Fenced block annotation for folio.
//!
//! Tags each fenced block by its declared kind and hands it to an external
//! renderer: a syntax highlighter for known code languages, a diagram renderer for
//! reserved diagram engines. Anything else, and any renderer failure, stays plain
//! preformatted text.

pub mod annotator;
pub mod diagram;
pub mod highlight;
pub mod traits;

pub use annotator::{Annotation, AnnotationWarning, Annotator};
pub use diagram::{ClientDiagramRenderer, CommandDiagramRenderer};
pub use highlight::SyntectHighlighter;
pub use traits::{BlockRenderer, RenderFailure};
