//! Diagram renderers.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

use folio_content::{escape_html, DiagramEngine};

use crate::traits::{BlockRenderer, RenderFailure};

/// Leaves diagrams for a client-side library to draw.
///
/// Emits `<pre class="mermaid">` containers, the form mermaid.js scans for. Only
/// mermaid has a browser script; other engines are unsupported here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientDiagramRenderer;

impl BlockRenderer for ClientDiagramRenderer {
    fn name(&self) -> &'static str {
        "client"
    }

    fn render(&self, token: &str, source: &str) -> Result<String, RenderFailure> {
        if token != DiagramEngine::Mermaid.token() {
            return Err(RenderFailure::Unsupported(token.to_string()));
        }

        Ok(format!(
            "<pre class=\"{} diagram\" data-engine=\"{}\">{}</pre>",
            escape_html(token),
            escape_html(token),
            escape_html(source)
        ))
    }
}

/// Pipes diagram source through an external command per engine.
///
/// The command reads the diagram on stdin and writes markup (usually SVG) to stdout,
/// e.g. `dot -Tsvg`.
#[derive(Debug, Clone, Default)]
pub struct CommandDiagramRenderer {
    commands: BTreeMap<String, Vec<String>>,
}

impl CommandDiagramRenderer {
    pub fn new(commands: BTreeMap<String, Vec<String>>) -> Self {
        Self { commands }
    }

    fn run(&self, argv: &[String], source: &str) -> Result<String, RenderFailure> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RenderFailure::Failed("empty command".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderFailure::Failed(format!("{}: {}", program, e)))?;

        // Feed stdin from another thread so a chatty child cannot block on a full pipe.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderFailure::Failed("stdin unavailable".to_string()))?;
        let input = source.to_string();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .map_err(|e| RenderFailure::Failed(e.to_string()))?;

        writer
            .join()
            .map_err(|_| RenderFailure::Failed("stdin writer panicked".to_string()))?
            .map_err(|e| RenderFailure::Failed(e.to_string()))?;

        if !output.status.success() {
            return Err(RenderFailure::Failed(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout).map_err(|e| RenderFailure::Failed(e.to_string()))
    }
}

impl BlockRenderer for CommandDiagramRenderer {
    fn name(&self) -> &'static str {
        "command"
    }

    fn render(&self, token: &str, source: &str) -> Result<String, RenderFailure> {
        let argv = self
            .commands
            .get(token)
            .ok_or_else(|| RenderFailure::Unsupported(token.to_string()))?;

        let markup = self.run(argv, source)?;

        Ok(format!(
            "<figure class=\"diagram diagram-{}\">{}</figure>",
            escape_html(token),
            markup.trim()
        ))
    }
}
