//! Fenced block kinds and info string parsing.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Programming language declared on a code fence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Bash,
    Json,
    Yaml,
    Toml,
    Html,
    Css,
    C,
    Cpp,
    Java,
    Sql,
    Markdown,
    Diff,
    /// A token this crate has no tag for; kept verbatim.
    Other(String),
}

impl Language {
    /// Parse a language from the leading token of an info string.
    pub fn from_token(token: &str) -> Self {
        match token.to_lowercase().as_str() {
            "go" | "golang" => Self::Go,
            "rust" | "rs" => Self::Rust,
            "python" | "py" => Self::Python,
            "js" | "javascript" => Self::JavaScript,
            "ts" | "typescript" => Self::TypeScript,
            "bash" | "sh" | "shell" | "zsh" => Self::Bash,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            "html" => Self::Html,
            "css" => Self::Css,
            "c" => Self::C,
            "cpp" | "c++" => Self::Cpp,
            "java" => Self::Java,
            "sql" => Self::Sql,
            "markdown" | "md" => Self::Markdown,
            "diff" | "patch" => Self::Diff,
            _ => Self::Other(token.to_string()),
        }
    }

    /// Canonical token, used for `language-*` classes and highlighter lookup.
    pub fn token(&self) -> &str {
        match self {
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Bash => "bash",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Html => "html",
            Self::Css => "css",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Sql => "sql",
            Self::Markdown => "markdown",
            Self::Diff => "diff",
            Self::Other(token) => token,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Reserved diagram engines. Fences tagged with one of these are drawn, not highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagramEngine {
    Mermaid,
    Graphviz,
    PlantUml,
}

impl DiagramEngine {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "mermaid" => Some(Self::Mermaid),
            "dot" | "graphviz" => Some(Self::Graphviz),
            "plantuml" | "puml" => Some(Self::PlantUml),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::Graphviz => "dot",
            Self::PlantUml => "plantuml",
        }
    }
}

impl fmt::Display for DiagramEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Declared kind of a fenced block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FenceKind {
    Code(Language),
    Diagram(DiagramEngine),
    /// No kind token after the opening marker
    #[default]
    Plain,
}

impl FenceKind {
    /// Parse the kind from a code fence info string.
    pub fn from_info(info: &str) -> Self {
        let token = kind_token(info);
        if token.is_empty() {
            return Self::Plain;
        }

        match DiagramEngine::from_token(token) {
            Some(engine) => Self::Diagram(engine),
            None => Self::Code(Language::from_token(token)),
        }
    }

    /// The token as written, or `None` for plain fences.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Code(language) => Some(language.token()),
            Self::Diagram(engine) => Some(engine.token()),
            Self::Plain => None,
        }
    }
}

/// First whitespace-separated word of an info string, without attribute braces.
pub fn kind_token(info: &str) -> &str {
    let first = info.split_whitespace().next().unwrap_or("");
    first.split('{').next().unwrap_or("").trim()
}

/// A fenced block from a document body.
#[derive(Debug, Clone, PartialEq)]
pub struct FencedBlock {
    /// Full info string after the opening marker
    pub info: String,

    /// Declared kind
    pub kind: FenceKind,

    /// Raw text between the markers
    pub payload: String,

    /// Line where the opening marker sits (1-indexed)
    pub line: usize,

    /// Optional title hint from the info string
    pub title: Option<String>,

    /// Markup substituted by the annotator; `None` renders as preformatted text
    pub markup: Option<String>,
}

impl FencedBlock {
    pub fn new(info: &str, payload: String, line: usize) -> Self {
        Self {
            info: info.to_string(),
            kind: FenceKind::from_info(info),
            payload,
            line,
            title: extract_title(info),
            markup: None,
        }
    }
}

static TITLE_REGEX: OnceLock<Regex> = OnceLock::new();

fn title_regex() -> &'static Regex {
    TITLE_REGEX.get_or_init(|| {
        Regex::new(r#"(?:title|file(?:name)?)=(?:"([^"]*)"|(\S+))"#).expect("valid title regex")
    })
}

/// Extract a title from a code fence info string if present.
///
/// Supports formats like:
/// - `go title="main.go"`
/// - `go file=main.go`
pub fn extract_title(info: &str) -> Option<String> {
    let captures = title_regex().captures(info)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().trim_matches('"').to_string())
        .filter(|t| !t.is_empty())
}
