//! Static site builder.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use folio_annotate::{
    AnnotationWarning, Annotator, ClientDiagramRenderer, CommandDiagramRenderer,
    SyntectHighlighter,
};
use folio_content::{
    ContentLoader, DiagramEngine, FenceKind, LoadError, MetadataError, SourceFile,
};

use crate::assembler::{
    AssembleOptions, ListingPage, Page, RenderedDocument, Site, SiteAssembler, TagCase,
    DEFAULT_PAGINATE,
};
use crate::assets::AssetPipeline;
use crate::lock::{LockError, OutputLock};
use crate::report::{BuildReport, ErrorKind, ProcessedDocument, ReportBuilder};
use crate::templates::{
    ListingContext, PageContext, SiteContext, TagSummary, TagsContext, TemplateEngine, TocItem,
};

/// Script loaded on pages with client-side diagrams.
pub const DEFAULT_DIAGRAM_SCRIPT: &str =
    "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// How diagram fences are turned into markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramMode {
    /// Leave diagrams for a script in the browser
    Client { script: String },
    /// Pipe diagram source through an external command per engine
    Command(BTreeMap<String, Vec<String>>),
}

impl Default for DiagramMode {
    fn default() -> Self {
        Self::Client {
            script: DEFAULT_DIAGRAM_SCRIPT.to_string(),
        }
    }
}

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Content root
    pub content_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Recognized content file extensions
    pub extensions: Vec<String>,

    /// Directory copied verbatim into the output root
    pub static_dir: Option<PathBuf>,

    /// Extra files or directories copied into the output root
    pub assets: Vec<PathBuf>,

    /// Minify CSS output
    pub minify: bool,

    /// Base URL for the site
    pub base_url: String,

    /// Site title
    pub title: String,

    pub description: Option<String>,

    /// Value of `<html lang>`
    pub language: String,

    /// Entries per listing page
    pub paginate: usize,

    /// Publish drafts as standalone pages (preview mode)
    pub drafts: bool,

    /// Empty the output directory before writing
    pub clean: bool,

    pub tag_case: TagCase,

    /// syntect theme name
    pub highlight_theme: String,

    pub diagrams: DiagramMode,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            output_dir: PathBuf::from("public"),
            extensions: vec!["md".to_string(), "markdown".to_string()],
            static_dir: Some(PathBuf::from("static")),
            assets: vec![],
            minify: true,
            base_url: "/".to_string(),
            title: "My Site".to_string(),
            description: None,
            language: "en".to_string(),
            paginate: DEFAULT_PAGINATE,
            drafts: false,
            clean: false,
            tag_case: TagCase::default(),
            highlight_theme: folio_annotate::highlight::DEFAULT_THEME.to_string(),
            diagrams: DiagramMode::default(),
        }
    }
}

/// Errors that end a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Content(#[from] LoadError),

    #[error("output is locked by another build: {}", .0.display())]
    Locked(PathBuf),

    #[error(transparent)]
    Lock(LockError),

    #[error("Failed to render template {template}: {message}")]
    Template { template: String, message: String },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("two artifacts would be written to {}", .0.display())]
    Collision(PathBuf),

    #[error("build cancelled")]
    Cancelled,
}

impl From<LockError> for BuildError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Held(path) => Self::Locked(path),
            other => Self::Lock(other),
        }
    }
}

/// Shared flag that asks a running build to stop between documents.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of processing one candidate file.
enum Outcome {
    Rendered(RenderedDocument, Vec<AnnotationWarning>),
    Draft,
    Failed {
        source: String,
        kind: ErrorKind,
        message: String,
    },
}

/// An HTML file waiting to be written.
struct Artifact {
    path: PathBuf,
    html: String,
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
    annotator: Annotator,
    templates: TemplateEngine,
    site: SiteContext,
    cancel: CancelFlag,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        let annotator = Annotator::new().with_code_renderer(SyntectHighlighter::new(&config.highlight_theme));
        let annotator = match &config.diagrams {
            DiagramMode::Client { .. } => annotator.with_diagram_renderer(ClientDiagramRenderer),
            DiagramMode::Command(commands) => {
                annotator.with_diagram_renderer(CommandDiagramRenderer::new(commands.clone()))
            }
        };

        Self::with_annotator(config, annotator)
    }

    /// Create a builder with a custom annotator.
    pub fn with_annotator(config: BuildConfig, annotator: Annotator) -> Self {
        let site = SiteContext {
            title: config.title.clone(),
            base_url: crate::assembler::normalize_base_url(&config.base_url),
            description: config.description.clone(),
            language: config.language.clone(),
        };

        Self {
            config,
            annotator,
            templates: TemplateEngine::new(),
            site,
            cancel: CancelFlag::default(),
        }
    }

    /// Flag that cancels this builder's runs when set.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the static site.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let mut report = ReportBuilder::start();
        let output_dir = &self.config.output_dir;

        let _lock = OutputLock::acquire(output_dir)?;

        tracing::info!(
            "Building {} into {}",
            self.config.content_dir.display(),
            output_dir.display()
        );

        if self.config.clean && output_dir.exists() {
            tracing::info!("Cleaning {}", output_dir.display());
            fs::remove_dir_all(output_dir).map_err(|e| write_error(output_dir, e))?;
        }
        fs::create_dir_all(output_dir).map_err(|e| write_error(output_dir, e))?;

        // Enumerate first so the pool sees a fixed, path-ordered work list
        let candidates: Vec<Result<SourceFile, LoadError>> = ContentLoader::new(&self.config.content_dir)
            .with_extensions(self.config.extensions.iter().cloned())
            .candidates()?
            .collect();

        let outcomes: Vec<Option<Outcome>> = candidates
            .into_par_iter()
            .map(|candidate| {
                if self.cancel.is_cancelled() {
                    None
                } else {
                    Some(self.process(candidate))
                }
            })
            .collect();
        self.check_cancelled()?;

        let documents = self.collect(outcomes.into_iter().flatten(), &mut report);

        let site = SiteAssembler::new(AssembleOptions {
            base_url: self.config.base_url.clone(),
            paginate: self.config.paginate,
            tag_case: self.config.tag_case,
        })
        .assemble(documents);

        self.check_images(&site, &mut report);

        let artifacts = self.render_site(&site)?;
        self.check_cancelled()?;

        artifacts.par_iter().try_for_each(|artifact| {
            if self.cancel.is_cancelled() {
                return Err(BuildError::Cancelled);
            }
            write_file(&output_dir.join(&artifact.path), artifact.html.as_bytes())
        })?;
        report.artifacts(artifacts.len());

        for page in &site.pages {
            report.processed(ProcessedDocument {
                slug: page.document.slug.clone(),
                source: source_label(&page.document.relative_path),
                output: page.output_path.to_string_lossy().replace('\\', "/"),
                draft: page.is_draft(),
            });
        }

        self.write_assets(&mut report)?;

        let report = report.finish(output_dir.clone());

        tracing::info!(
            "Built {} pages ({} artifacts, {} errors, {} warnings) in {}ms",
            report.processed.len(),
            report.artifacts,
            report.errors.len(),
            report.warnings.len(),
            report.duration_ms
        );

        Ok(report)
    }

    fn check_cancelled(&self) -> Result<(), BuildError> {
        if self.cancel.is_cancelled() {
            tracing::warn!("Build cancelled");
            return Err(BuildError::Cancelled);
        }
        Ok(())
    }

    /// Parse, render and annotate one candidate.
    fn process(&self, candidate: Result<SourceFile, LoadError>) -> Outcome {
        let source = match candidate {
            Ok(source) => source,
            Err(e) => {
                let label = match &e {
                    LoadError::Io { path, .. } => source_label(
                        path.strip_prefix(&self.config.content_dir).unwrap_or(path),
                    ),
                    LoadError::RootNotFound(path) => source_label(path),
                    LoadError::Walk(_) => self.config.content_dir.display().to_string(),
                };
                return Outcome::Failed {
                    source: label,
                    kind: ErrorKind::Io,
                    message: e.to_string(),
                };
            }
        };

        let label = source_label(&source.relative_path);

        let document = match source.into_document() {
            Ok(document) => document,
            Err(e) => {
                return Outcome::Failed {
                    source: label,
                    kind: ErrorKind::Metadata,
                    message: e.to_string(),
                }
            }
        };

        if document.is_draft() && !self.config.drafts {
            tracing::debug!("Skipping draft {}", label);
            return Outcome::Draft;
        }

        let mut rendered = match document.render() {
            Ok(rendered) => rendered,
            Err(e) => {
                return Outcome::Failed {
                    source: label,
                    kind: ErrorKind::Render,
                    message: e.to_string(),
                }
            }
        };

        let warnings = self.annotator.annotate(&mut rendered.tree);
        tracing::debug!("Rendered {} as {}", label, document.slug);

        Outcome::Rendered(RenderedDocument { document, rendered }, warnings)
    }

    /// Record outcomes in path order and keep the first document per slug.
    fn collect(
        &self,
        outcomes: impl Iterator<Item = Outcome>,
        report: &mut ReportBuilder,
    ) -> Vec<RenderedDocument> {
        let mut documents = Vec::new();
        let mut owners: HashMap<String, String> = HashMap::new();

        for outcome in outcomes {
            match outcome {
                Outcome::Rendered(doc, warnings) => {
                    let label = source_label(&doc.document.relative_path);
                    for warning in warnings {
                        report.warning(label.clone(), warning.to_string());
                    }

                    if let Some(reason) = reserved_slug(&doc.document.slug) {
                        report.error(label, ErrorKind::Metadata, reason);
                        continue;
                    }

                    if let Some(first) = owners.get(&doc.document.slug) {
                        let e = MetadataError::DuplicateSlug {
                            slug: doc.document.slug.clone(),
                            first: first.clone(),
                        };
                        report.error(label, ErrorKind::Metadata, e.to_string());
                        continue;
                    }

                    owners.insert(doc.document.slug.clone(), label);
                    documents.push(doc);
                }
                Outcome::Draft => report.draft_skipped(),
                Outcome::Failed {
                    source,
                    kind,
                    message,
                } => report.error(source, kind, message),
            }
        }

        documents
    }

    /// Images rooted at `/` must exist in the static directory.
    fn check_images(&self, site: &Site, report: &mut ReportBuilder) {
        let Some(static_dir) = &self.config.static_dir else {
            return;
        };

        for page in &site.pages {
            for src in page.tree.images() {
                if !src.starts_with('/') || src.starts_with("//") {
                    continue;
                }
                let relative = src.split(['?', '#']).next().unwrap_or(src);
                if !static_dir.join(relative.trim_start_matches('/')).is_file() {
                    report.error(
                        source_label(&page.document.relative_path),
                        ErrorKind::Asset,
                        format!("image {} not found in {}", src, static_dir.display()),
                    );
                }
            }
        }
    }

    /// Render every page, listing and tag artifact.
    fn render_site(&self, site: &Site) -> Result<Vec<Artifact>, BuildError> {
        let mut artifacts: Vec<Artifact> = site
            .pages
            .par_iter()
            .map(|page| self.render_page(page))
            .collect::<Result<_, _>>()?;

        for listing in site.listings.iter().chain(&site.tag_listings) {
            artifacts.push(self.render_listing(listing)?);
        }

        let tags = TagsContext {
            site: &self.site,
            title: "Tags".to_string(),
            tags: site
                .tags
                .iter()
                .map(|t| TagSummary {
                    name: t.name.clone(),
                    url: t.url.clone(),
                    count: t.pages.len(),
                })
                .collect(),
        };
        let html = self
            .templates
            .render_tags(&tags)
            .map_err(|e| template_error("tags.html", e))?;
        artifacts.push(Artifact {
            path: PathBuf::from("tags").join("index.html"),
            html,
        });

        ensure_unique_paths(&artifacts)?;
        Ok(artifacts)
    }

    fn render_page(&self, page: &Page) -> Result<Artifact, BuildError> {
        let document = &page.document;

        let context = PageContext {
            site: &self.site,
            title: page.title(),
            description: document.description().map(str::to_string),
            date: document.date().map(|d| d.format("%B %-d, %Y").to_string()),
            date_iso: document.date().map(|d| d.to_rfc3339()),
            draft: page.is_draft(),
            tags: page.tags.clone(),
            toc: page
                .toc
                .iter()
                .map(|e| TocItem {
                    title: e.title.clone(),
                    id: e.id.clone(),
                    level: e.level,
                })
                .collect(),
            content: page.tree.to_html(),
            prev: page.prev.clone(),
            next: page.next.clone(),
            params: minijinja::Value::from_serialize(&document.frontmatter.extra),
            diagram_script: self.diagram_script(page),
        };

        let html = self
            .templates
            .render_page(&context)
            .map_err(|e| template_error("page.html", e))?;

        Ok(Artifact {
            path: page.output_path.clone(),
            html,
        })
    }

    fn render_listing(&self, listing: &ListingPage) -> Result<Artifact, BuildError> {
        let html = self
            .templates
            .render_listing(&ListingContext {
                site: &self.site,
                title: listing.title.clone(),
                entries: &listing.entries,
                number: listing.number,
                total: listing.total,
                prev_url: listing.prev_url.clone(),
                next_url: listing.next_url.clone(),
            })
            .map_err(|e| template_error("list.html", e))?;

        Ok(Artifact {
            path: listing.output_path.clone(),
            html,
        })
    }

    /// The client script is only needed when a mermaid fence was handed to it.
    fn diagram_script(&self, page: &Page) -> Option<String> {
        let DiagramMode::Client { script } = &self.config.diagrams else {
            return None;
        };

        let mut needed = false;
        page.tree.for_each_fence(|fence| {
            needed |= fence.kind == FenceKind::Diagram(DiagramEngine::Mermaid)
                && fence.markup.is_some();
        });

        needed.then(|| script.clone())
    }

    /// Write the stylesheet, the static directory and declared assets.
    fn write_assets(&self, report: &mut ReportBuilder) -> Result<(), BuildError> {
        let output_dir = &self.config.output_dir;

        let css = AssetPipeline::generate_css();
        let css = if self.config.minify {
            AssetPipeline::minify_css(&css).unwrap_or(css)
        } else {
            css
        };
        write_file(&output_dir.join("assets").join("main.css"), css.as_bytes())?;
        report.artifacts(1);

        if let Some(static_dir) = &self.config.static_dir {
            if static_dir.is_dir() {
                let copied = AssetPipeline::copy_tree(static_dir, output_dir, self.config.minify)
                    .map_err(|e| BuildError::Write {
                        path: e.path,
                        source: e.source,
                    })?;
                tracing::debug!("Copied {} static files", copied);
                report.artifacts(copied);
            } else {
                tracing::debug!("No static directory at {}", static_dir.display());
            }
        }

        for asset in &self.config.assets {
            let label = asset.display().to_string();
            let Some(name) = asset.file_name() else {
                report.error(label, ErrorKind::Asset, "asset path has no file name");
                continue;
            };

            let copied = if asset.is_dir() {
                AssetPipeline::copy_tree(asset, &output_dir.join(name), self.config.minify)
            } else if asset.is_file() {
                AssetPipeline::copy_file(asset, &output_dir.join(name), self.config.minify)
                    .map(|_| 1)
            } else {
                report.error(label, ErrorKind::Asset, "declared asset not found");
                continue;
            };

            let copied = copied.map_err(|e| BuildError::Write {
                path: e.path,
                source: e.source,
            })?;
            report.artifacts(copied);
        }

        Ok(())
    }
}

/// Every artifact owns its output path.
fn ensure_unique_paths(artifacts: &[Artifact]) -> Result<(), BuildError> {
    let mut paths = HashSet::new();
    match artifacts.iter().find(|a| !paths.insert(&a.path)) {
        Some(artifact) => Err(BuildError::Collision(artifact.path.clone())),
        None => Ok(()),
    }
}

/// Slugs that would overwrite generated listings.
fn reserved_slug(slug: &str) -> Option<String> {
    let first = slug.split('/').next().unwrap_or(slug);
    match first {
        "" => Some("empty slug collides with the home listing".to_string()),
        "tags" | "page" | "assets" => Some(format!(
            "slug `{}` collides with the generated `{}/` section",
            slug, first
        )),
        _ => None,
    }
}

fn source_label(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| write_error(path, e))
}

fn write_error(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn template_error(template: &str, e: minijinja::Error) -> BuildError {
    BuildError::Template {
        template: template.to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    const FIRST_POST: &str = r#"---
title: "First Post"
date: 2024-01-15T10:00:00Z
tags: ["hugo", "papermod"]
---

| A | B |
|---|---|
| 1 | 2 |

```go
package main
```

```mermaid
graph LR
  A --> B
```
"#;

    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempdir().unwrap();
            fs::create_dir_all(temp.path().join("content")).unwrap();
            Self { temp }
        }

        fn write(&self, relative: &str, contents: &str) -> &Self {
            let path = self.temp.path().join("content").join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
            self
        }

        fn out(&self) -> PathBuf {
            self.temp.path().join("public")
        }

        fn config(&self) -> BuildConfig {
            BuildConfig {
                content_dir: self.temp.path().join("content"),
                output_dir: self.out(),
                static_dir: Some(self.temp.path().join("static")),
                ..Default::default()
            }
        }

        fn read(&self, relative: &str) -> String {
            fs::read_to_string(self.out().join(relative)).unwrap()
        }
    }

    #[test]
    fn builds_first_post() {
        let fixture = Fixture::new();
        fixture.write("posts/first-post.md", FIRST_POST);

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert!(report.is_success(), "{:?}", report.errors);
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].slug, "posts/first-post");
        assert_eq!(report.processed[0].output, "posts/first-post/index.html");

        let html = fixture.read("posts/first-post/index.html");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>A</th>"));
        assert!(html.contains("<td>2</td>"));
        assert!(html.contains("package"));
        assert!(html.contains(r#"<pre class="mermaid diagram" data-engine="mermaid">"#));
        assert!(html.contains("mermaid.initialize"));

        let tags = fixture.read("tags/index.html");
        assert!(tags.contains(r#"<a href="/tags/hugo/">hugo</a>"#));
        assert!(tags.contains(r#"<a href="/tags/papermod/">papermod</a>"#));
        assert!(fixture.read("tags/hugo/index.html").contains("/posts/first-post/"));
        assert!(fixture.read("index.html").contains("First Post"));
        assert!(fixture.out().join("assets/main.css").exists());
    }

    #[test]
    fn partial_failure_keeps_other_documents() {
        let fixture = Fixture::new();
        fixture
            .write("a.md", "---\ntitle: A\n---\nfine\n")
            .write("b.md", "---\ntitle: B\n---\n```go\nfunc main() {\n")
            .write("c.md", "---\ntitle: C\n---\nalso fine\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert!(!report.is_success());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, "b.md");
        assert_eq!(report.errors[0].kind, ErrorKind::Render);
        assert!(report.errors[0].message.contains("never closed"));
        assert_eq!(report.processed.len(), 2);
        assert!(fixture.out().join("a/index.html").exists());
        assert!(fixture.out().join("c/index.html").exists());
        assert!(!fixture.out().join("b/index.html").exists());
    }

    #[test]
    fn metadata_errors_are_recorded() {
        let fixture = Fixture::new();
        fixture
            .write("bad.md", "---\ntitle: [unclosed\n---\nbody\n")
            .write("good.md", "body\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::Metadata);
        assert_eq!(report.processed.len(), 1);
    }

    #[test]
    fn drafts_are_skipped_unless_previewing() {
        let fixture = Fixture::new();
        fixture
            .write("live.md", "---\ndate: 2024-01-01\n---\nlive\n")
            .write("wip.md", "---\ndraft: true\n---\nwip\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();
        assert_eq!(report.drafts_skipped, 1);
        assert!(!fixture.out().join("wip/index.html").exists());

        let preview = BuildConfig {
            drafts: true,
            clean: true,
            ..fixture.config()
        };
        let report = StaticBuilder::new(preview).build().unwrap();

        assert_eq!(report.drafts_skipped, 0);
        let wip = fixture.read("wip/index.html");
        assert!(wip.contains("draft-badge"));
        assert!(!wip.contains(r#"rel="prev""#));
        assert!(!fixture.read("index.html").contains("/wip/"));
    }

    #[test]
    fn rebuilds_are_byte_identical() {
        let fixture = Fixture::new();
        fixture
            .write("posts/first-post.md", FIRST_POST)
            .write("posts/second.md", "---\ndate: 2024-02-01\ntags: [Hugo]\n---\n# Hi\n");

        let snapshot = |fixture: &Fixture| -> BTreeMap<PathBuf, Vec<u8>> {
            walkdir::WalkDir::new(fixture.out())
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
                .collect()
        };

        let first_report = StaticBuilder::new(fixture.config()).build().unwrap();
        let first = snapshot(&fixture);
        let second_report = StaticBuilder::new(fixture.config()).build().unwrap();
        let second = snapshot(&fixture);

        assert_eq!(first.keys().collect::<Vec<_>>(), second.keys().collect::<Vec<_>>());
        assert!(first == second);

        assert_eq!(first_report.processed, second_report.processed);
        assert_eq!(first_report.errors, second_report.errors);
        assert_eq!(first_report.warnings, second_report.warnings);
        assert_eq!(first_report.drafts_skipped, second_report.drafts_skipped);
        assert_eq!(first_report.artifacts, second_report.artifacts);
    }

    #[test]
    fn duplicate_slugs_keep_the_first_in_path_order() {
        let fixture = Fixture::new();
        fixture
            .write("a.md", "---\nslug: same\n---\nfirst\n")
            .write("b.md", "---\nslug: same\n---\nsecond\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, "b.md");
        assert!(report.errors[0].message.contains("a.md"));
        assert!(fixture.read("same/index.html").contains("first"));
    }

    #[test]
    fn reserved_slugs_are_rejected() {
        let fixture = Fixture::new();
        fixture.write("tags.md", "shadowing the tag index\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::Metadata);
    }

    #[test]
    fn empty_slug_does_not_replace_the_home_listing() {
        let fixture = Fixture::new();
        fixture
            .write("a.md", "---\nslug: \"/\"\ntitle: Alpha\n---\nalpha body\n")
            .write("b.md", "---\ntitle: Beta\n---\nbeta body\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, "a.md");
        assert_eq!(report.errors[0].kind, ErrorKind::Metadata);
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].slug, "b");
        let home = fixture.read("index.html");
        assert!(home.contains("Beta"));
        assert!(!home.contains("alpha body"));
    }

    #[test]
    fn colliding_artifact_paths_are_refused() {
        let artifact = |path: &str| Artifact {
            path: PathBuf::from(path),
            html: String::new(),
        };

        assert!(ensure_unique_paths(&[artifact("a/index.html"), artifact("index.html")]).is_ok());

        let err = ensure_unique_paths(&[
            artifact("index.html"),
            artifact("b/index.html"),
            artifact("index.html"),
        ])
        .unwrap_err();

        assert!(matches!(err, BuildError::Collision(path) if path == PathBuf::from("index.html")));
    }

    #[test]
    fn missing_images_are_asset_errors() {
        let fixture = Fixture::new();
        fixture.write("a.md", "![logo](/images/logo.png)\n\n![remote](https://example.com/x.png)\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::Asset);
        assert!(fixture.out().join("a/index.html").exists());

        let static_images = fixture.temp.path().join("static/images");
        fs::create_dir_all(&static_images).unwrap();
        fs::write(static_images.join("logo.png"), b"png").unwrap();

        let report = StaticBuilder::new(fixture.config()).build().unwrap();
        assert!(report.is_success());
        assert!(fixture.out().join("images/logo.png").exists());
    }

    #[test]
    fn missing_declared_asset_is_recorded() {
        let fixture = Fixture::new();
        fixture.write("a.md", "body\n");
        let config = BuildConfig {
            assets: vec![fixture.temp.path().join("nope.css")],
            ..fixture.config()
        };

        let report = StaticBuilder::new(config).build().unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::Asset);
    }

    #[test]
    fn unknown_fence_kind_is_a_warning() {
        let fixture = Fixture::new();
        fixture.write("a.md", "```klingon\nQapla'\n```\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert!(report.is_success());
        assert_eq!(report.warnings.len(), 1);
        assert!(fixture.read("a/index.html").contains("Qapla&#39;"));
    }

    #[test]
    fn client_mode_leaves_non_mermaid_diagrams_plain() {
        let fixture = Fixture::new();
        fixture.write("a.md", "```dot\ndigraph { a -> b }\n```\n");

        let report = StaticBuilder::new(fixture.config()).build().unwrap();

        assert!(report.is_success());
        assert_eq!(report.warnings.len(), 1);
        let html = fixture.read("a/index.html");
        assert!(html.contains(r#"<pre><code class="language-dot">"#));
        assert!(!html.contains("mermaid.initialize"));
    }

    #[test]
    fn held_lock_is_fatal() {
        let fixture = Fixture::new();
        let _lock = OutputLock::acquire(&fixture.out()).unwrap();

        let result = StaticBuilder::new(fixture.config()).build();

        assert!(matches!(result, Err(BuildError::Locked(_))));
    }

    #[test]
    fn missing_content_root_is_fatal() {
        let fixture = Fixture::new();
        let config = BuildConfig {
            content_dir: fixture.temp.path().join("missing"),
            ..fixture.config()
        };

        let result = StaticBuilder::new(config).build();

        assert!(matches!(
            result,
            Err(BuildError::Content(LoadError::RootNotFound(_)))
        ));
    }

    #[test]
    fn cancelled_build_stops() {
        let fixture = Fixture::new();
        fixture.write("a.md", "body\n");
        let builder = StaticBuilder::new(fixture.config());
        builder.cancel_flag().cancel();

        assert!(matches!(builder.build(), Err(BuildError::Cancelled)));
        assert!(!fixture.out().join("a/index.html").exists());
    }

    #[test]
    fn clean_removes_stale_output() {
        let fixture = Fixture::new();
        fixture.write("a.md", "body\n");
        fs::create_dir_all(fixture.out()).unwrap();
        fs::write(fixture.out().join("stale.html"), "old").unwrap();

        let config = BuildConfig {
            clean: true,
            ..fixture.config()
        };
        StaticBuilder::new(config).build().unwrap();

        assert!(!fixture.out().join("stale.html").exists());
        assert!(fixture.out().join("a/index.html").exists());
    }
}
