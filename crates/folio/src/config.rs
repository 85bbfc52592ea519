//! Configuration file (folio.toml).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use folio_annotate::highlight::DEFAULT_THEME;
use folio_static::builder::DEFAULT_DIAGRAM_SCRIPT;
use folio_static::{BuildConfig, CommandTarget, DiagramMode, DirectoryTarget, PublishTrigger, TagCase};

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub diagrams: DiagramsConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub base_url: String,
    pub description: Option<String>,
    pub language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Site".to_string(),
            base_url: "/".to_string(),
            description: None,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub dir: PathBuf,
    pub extensions: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("content"),
            extensions: vec!["md".to_string(), "markdown".to_string()],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub output: PathBuf,
    pub static_dir: PathBuf,
    pub assets: Vec<PathBuf>,
    pub minify: bool,
    pub paginate: usize,
    pub drafts: bool,
    pub clean: bool,
    pub tag_case: TagCase,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("public"),
            static_dir: PathBuf::from("static"),
            assets: vec![],
            minify: true,
            paginate: 10,
            drafts: false,
            clean: false,
            tag_case: TagCase::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramSetting {
    #[default]
    Client,
    Command,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiagramsConfig {
    pub mode: DiagramSetting,
    /// Script for client mode
    pub script: String,
    /// Engine token to command line, for command mode
    pub commands: BTreeMap<String, Vec<String>>,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            mode: DiagramSetting::default(),
            script: DEFAULT_DIAGRAM_SCRIPT.to_string(),
            commands: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeployConfig {
    pub command: Option<Vec<String>>,
    pub directory: Option<PathBuf>,
}

/// Command-line values that win over the file.
#[derive(Debug, Default)]
pub struct BuildOverrides {
    pub output: Option<PathBuf>,
    pub drafts: bool,
    pub minify: Option<bool>,
    pub clean: bool,
}

impl ConfigFile {
    /// Load the config file, or defaults when it does not exist.
    ///
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve into a build configuration.
    ///
    /// Paths in the file are relative to `root`, the directory holding the file.
    pub fn build_config(&self, root: &Path, overrides: &BuildOverrides) -> BuildConfig {
        let diagrams = match self.diagrams.mode {
            DiagramSetting::Client => DiagramMode::Client {
                script: self.diagrams.script.clone(),
            },
            DiagramSetting::Command => DiagramMode::Command(self.diagrams.commands.clone()),
        };

        BuildConfig {
            content_dir: root.join(&self.content.dir),
            output_dir: overrides
                .output
                .clone()
                .unwrap_or_else(|| root.join(&self.build.output)),
            extensions: self.content.extensions.clone(),
            static_dir: Some(root.join(&self.build.static_dir)),
            assets: self.build.assets.iter().map(|a| root.join(a)).collect(),
            minify: overrides.minify.unwrap_or(self.build.minify),
            base_url: self.site.base_url.clone(),
            title: self.site.title.clone(),
            description: self.site.description.clone(),
            language: self.site.language.clone(),
            paginate: self.build.paginate,
            drafts: overrides.drafts || self.build.drafts,
            clean: overrides.clean || self.build.clean,
            tag_case: self.build.tag_case,
            highlight_theme: self.highlight.theme.clone(),
            diagrams,
        }
    }

    /// The configured deployment target, if any. A command wins over a directory.
    pub fn publish_trigger(&self, root: &Path) -> Option<PublishTrigger> {
        match (&self.deploy.command, &self.deploy.directory) {
            (Some(command), _) => Some(PublishTrigger::new(CommandTarget::new(command.clone()))),
            (None, Some(directory)) => {
                Some(PublishTrigger::new(DirectoryTarget::new(root.join(directory))))
            }
            (None, None) => None,
        }
    }
}

/// Directory that relative paths in the config file resolve against.
pub fn project_root(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
