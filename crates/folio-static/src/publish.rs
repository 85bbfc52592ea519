//! Publishing a finished build to a deployment target.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::assets::{AssetError, AssetPipeline};
use crate::report::BuildReport;

/// Environment variable carrying the output root to deploy commands.
pub const OUTPUT_ROOT_ENV: &str = "FOLIO_OUTPUT_ROOT";

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("deploy command is empty")]
    EmptyCommand,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    #[error("failed to copy {0}")]
    Copy(#[from] AssetError),
}

/// Somewhere a built site can be shipped to.
pub trait DeployTarget: Send + Sync {
    /// Short description for logs
    fn describe(&self) -> String;

    fn deploy(&self, output_root: &Path) -> Result<(), DeployError>;
}

/// Runs a program, e.g. `rsync -a {output}/ host:/srv/www`.
///
/// Every `{output}` in the arguments is replaced by the output root.
#[derive(Debug, Clone)]
pub struct CommandTarget {
    argv: Vec<String>,
}

impl CommandTarget {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl DeployTarget for CommandTarget {
    fn describe(&self) -> String {
        self.argv.join(" ")
    }

    fn deploy(&self, output_root: &Path) -> Result<(), DeployError> {
        let (program, args) = self.argv.split_first().ok_or(DeployError::EmptyCommand)?;
        let root = output_root.to_string_lossy();

        let status = Command::new(program)
            .args(args.iter().map(|a| a.replace("{output}", &root)))
            .env(OUTPUT_ROOT_ENV, output_root)
            .status()
            .map_err(|source| DeployError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(DeployError::Failed {
                program: program.clone(),
                status,
            });
        }

        Ok(())
    }
}

/// Copies the output root into another directory, such as a `gh-pages` worktree.
///
/// Existing files are overwritten; files absent from the build are left alone.
#[derive(Debug, Clone)]
pub struct DirectoryTarget {
    dest: PathBuf,
}

impl DirectoryTarget {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }
}

impl DeployTarget for DirectoryTarget {
    fn describe(&self) -> String {
        self.dest.display().to_string()
    }

    fn deploy(&self, output_root: &Path) -> Result<(), DeployError> {
        let copied = AssetPipeline::copy_tree(output_root, &self.dest, false)?;
        tracing::info!("Copied {} files to {}", copied, self.dest.display());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Deployed { target: String },
    /// The build recorded errors, so nothing was deployed
    Skipped { errors: usize },
}

/// Deploys a build only when it finished without errors.
pub struct PublishTrigger {
    target: Box<dyn DeployTarget>,
}

impl PublishTrigger {
    pub fn new(target: impl DeployTarget + 'static) -> Self {
        Self {
            target: Box::new(target),
        }
    }

    pub fn publish(
        &self,
        report: &BuildReport,
        output_root: &Path,
    ) -> Result<PublishOutcome, DeployError> {
        if !report.is_success() {
            tracing::warn!(
                "Not publishing: build recorded {} error(s)",
                report.errors.len()
            );
            return Ok(PublishOutcome::Skipped {
                errors: report.errors.len(),
            });
        }

        let target = self.target.describe();
        tracing::info!("Publishing {} via {}", output_root.display(), target);
        self.target.deploy(output_root)?;

        Ok(PublishOutcome::Deployed { target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ErrorKind, ReportBuilder};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct Recording {
        calls: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl DeployTarget for Recording {
        fn describe(&self) -> String {
            "recording".to_string()
        }

        fn deploy(&self, output_root: &Path) -> Result<(), DeployError> {
            self.calls.lock().unwrap().push(output_root.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn deploys_clean_builds() {
        let target = Recording::default();
        let trigger = PublishTrigger::new(target.clone());
        let report = ReportBuilder::start().finish(PathBuf::from("public"));

        let outcome = trigger.publish(&report, Path::new("public")).unwrap();

        assert_eq!(
            outcome,
            PublishOutcome::Deployed {
                target: "recording".to_string()
            }
        );
        assert_eq!(*target.calls.lock().unwrap(), vec![PathBuf::from("public")]);
    }

    #[test]
    fn skips_builds_with_errors() {
        let target = Recording::default();
        let trigger = PublishTrigger::new(target.clone());
        let mut builder = ReportBuilder::start();
        builder.error("a.md", ErrorKind::Render, "bad table");
        let report = builder.finish(PathBuf::from("public"));

        let outcome = trigger.publish(&report, Path::new("public")).unwrap();

        assert_eq!(outcome, PublishOutcome::Skipped { errors: 1 });
        assert!(target.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn directory_target_mirrors_output() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("public");
        let dest = temp.path().join("pages");
        fs::create_dir_all(out.join("posts/a")).unwrap();
        fs::write(out.join("index.html"), "home").unwrap();
        fs::write(out.join("posts/a/index.html"), "a").unwrap();

        DirectoryTarget::new(&dest).deploy(&out).unwrap();

        assert_eq!(fs::read_to_string(dest.join("posts/a/index.html")).unwrap(), "a");
    }

    #[test]
    fn empty_command_is_rejected() {
        let result = CommandTarget::new(vec![]).deploy(Path::new("public"));

        assert!(matches!(result, Err(DeployError::EmptyCommand)));
    }

    #[cfg(unix)]
    #[test]
    fn command_target_substitutes_output_root() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join("marker");
        let target = CommandTarget::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("echo \"$1 $FOLIO_OUTPUT_ROOT\" > {}", marker.display()),
            "sh".to_string(),
            "{output}".to_string(),
        ]);

        target.deploy(Path::new("/tmp/site")).unwrap();

        assert_eq!(
            fs::read_to_string(&marker).unwrap().trim(),
            "/tmp/site /tmp/site"
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_an_error() {
        let result = CommandTarget::new(vec!["false".to_string()]).deploy(Path::new("public"));

        assert!(matches!(result, Err(DeployError::Failed { .. })));
    }
}
