//! Site build command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use folio_static::{BuildReport, PublishOutcome, StaticBuilder};

use crate::config::{project_root, BuildOverrides, ConfigFile};

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Output directory (defaults to config or "public")
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include draft documents as standalone pages
    #[arg(long)]
    drafts: bool,

    /// Skip CSS minification
    #[arg(long)]
    no_minify: bool,

    /// Empty the output directory first
    #[arg(long)]
    clean: bool,

    /// Deploy to the configured target if the build has no errors
    #[arg(long)]
    publish: bool,

    /// Write the build report as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

/// Run the build command. Returns whether the build finished without errors.
pub async fn run(config_path: &Path, args: BuildArgs) -> Result<bool> {
    let file = ConfigFile::load(config_path)?;
    let root = project_root(config_path);

    let config = file.build_config(
        &root,
        &BuildOverrides {
            output: args.output,
            drafts: args.drafts,
            minify: args.no_minify.then_some(false),
            clean: args.clean,
        },
    );
    let output_root = config.output_dir.clone();

    let builder = StaticBuilder::new(config);
    let cancel = builder.cancel_flag();

    let task = tokio::task::spawn_blocking(move || builder.build());
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current documents...");
            cancel.cancel();
        }
    });
    let joined = task.await;
    interrupt.abort();
    let report = joined.context("Build task failed")??;

    print_report(&report);

    if let Some(path) = &args.report {
        let json = report.to_json().context("Failed to serialize build report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Wrote report to {}", path.display());
    }

    if args.publish {
        let Some(trigger) = file.publish_trigger(&root) else {
            bail!("--publish needs a [deploy] command or directory in {}", config_path.display());
        };

        let published = report.clone();
        let outcome = tokio::task::spawn_blocking(move || trigger.publish(&published, &output_root))
            .await
            .context("Publish task failed")??;

        match outcome {
            PublishOutcome::Deployed { target } => tracing::info!("Published via {}", target),
            PublishOutcome::Skipped { errors } => {
                tracing::warn!("Skipped publishing because of {} error(s)", errors)
            }
        }
    }

    Ok(report.is_success())
}

fn print_report(report: &BuildReport) {
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }

    for error in &report.errors {
        tracing::error!("{}", error);
    }

    tracing::info!(
        "Built {} pages, {} artifacts, {} drafts skipped in {}ms",
        report.processed.len(),
        report.artifacts,
        report.drafts_skipped,
        report.duration_ms
    );

    if report.is_success() {
        tracing::info!("Output: {}", report.output_dir.display());
    } else {
        tracing::error!("Build finished with {} error(s)", report.errors.len());
    }
}
