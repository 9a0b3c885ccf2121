//! depfix — automated dependency-vulnerability remediation.
//!
//! ## Commands
//!
//! - `run`: fetch active scanner alerts and open one fix PR per
//!   remediable alert, under hard safety limits
//! - `locate`: list the dependency manifests a run would consider

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use depfix_core::{
    locate_manifests, write_summary_artifact, DepfixError, RemediationOrchestrator, RunConfig,
    RunReporter, RunStatus, RunSummary, Severity,
};
use depfix_hosts::{AdvSecAlertSource, DevOpsGitHost, PipResolver, PipResolverConfig};

#[derive(Parser)]
#[command(name = "depfix")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Automated dependency-vulnerability remediation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch active alerts and open fix pull requests
    Run {
        /// Inclusive severity floor for candidate alerts
        #[arg(long, default_value = "high")]
        severity: Severity,

        /// Maximum pull requests to create this run
        #[arg(long, default_value_t = 10)]
        max_prs: u32,

        /// Validate everything but never write to the remote host
        #[arg(long)]
        dry_run: bool,

        /// Repository checkout to scan for manifests
        #[arg(long, default_value = ".")]
        repo_root: PathBuf,

        /// Branch fix branches are created from and PRs target
        #[arg(long, default_value = "main")]
        base_branch: String,

        /// Directory receiving summary.json and its digest
        #[arg(long, default_value = ".depfix")]
        summary_out: PathBuf,
    },

    /// List the dependency manifests a run would consider
    Locate {
        /// Repository checkout to scan
        #[arg(long, default_value = ".")]
        repo_root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    depfix_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            severity,
            max_prs,
            dry_run,
            repo_root,
            base_branch,
            summary_out,
        } => {
            cmd_run(
                severity,
                max_prs,
                dry_run,
                &repo_root,
                base_branch,
                &summary_out,
            )
            .await
        }
        Commands::Locate { repo_root } => cmd_locate(&repo_root),
    }
}

async fn cmd_run(
    severity: Severity,
    max_prs: u32,
    dry_run: bool,
    repo_root: &Path,
    base_branch: String,
    summary_out: &Path,
) -> Result<()> {
    let source = AdvSecAlertSource::from_env().context("Failed to configure the alert source")?;
    let vcs = DevOpsGitHost::from_env().context("Failed to configure the git host")?;
    let resolver = PipResolver::new(PipResolverConfig::new(repo_root));

    let mut config = RunConfig::new(repo_root);
    config.base_branch = base_branch;
    config.severity_floor = severity;
    config.dry_run = dry_run;
    config.limits.max_prs = max_prs;

    let orchestrator = RemediationOrchestrator::new(&source, &vcs, &resolver, config);
    match orchestrator.run().await {
        Ok(summary) => {
            let path = write_summary_artifact(summary_out, &summary)
                .context("Failed to write the run summary artifact")?;
            info!(event = "summary.written", path = %path.display());
            print_summary(&summary);
            Ok(())
        }
        Err(err @ DepfixError::FetchFailed(_)) => {
            // Persist a failed-run artifact so the outcome is visible to
            // pipelines that only read summaries, then exit non-zero.
            let summary = RunReporter::new(dry_run).finish(RunStatus::FetchFailed);
            if let Err(write_err) = write_summary_artifact(summary_out, &summary) {
                tracing::warn!(event = "summary.write_failed", error = %write_err);
            }
            Err(err).context("Alert fetch failed; no alerts were processed")
        }
        Err(err) => Err(err.into()),
    }
}

fn print_summary(summary: &RunSummary) {
    let mode = if summary.dry_run { " (dry run)" } else { "" };
    println!("Run completed{mode}");
    println!("  alerts found:    {}", summary.alerts_found);
    println!("  matching filter: {}", summary.alerts_matching_filter);
    println!("  PRs created:     {}", summary.prs_created);
    for (reason, count) in &summary.skipped {
        println!("  skipped {reason}: {count}");
    }
}

fn cmd_locate(repo_root: &Path) -> Result<()> {
    let manifests = locate_manifests(repo_root);
    if manifests.is_empty() {
        println!("No dependency manifests found under {}", repo_root.display());
        return Ok(());
    }
    for manifest in manifests {
        println!("{}\t{}", manifest.dialect.as_str(), manifest.path.display());
    }
    Ok(())
}
