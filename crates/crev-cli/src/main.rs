mod cmd_export;
mod cmd_extract;
mod cmd_import;
mod cmd_init;
mod cmd_pull;
mod cmd_sum;

use anyhow::bail;
use clap::{Parser, Subcommand};
use crev_core::{BatchReport, CancellationToken, Workspace, WorkspaceConfig};
use serde::Serialize;
use std::path::Path;

#[derive(Parser)]
#[command(
    name = "crev",
    version,
    about = "Pull request and repository review workspaces"
)]
struct Cli {
    /// Log progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new workspace directory with a configs.json template
    Init {
        /// Directory to create
        path: String,
    },
    /// Clone or update configured repositories and fetch their PR branches
    Pull {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract diffs and before/after snapshots for configured PRs
    Extract {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize repositories and pull requests
    Sum {
        /// Write context documents only; do not call the summarizer
        #[arg(long)]
        context_only: bool,
        /// Redo work even when summaries already exist
        #[arg(long)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        #[command(subcommand)]
        target: Option<SumTarget>,
    },
    /// Export workspace files as a txtar archive or a folder copy
    Export {
        /// Output name (without extension)
        #[arg(default_value = cmd_export::DEFAULT_NAME)]
        name: String,
        /// Output format: txtar or folder
        #[arg(long, default_value = "txtar")]
        output: String,
        /// Top-level folders to include (repeatable; default repos and pullrequests)
        #[arg(long = "scope-folders")]
        scope_folders: Vec<String>,
        /// File scope: ai, context, or all
        #[arg(long, default_value = "ai")]
        scope: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge an exported archive or folder into this workspace
    Import {
        /// Path to a .txtar file or an exported folder
        path: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SumTarget {
    /// Summarize repositories
    Repo {
        /// Organization ("." for all)
        org: Option<String>,
        /// Repository ("." for all)
        repo: Option<String>,
    },
    /// Summarize pull requests
    Pr {
        /// Organization ("." for all)
        org: Option<String>,
        /// Repository ("." for all)
        repo: Option<String>,
        /// Pull request number ("." for all)
        pr: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn ctrlc_cancel(cancel: CancellationToken) {
    if let Err(e) = ctrlc::set_handler(move || {
        cancel.cancel();
    }) {
        tracing::warn!(error = %e, "cannot install Ctrl-C handler");
    }
}

/// Workspace rooted at `cwd` plus its parsed config. Fails when `configs.json` is absent.
pub(crate) fn open_workspace(cwd: &Path) -> anyhow::Result<(Workspace, WorkspaceConfig)> {
    let ws = Workspace::discover(cwd);
    let config = WorkspaceConfig::load(&ws)?;
    Ok((ws, config))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a batch report; fail only when every item failed.
pub(crate) fn finish(what: &str, report: &BatchReport, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(report)?;
    } else if report.items.is_empty() {
        println!("Nothing to {what}.");
    } else {
        print!("{}", report.render());
    }
    if report.all_failed() {
        bail!("{what}: every item failed");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cwd = std::env::current_dir()?;

    let cancel = CancellationToken::new();
    ctrlc_cancel(cancel.clone());

    match cli.cmd {
        Command::Init { path } => cmd_init::execute(Path::new(&path)),
        Command::Pull { json } => cmd_pull::execute(&cwd, json, &cancel),
        Command::Extract { json } => cmd_extract::execute(&cwd, json, &cancel),
        Command::Sum {
            context_only,
            force,
            json,
            target,
        } => cmd_sum::execute(cmd_sum::SumParams {
            cwd: &cwd,
            target,
            context_only,
            force,
            json,
            cancel: &cancel,
        }),
        Command::Export {
            name,
            output,
            scope_folders,
            scope,
            json,
        } => cmd_export::execute(&cmd_export::ExportParams {
            cwd: &cwd,
            name: &name,
            output: &output,
            scope_folders,
            scope: &scope,
            json,
        }),
        Command::Import { path, json } => {
            cmd_import::execute(&cwd, Path::new(&path), json, &cancel)
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::Path;

    /// Write `configs.json` so `dir` counts as an initialized workspace.
    pub fn init_workspace(dir: &Path, config: &str) {
        std::fs::write(dir.join("configs.json"), config).unwrap();
    }
}
