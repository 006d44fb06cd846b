use crate::{finish, open_workspace};
use crev_core::CancellationToken;
use crev_extract::{pull_all, PullTarget};
use std::path::Path;

pub fn execute(cwd: &Path, json: bool, cancel: &CancellationToken) -> anyhow::Result<()> {
    let (ws, config) = open_workspace(cwd)?;
    let targets: Vec<PullTarget> = config
        .repos
        .iter()
        .map(|entry| PullTarget::from_entry(&ws, entry))
        .collect();
    tracing::info!(repos = targets.len(), "pulling");
    let report = pull_all(&targets, &config.base_branch, config.workers(), cancel);
    finish("pull", &report, json)
}
