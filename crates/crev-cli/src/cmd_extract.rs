use crate::{finish, open_workspace};
use crev_core::CancellationToken;
use crev_extract::{extract_batch, ExtractTarget, GitCli};
use std::path::Path;

pub fn execute(cwd: &Path, json: bool, cancel: &CancellationToken) -> anyhow::Result<()> {
    let (ws, config) = open_workspace(cwd)?;
    let targets: Vec<ExtractTarget> = config
        .repos
        .iter()
        .map(|entry| {
            let repo = entry.key();
            ExtractTarget {
                clone_dir: ws.repo_dir(&repo),
                prs: entry.pr_numbers(),
                repo,
            }
        })
        .filter(|t| !t.prs.is_empty())
        .collect();

    let base = config.base_branch.as_str();
    let report = extract_batch(
        &ws,
        &targets,
        |t| GitCli::new(&t.clone_dir, base),
        config.workers(),
        cancel,
    );
    finish("extract", &report, json)
}
