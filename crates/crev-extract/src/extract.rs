//! Materialize pull request snapshots into the workspace.
//!
//! For each PR the extractor writes `code/initial/<path>` and
//! `code/final/<path>` for every changed path, then the unified diff.
//! The diff goes last, so its presence means the PR was fully extracted
//! and a later run skips it without touching git.

use crate::diff::changed_paths;
use crate::git::{GitError, GitQuery};
use crev_core::{
    run_batch, validate_relative, write_atomic, BatchReport, CancellationToken, FailureKind,
    ItemOutcome, PrKey, RepoKey, Workspace,
};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractError::Git(GitError::RefNotFound(_)) => FailureKind::NotFound,
            _ => FailureKind::Io,
        }
    }
}

/// One changed path with its content on each side. At least one side is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub initial: Option<Vec<u8>>,
    pub final_: Option<Vec<u8>>,
}

impl FileChange {
    /// `None` when the path exists on neither side.
    pub fn new(path: String, initial: Option<Vec<u8>>, final_: Option<Vec<u8>>) -> Option<Self> {
        if initial.is_none() && final_.is_none() {
            return None;
        }
        Some(Self {
            path,
            initial,
            final_,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrExtraction {
    /// The diff file already existed.
    Skipped,
    Extracted { files: usize, omitted: usize },
}

/// A repository's clone plus the PRs to extract from it.
#[derive(Debug, Clone)]
pub struct ExtractTarget {
    pub repo: RepoKey,
    pub clone_dir: PathBuf,
    pub prs: Vec<u64>,
}

/// Extract a single PR. Idempotent: an existing diff file short-circuits.
pub fn extract_pr<G: GitQuery>(
    ws: &Workspace,
    git: &G,
    key: &PrKey,
) -> Result<PrExtraction, ExtractError> {
    let diff_path = ws.resolve(&key.diff());
    if diff_path.is_file() {
        tracing::debug!(pr = %key, "already extracted");
        return Ok(PrExtraction::Skipped);
    }

    let refs = git.pr_refs(key.number)?;
    let diff = git.diff(&refs.base, &refs.head)?;

    let mut changes = Vec::new();
    let mut omitted = 0;
    for path in changed_paths(&diff) {
        if let Err(e) = validate_relative(&path) {
            tracing::warn!(pr = %key, error = %e, "skipping unsafe path from diff");
            omitted += 1;
            continue;
        }
        let initial = git.read_file_at(&refs.base, &path)?;
        let final_ = git.read_file_at(&refs.head, &path)?;
        match FileChange::new(path, initial, final_) {
            Some(change) => changes.push(change),
            None => {
                tracing::warn!(pr = %key, "changed path absent at both revisions");
                omitted += 1;
            }
        }
    }

    for change in &changes {
        if let Some(bytes) = &change.initial {
            write(ws.resolve(&key.initial(&change.path)), bytes)?;
        }
        if let Some(bytes) = &change.final_ {
            write(ws.resolve(&key.final_(&change.path)), bytes)?;
        }
    }
    write(diff_path, diff.as_bytes())?;

    tracing::info!(pr = %key, files = changes.len(), omitted, "extracted");
    Ok(PrExtraction::Extracted {
        files: changes.len(),
        omitted,
    })
}

fn write(path: PathBuf, bytes: &[u8]) -> Result<(), ExtractError> {
    write_atomic(&path, bytes).map_err(|source| ExtractError::Write { path, source })
}

/// Extract every PR of every target on a bounded pool.
/// One PR's failure never stops the others.
pub fn extract_batch<G, F>(
    ws: &Workspace,
    targets: &[ExtractTarget],
    git_for: F,
    workers: usize,
    cancel: &CancellationToken,
) -> BatchReport
where
    G: GitQuery,
    F: Fn(&ExtractTarget) -> G + Sync,
{
    let jobs: Vec<(&ExtractTarget, PrKey)> = targets
        .iter()
        .flat_map(|t| t.prs.iter().map(move |n| (t, t.repo.pr(*n))))
        .collect();

    run_batch(
        &jobs,
        |(_, key)| key.to_string(),
        workers,
        cancel,
        |(target, key)| {
            if !target.clone_dir.is_dir() {
                return ItemOutcome::failed(
                    key,
                    FailureKind::NotFound,
                    format!("clone not found at {}", target.clone_dir.display()),
                );
            }
            let git = git_for(target);
            match extract_pr(ws, &git, key) {
                Ok(PrExtraction::Skipped) => ItemOutcome::skipped(key, "already extracted"),
                Ok(PrExtraction::Extracted { files, omitted }) => {
                    let detail = if omitted > 0 {
                        format!("{files} files, {omitted} omitted")
                    } else {
                        format!("{files} files")
                    };
                    ItemOutcome::done(key, detail)
                }
                Err(e) => {
                    tracing::warn!(pr = %key, error = %e, "extraction failed");
                    ItemOutcome::failed(key, e.kind(), e.to_string())
                }
            }
        },
    )
}
