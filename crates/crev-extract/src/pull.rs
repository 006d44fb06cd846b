//! Clone or update configured repositories and fetch their PR branches.

use crate::git::{pr_branch, GitCli, GitError};
use crev_core::paths::REPO_ARTIFACT_DIR;
use crev_core::{
    run_bounded, BatchReport, CancellationToken, FailureKind, ItemOutcome, RepoEntry, RepoKey,
    Workspace,
};
use std::path::PathBuf;

/// What `pull` needs to know about one configured repository.
#[derive(Debug, Clone)]
pub struct PullTarget {
    pub repo: RepoKey,
    pub url: Option<String>,
    pub clone_dir: PathBuf,
    pub prs: Vec<u64>,
}

impl PullTarget {
    pub fn from_entry(ws: &Workspace, entry: &RepoEntry) -> Self {
        let repo = entry.key();
        Self {
            clone_dir: ws.repo_dir(&repo),
            url: entry.url.clone(),
            prs: entry.pr_numbers(),
            repo,
        }
    }
}

/// Run [`pull_repo`] for every target on a bounded pool. Repositories are
/// independent; outcomes keep target order.
pub fn pull_all(
    targets: &[PullTarget],
    base_branch: &str,
    workers: usize,
    cancel: &CancellationToken,
) -> BatchReport {
    let results = run_bounded(targets, workers, cancel, |t| pull_repo(t, base_branch));
    let mut report = BatchReport::default();
    for (target, result) in targets.iter().zip(results) {
        match result {
            Some(outcomes) => outcomes.into_iter().for_each(|o| report.push(o)),
            None => report.push(ItemOutcome::cancelled(&target.repo)),
        }
    }
    report
}

/// Clone (or pull) one repository, then fetch each PR into `crev-pr-{n}`.
/// Returns one outcome for the repository followed by one per PR.
pub fn pull_repo(target: &PullTarget, base_branch: &str) -> Vec<ItemOutcome> {
    let key = &target.repo;
    let mut out = Vec::with_capacity(target.prs.len() + 1);
    let git = GitCli::new(&target.clone_dir, base_branch);

    if target.clone_dir.exists() {
        match git.pull() {
            Ok(()) => out.push(ItemOutcome::done(key, "pulled")),
            Err(e) => {
                tracing::warn!(repo = %key, error = %e, "pull failed");
                out.push(ItemOutcome::failed(key, FailureKind::Io, e.to_string()));
            }
        }
    } else {
        let Some(url) = target.url.as_deref() else {
            out.push(ItemOutcome::skipped(key, "no url configured"));
            return out;
        };
        match GitCli::clone_into(url, &target.clone_dir) {
            Ok(()) => out.push(ItemOutcome::done(key, "cloned")),
            Err(e) => {
                tracing::warn!(repo = %key, error = %e, "clone failed");
                out.push(ItemOutcome::failed(key, FailureKind::Io, e.to_string()));
                return out;
            }
        }
    }

    let pattern = format!("{REPO_ARTIFACT_DIR}/");
    if let Err(e) = git.ensure_excluded(&pattern) {
        tracing::warn!(repo = %key, error = %e, "cannot update .git/info/exclude");
    }

    let branches = match git.local_branches() {
        Ok(b) => b,
        Err(e) => {
            for pr in &target.prs {
                out.push(ItemOutcome::failed(key.pr(*pr), FailureKind::Io, e.to_string()));
            }
            return out;
        }
    };

    for pr in &target.prs {
        let pr_key = key.pr(*pr);
        let branch = pr_branch(*pr);
        if branches.iter().any(|b| b == &branch) {
            out.push(ItemOutcome::skipped(&pr_key, format!("{branch} exists")));
            continue;
        }
        match git.fetch_pr(*pr) {
            Ok(()) => out.push(ItemOutcome::done(&pr_key, format!("fetched into {branch}"))),
            Err(e) => {
                tracing::warn!(pr = %pr_key, error = %e, "fetch failed");
                let kind = match e {
                    GitError::RefNotFound(_) => FailureKind::NotFound,
                    _ => FailureKind::Io,
                };
                out.push(ItemOutcome::failed(&pr_key, kind, e.to_string()));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.email=test@test.com", "-c", "user.name=test"])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {args:?} failed");
    }

    /// An "origin" repository that advertises `refs/pull/5/head`.
    fn origin(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        git(dir, &["init", "--quiet"]);
        git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        std::fs::write(dir.join("a.txt"), "one\n").unwrap();
        git(dir, &["add", "."]);
        git(dir, &["commit", "--quiet", "-m", "init"]);
        git(dir, &["checkout", "--quiet", "-b", "feature"]);
        std::fs::write(dir.join("a.txt"), "two\n").unwrap();
        git(dir, &["commit", "--quiet", "-am", "change"]);
        git(dir, &["update-ref", "refs/pull/5/head", "HEAD"]);
        git(dir, &["checkout", "--quiet", "main"]);
    }

    #[test]
    fn clones_then_fetches_then_skips_existing_branch() {
        if !git_available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let origin_dir = tmp.path().join("origin");
        origin(&origin_dir);

        let ws = Workspace::discover(tmp.path().join("ws"));
        let repo = RepoKey::new("acme", "widgets");
        let target = PullTarget {
            clone_dir: ws.repo_dir(&repo),
            url: Some(origin_dir.to_string_lossy().into_owned()),
            prs: vec![5],
            repo,
        };

        let first = pull_repo(&target, "main");
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(ItemOutcome::is_done), "{first:?}");
        let exclude =
            std::fs::read_to_string(target.clone_dir.join(".git/info/exclude")).unwrap();
        assert!(exclude.lines().any(|l| l == ".crev/"));

        let second = pull_repo(&target, "main");
        assert!(second[0].is_done());
        assert!(second[1].is_skipped());
    }

    #[test]
    fn missing_url_and_clone_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::discover(tmp.path());
        let repo = RepoKey::new("acme", "nowhere");
        let target = PullTarget {
            clone_dir: ws.repo_dir(&repo),
            url: None,
            prs: vec![1],
            repo,
        };
        let out = pull_repo(&target, "main");
        assert_eq!(out.len(), 1);
        assert!(out[0].is_skipped());
    }

    #[test]
    fn cancelled_targets_are_reported() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let target = PullTarget {
            repo: RepoKey::new("acme", "widgets"),
            url: None,
            clone_dir: PathBuf::from("/nonexistent/crev/test"),
            prs: vec![],
        };
        let report = pull_all(&[target], "main", 2, &cancel);
        assert_eq!(report.counts().cancelled, 1);
        assert_eq!(report.items[0].key, "acme/widgets");
    }
}
