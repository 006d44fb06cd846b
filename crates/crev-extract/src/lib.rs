//! Snapshot extraction: turns local clones into per-PR `initial`/`final`
//! trees plus a unified diff under `pullrequests/`.
//!
//! Git access goes through the [`GitQuery`] trait so extraction can be
//! driven by the real `git` binary ([`GitCli`]) or an in-memory fake.

pub mod diff;
pub mod extract;
pub mod git;
pub mod pull;

pub use diff::changed_paths;
pub use extract::{extract_batch, extract_pr, ExtractError, ExtractTarget, FileChange, PrExtraction};
pub use git::{pr_branch, GitCli, GitError, GitQuery, PrRefs};
pub use pull::{pull_all, pull_repo, PullTarget};
