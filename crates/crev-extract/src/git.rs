use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Local branch a pull request head is fetched into.
pub fn pr_branch(pr: u64) -> String {
    format!("crev-pr-{pr}")
}

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("ref not found: {0}")]
    RefNotFound(String),
    #[error("git {args} failed: {stderr}")]
    Command { args: String, stderr: String },
    #[error("cannot run git: {0}")]
    Io(#[from] std::io::Error),
}

/// Base and head commits a pull request is compared between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRefs {
    pub base: String,
    pub head: String,
}

/// Read-only questions the extractor asks a local clone.
///
/// `read_file_at` returns `Ok(None)` when the path does not exist at `rev`;
/// errors are reserved for missing refs and transport or process failures.
pub trait GitQuery {
    fn pr_refs(&self, pr: u64) -> Result<PrRefs, GitError>;
    fn diff(&self, base: &str, head: &str) -> Result<String, GitError>;
    fn read_file_at(&self, rev: &str, path: &str) -> Result<Option<Vec<u8>>, GitError>;
}

impl<T: GitQuery + ?Sized> GitQuery for &T {
    fn pr_refs(&self, pr: u64) -> Result<PrRefs, GitError> {
        (**self).pr_refs(pr)
    }

    fn diff(&self, base: &str, head: &str) -> Result<String, GitError> {
        (**self).diff(base, head)
    }

    fn read_file_at(&self, rev: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        (**self).read_file_at(rev, path)
    }
}

/// [`GitQuery`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
    base_branch: String,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>, base_branch: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            base_branch: base_branch.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        tracing::debug!(repo = %self.repo_dir.display(), ?args, "git");
        Ok(Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()?)
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(command_error(args, &output));
        }
        Ok(output.stdout)
    }

    /// Resolve `rev` to a commit id, or `RefNotFound`.
    pub fn verify_commit(&self, rev: &str) -> Result<String, GitError> {
        let spec = format!("{rev}^{{commit}}");
        let output = self.output(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Err(GitError::RefNotFound(rev.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn commit_count(&self) -> Result<u64, GitError> {
        let out = self.run(&["rev-list", "--count", "HEAD"])?;
        let text = String::from_utf8_lossy(&out);
        text.trim().parse().map_err(|_| GitError::Command {
            args: "rev-list --count HEAD".into(),
            stderr: format!("unexpected output: {}", text.trim()),
        })
    }

    pub fn short_hash(&self) -> Result<String, GitError> {
        let out = self.run(&["rev-parse", "--short=10", "HEAD"])?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }

    // ── pull-side operations ──

    /// `git clone <url> <dest>`; runs outside any existing clone.
    pub fn clone_into(url: &str, dest: &Path) -> Result<(), GitError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let dest_str = dest.to_string_lossy();
        let args = ["clone", "--quiet", url, dest_str.as_ref()];
        let output = Command::new("git").args(args).output()?;
        if !output.status.success() {
            return Err(command_error(&args, &output));
        }
        Ok(())
    }

    pub fn pull(&self) -> Result<(), GitError> {
        self.run(&["pull", "--quiet"])?;
        Ok(())
    }

    pub fn local_branches(&self) -> Result<Vec<String>, GitError> {
        let out = self.run(&["branch", "--list", "--format=%(refname:short)"])?;
        Ok(String::from_utf8_lossy(&out)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// Fetch `pull/{pr}/head` from origin into the local PR branch.
    pub fn fetch_pr(&self, pr: u64) -> Result<(), GitError> {
        let refspec = format!("pull/{pr}/head:{}", pr_branch(pr));
        self.run(&["fetch", "--quiet", "origin", &refspec])?;
        Ok(())
    }

    /// Add `pattern` to `.git/info/exclude` unless already listed.
    pub fn ensure_excluded(&self, pattern: &str) -> Result<(), GitError> {
        let info = self.repo_dir.join(".git").join("info");
        let exclude = info.join("exclude");
        let existing = std::fs::read_to_string(&exclude).unwrap_or_default();
        if existing.lines().any(|l| l.trim() == pattern) {
            return Ok(());
        }
        std::fs::create_dir_all(&info)?;
        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(pattern);
        content.push('\n');
        std::fs::write(&exclude, content)?;
        Ok(())
    }
}

fn command_error(args: &[&str], output: &Output) -> GitError {
    GitError::Command {
        args: args.join(" "),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

impl GitQuery for GitCli {
    fn pr_refs(&self, pr: u64) -> Result<PrRefs, GitError> {
        let head = self.verify_commit(&pr_branch(pr))?;
        let base_tip = self.verify_commit(&self.base_branch)?;
        let out = self.run(&["merge-base", &base_tip, &head])?;
        let base = String::from_utf8_lossy(&out).trim().to_string();
        if base.is_empty() {
            return Err(GitError::RefNotFound(format!(
                "merge-base({}, {})",
                self.base_branch,
                pr_branch(pr)
            )));
        }
        Ok(PrRefs { base, head })
    }

    fn diff(&self, base: &str, head: &str) -> Result<String, GitError> {
        self.verify_commit(base)?;
        self.verify_commit(head)?;
        let out = self.run(&[
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            base,
            head,
        ])?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn read_file_at(&self, rev: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let args = ["ls-tree", "-z", rev, "--", path];
        let output = self.output(&args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Not a valid object name") || stderr.contains("not a tree object") {
                return Err(GitError::RefNotFound(rev.to_string()));
            }
            return Err(command_error(&args, &output));
        }
        // `<mode> SP <type> SP <object> TAB <path> NUL`
        let listing = String::from_utf8_lossy(&output.stdout);
        let Some(entry) = listing.split('\0').find(|e| !e.is_empty()) else {
            return Ok(None);
        };
        let kind = entry.split_whitespace().nth(1).unwrap_or("");
        if kind != "blob" {
            tracing::debug!(rev, path, kind, "not a blob at revision");
            return Ok(None);
        }
        let object = format!("{rev}:{path}");
        Ok(Some(self.run(&["cat-file", "blob", &object])?))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory git collaborator that records every call.
    #[derive(Default)]
    pub struct FakeGit {
        pub refs: HashMap<u64, PrRefs>,
        pub diffs: HashMap<(String, String), String>,
        pub files: HashMap<(String, String), Vec<u8>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeGit {
        pub fn with_pr(mut self, pr: u64, diff: &str) -> Self {
            let base = format!("base{pr}");
            let head = format!("head{pr}");
            self.diffs.insert((base.clone(), head.clone()), diff.to_string());
            self.refs.insert(pr, PrRefs { base, head });
            self
        }

        pub fn with_file(mut self, rev: &str, path: &str, content: &[u8]) -> Self {
            self.files
                .insert((rev.to_string(), path.to_string()), content.to_vec());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl GitQuery for FakeGit {
        fn pr_refs(&self, pr: u64) -> Result<PrRefs, GitError> {
            self.record(format!("pr_refs {pr}"));
            self.refs
                .get(&pr)
                .cloned()
                .ok_or_else(|| GitError::RefNotFound(pr_branch(pr)))
        }

        fn diff(&self, base: &str, head: &str) -> Result<String, GitError> {
            self.record(format!("diff {base} {head}"));
            self.diffs
                .get(&(base.to_string(), head.to_string()))
                .cloned()
                .ok_or_else(|| GitError::RefNotFound(head.to_string()))
        }

        fn read_file_at(&self, rev: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
            self.record(format!("read {rev} {path}"));
            Ok(self.files.get(&(rev.to_string(), path.to_string())).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    /// main: a.txt, gone.txt; crev-pr-5: a.txt modified, gone.txt deleted, new.txt added.
    fn fixture_repo(dir: &Path) {
        git(dir, &["init", "--quiet"]);
        git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        std::fs::write(dir.join("a.txt"), "one\n").unwrap();
        std::fs::write(dir.join("gone.txt"), "bye\n").unwrap();
        git(dir, &["add", "."]);
        git(dir, &["commit", "--quiet", "-m", "init"]);
        git(dir, &["checkout", "--quiet", "-b", "crev-pr-5"]);
        std::fs::write(dir.join("a.txt"), "two\n").unwrap();
        std::fs::remove_file(dir.join("gone.txt")).unwrap();
        std::fs::write(dir.join("new.txt"), "fresh\n").unwrap();
        git(dir, &["add", "-A"]);
        git(dir, &["commit", "--quiet", "-m", "change"]);
        git(dir, &["checkout", "--quiet", "main"]);
    }

    #[test]
    fn cli_resolves_refs_diffs_and_reads() {
        if !git_available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        fixture_repo(tmp.path());
        let cli = GitCli::new(tmp.path(), "main");

        let refs = cli.pr_refs(5).unwrap();
        assert_ne!(refs.base, refs.head);

        let diff = cli.diff(&refs.base, &refs.head).unwrap();
        assert!(diff.contains("diff --git a/a.txt b/a.txt"));
        assert!(diff.contains("+fresh"));

        assert_eq!(
            cli.read_file_at(&refs.base, "a.txt").unwrap().as_deref(),
            Some(&b"one\n"[..])
        );
        assert_eq!(cli.read_file_at(&refs.base, "new.txt").unwrap(), None);
        assert_eq!(cli.read_file_at(&refs.head, "gone.txt").unwrap(), None);
        assert_eq!(cli.commit_count().unwrap(), 1);
    }

    #[test]
    fn cli_reports_missing_refs() {
        if !git_available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        fixture_repo(tmp.path());
        let cli = GitCli::new(tmp.path(), "main");
        assert!(matches!(cli.pr_refs(99), Err(GitError::RefNotFound(_))));
        assert!(matches!(
            cli.diff("deadbeef", "main"),
            Err(GitError::RefNotFound(_))
        ));
    }

    #[test]
    fn ensure_excluded_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".git").join("info")).unwrap();
        let cli = GitCli::new(tmp.path(), "main");
        cli.ensure_excluded(".crev/").unwrap();
        cli.ensure_excluded(".crev/").unwrap();
        let content =
            std::fs::read_to_string(tmp.path().join(".git").join("info").join("exclude")).unwrap();
        assert_eq!(content.matches(".crev/").count(), 1);
    }
}
