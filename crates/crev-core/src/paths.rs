use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

pub const REPOS_DIR: &str = "repos";
pub const PULLREQUESTS_DIR: &str = "pullrequests";
pub const CONFIG_FILE: &str = "configs.json";
pub const PROMPTS_DIR: &str = "prompts";

/// Hidden per-repo artifact directory inside the clone.
pub const REPO_ARTIFACT_DIR: &str = ".crev";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("malformed workspace path '{path}': {reason}")]
    Malformed { path: String, reason: &'static str },
}

impl PathError {
    fn malformed(path: &str, reason: &'static str) -> Self {
        PathError::Malformed {
            path: path.to_string(),
            reason,
        }
    }
}

/// File categories produced by repository categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    App,
    Test,
    Infra,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::App, Category::Test, Category::Infra];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::App => "app",
            Category::Test => "test",
            Category::Infra => "infra",
        }
    }

    /// Capitalized form used in markdown headings.
    pub fn title(self) -> &'static str {
        match self {
            Category::App => "App",
            Category::Test => "Test",
            Category::Infra => "Infra",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a repository: `(org, repo)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RepoKey {
    pub org: String,
    pub repo: String,
}

impl RepoKey {
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
        }
    }

    /// `repos/{org}/{repo}`; also the clone location.
    pub fn root(&self) -> String {
        format!("{REPOS_DIR}/{}/{}", self.org, self.repo)
    }

    pub fn artifact_dir(&self) -> String {
        format!("{}/{REPO_ARTIFACT_DIR}", self.root())
    }

    pub fn categorization_context(&self) -> String {
        format!("{}/sum_repo.categorization.context.md", self.artifact_dir())
    }

    pub fn categorization(&self) -> String {
        format!("{}/sum_repo.categorization.json", self.artifact_dir())
    }

    pub fn structure_context(&self) -> String {
        format!("{}/sum_repo.structure.context.md", self.artifact_dir())
    }

    pub fn structure_result(&self) -> String {
        format!("{}/sum_repo.structure.md", self.artifact_dir())
    }

    pub fn category_context(&self, category: Category) -> String {
        format!("{}/sum_repo.{category}.context.md", self.artifact_dir())
    }

    pub fn category_result(&self, category: Category) -> String {
        format!("{}/sum_repo.{category}.md", self.artifact_dir())
    }

    /// Narrative repository summary (`.ai.` scope).
    pub fn summary(&self) -> String {
        format!("{}/sum.repo.ai.md", self.artifact_dir())
    }

    pub fn pr(&self, number: u64) -> PrKey {
        PrKey {
            org: self.org.clone(),
            repo: self.repo.clone(),
            number,
        }
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}

/// Identity of a pull request: `(org, repo, number)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PrKey {
    pub org: String,
    pub repo: String,
    pub number: u64,
}

impl PrKey {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            number,
        }
    }

    pub fn repo_key(&self) -> RepoKey {
        RepoKey::new(self.org.clone(), self.repo.clone())
    }

    /// `pullrequests/{org}/{repo}/{pr}`
    pub fn root(&self) -> String {
        format!(
            "{PULLREQUESTS_DIR}/{}/{}/{}",
            self.org, self.repo, self.number
        )
    }

    pub fn sum_dir(&self) -> String {
        format!("{}/sum", self.root())
    }

    /// Unified diff; its presence marks the PR as fully extracted.
    pub fn diff(&self) -> String {
        format!("{}/diff.txt", self.sum_dir())
    }

    pub fn initial_dir(&self) -> String {
        format!("{}/code/initial", self.root())
    }

    pub fn final_dir(&self) -> String {
        format!("{}/code/final", self.root())
    }

    pub fn initial(&self, file: &str) -> String {
        format!("{}/{file}", self.initial_dir())
    }

    pub fn final_(&self, file: &str) -> String {
        format!("{}/{file}", self.final_dir())
    }

    /// Assembled context handed to the summarizer (`.context.` scope).
    pub fn context(&self) -> String {
        format!("{}/sum.context.md", self.sum_dir())
    }

    /// Narrative PR summary (`.ai.` scope).
    pub fn summary(&self) -> String {
        format!("{}/summary.pr.{}.ai.md", self.sum_dir(), self.number)
    }
}

impl fmt::Display for PrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.repo, self.number)
    }
}

/// Logical key a workspace path belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Key {
    Repo(RepoKey),
    Pr(PrKey),
}

impl Key {
    pub fn root(&self) -> String {
        match self {
            Key::Repo(k) => k.root(),
            Key::Pr(k) => k.root(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Repo(k) => k.fmt(f),
            Key::Pr(k) => k.fmt(f),
        }
    }
}

/// Parse a workspace-relative path back into its logical key.
///
/// `repos/{org}/{repo}/...` needs at least 3 segments and
/// `pullrequests/{org}/{repo}/{pr}/...` at least 4 with a canonical decimal PR
/// (no sign, no leading zeros).
/// Anything else is `Malformed`; callers treat it as ungrouped.
pub fn parse_key(path: &str) -> Result<Key, PathError> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(PathError::malformed(path, "empty segment"));
    }
    match parts.first().copied() {
        Some(REPOS_DIR) => {
            if parts.len() < 3 {
                return Err(PathError::malformed(path, "expected repos/{org}/{repo}"));
            }
            Ok(Key::Repo(RepoKey::new(parts[1], parts[2])))
        }
        Some(PULLREQUESTS_DIR) => {
            if parts.len() < 4 {
                return Err(PathError::malformed(
                    path,
                    "expected pullrequests/{org}/{repo}/{pr}",
                ));
            }
            let number = parts[3]
                .parse::<u64>()
                .map_err(|_| PathError::malformed(path, "pull request number is not numeric"))?;
            if parts[3] != number.to_string() {
                return Err(PathError::malformed(
                    path,
                    "pull request number is not in canonical form",
                ));
            }
            Ok(Key::Pr(PrKey::new(parts[1], parts[2], number)))
        }
        _ => Err(PathError::malformed(path, "not under a recognized root")),
    }
}

/// Reject paths that could escape the workspace or are not plain relative paths.
pub fn validate_relative(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::malformed(path, "empty path"));
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(PathError::malformed(path, "not a relative '/'-separated path"));
    }
    for seg in path.split('/') {
        match seg {
            "" => return Err(PathError::malformed(path, "empty segment")),
            "." | ".." => return Err(PathError::malformed(path, "dot segment")),
            _ => {}
        }
    }
    if Path::new(path).is_absolute() {
        return Err(PathError::malformed(path, "absolute path"));
    }
    Ok(())
}

/// Render a relative filesystem path with `/` separators.
/// Returns `None` for non-UTF-8 or non-normal components.
pub fn to_workspace_path(rel: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for c in rel.components() {
        match c {
            Component::Normal(s) => parts.push(s.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Well-known locations of a workspace root. Pure computation, no I/O.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub repos_dir: PathBuf,
    pub pullrequests_dir: PathBuf,
    pub config_json: PathBuf,
    pub prompts_dir: PathBuf,
}

impl Workspace {
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            repos_dir: root.join(REPOS_DIR),
            pullrequests_dir: root.join(PULLREQUESTS_DIR),
            config_json: root.join(CONFIG_FILE),
            prompts_dir: root.join(PROMPTS_DIR),
            root,
        }
    }

    /// A workspace is initialized once `configs.json` exists.
    pub fn is_initialized(&self) -> bool {
        self.config_json.is_file()
    }

    /// Join a `/`-separated workspace-relative path onto the root.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        let mut p = self.root.clone();
        for seg in rel.split('/').filter(|s| !s.is_empty()) {
            p.push(seg);
        }
        p
    }

    pub fn repo_dir(&self, key: &RepoKey) -> PathBuf {
        self.resolve(&key.root())
    }

    pub fn pr_dir(&self, key: &PrKey) -> PathBuf {
        self.resolve(&key.root())
    }
}
