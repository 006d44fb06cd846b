use crate::paths::{PrKey, RepoKey, Workspace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

const DEFAULT_BASE_BRANCH: &str = "main";
const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configs.json not found in {}. Run `crev init` first.", .0.display())]
    NotInitialized(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configs.json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("organization '{0}' not found in configs.json")]
    UnknownOrg(String),
    #[error("repository '{0}' not found in configs.json")]
    UnknownRepo(String),
}

/// Contents of `configs.json` at the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
    /// Branch PRs are compared against.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Prompt file overrides keyed by phase (`sum_pr`, `sum_repo_structure`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prompts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer: Option<SummarizerConfig>,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_base_branch() -> String {
    DEFAULT_BASE_BRANCH.to_string()
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEntry {
    pub org: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Kept loose so one bad entry does not reject the whole file.
    #[serde(default)]
    pub pull_requests: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Shell command that reads a prompt on stdin and prints the summary.
    pub command: String,
}

impl RepoEntry {
    pub fn key(&self) -> RepoKey {
        RepoKey::new(self.org.clone(), self.name.clone())
    }

    /// Valid PR numbers in config order. Invalid entries are skipped with a warning.
    pub fn pr_numbers(&self) -> Vec<u64> {
        self.pull_requests
            .iter()
            .filter_map(|v| match v.as_u64() {
                Some(n) => Some(n),
                None => {
                    tracing::warn!(repo = %self.key(), value = %v, "skipping invalid PR number");
                    None
                }
            })
            .collect()
    }

    pub fn pr_keys(&self) -> Vec<PrKey> {
        let key = self.key();
        self.pr_numbers().into_iter().map(|n| key.pr(n)).collect()
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            repos: Vec::new(),
            base_branch: default_base_branch(),
            prompts: BTreeMap::new(),
            summarizer: None,
            workers: default_workers(),
        }
    }
}

impl WorkspaceConfig {
    /// Read `configs.json`; a missing file means the workspace is not initialized.
    pub fn load(ws: &Workspace) -> Result<Self, ConfigError> {
        if !ws.is_initialized() {
            return Err(ConfigError::NotInitialized(ws.root.clone()));
        }
        let content = std::fs::read_to_string(&ws.config_json).map_err(|source| ConfigError::Io {
            path: ws.config_json.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Starter config written by `crev init`.
    pub fn template() -> Self {
        Self {
            repos: vec![RepoEntry {
                org: "example-org".into(),
                name: "example-repo".into(),
                url: Some("https://github.com/example-org/example-repo.git".into()),
                pull_requests: vec![serde_json::json!(1)],
            }],
            ..Self::default()
        }
    }

    pub fn to_pretty_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Select repos by org and name; `None` or `"."` matches everything.
    pub fn select(&self, org: Option<&str>, repo: Option<&str>) -> Result<Vec<&RepoEntry>, ConfigError> {
        let org = org.filter(|o| *o != ".");
        let repo = repo.filter(|r| *r != ".");

        let mut selected: Vec<&RepoEntry> = self.repos.iter().collect();
        if let Some(org) = org {
            selected.retain(|r| r.org == org);
            if selected.is_empty() {
                return Err(ConfigError::UnknownOrg(org.to_string()));
            }
        }
        if let Some(repo) = repo {
            selected.retain(|r| r.name == repo);
            if selected.is_empty() {
                return Err(ConfigError::UnknownRepo(repo.to_string()));
            }
        }
        Ok(selected)
    }

    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }
}
