use crev_core::{ConfigError, PrKey, RepoKey, WorkspaceConfig};

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid pull request number '{0}'")]
    InvalidPr(String),
    #[error("pull request {0} is not listed in configs.json")]
    UnknownPr(String),
}

/// Repositories matching `org`/`repo`; `None` or `"."` matches all.
pub fn select_repos(
    config: &WorkspaceConfig,
    org: Option<&str>,
    repo: Option<&str>,
) -> Result<Vec<RepoKey>, SelectError> {
    Ok(config.select(org, repo)?.into_iter().map(|r| r.key()).collect())
}

/// Pull requests matching `org`/`repo`/`pr`. A specific number must be
/// listed under one of the selected repositories.
pub fn select_prs(
    config: &WorkspaceConfig,
    org: Option<&str>,
    repo: Option<&str>,
    pr: Option<&str>,
) -> Result<Vec<PrKey>, SelectError> {
    let repos = config.select(org, repo)?;
    let mut keys: Vec<PrKey> = repos.iter().flat_map(|r| r.pr_keys()).collect();
    match pr.filter(|p| *p != ".") {
        None => Ok(keys),
        Some(raw) => {
            let number: u64 = raw
                .parse()
                .map_err(|_| SelectError::InvalidPr(raw.to_string()))?;
            keys.retain(|k| k.number == number);
            if keys.is_empty() {
                return Err(SelectError::UnknownPr(raw.to_string()));
            }
            Ok(keys)
        }
    }
}
