use crate::{finish, open_workspace, SumTarget};
use crev_core::{BatchReport, CancellationToken};
use crev_sum::{
    select_prs, select_repos, sum_pr_batch, sum_repo_batch, CommandSummarizer, Prompts,
    SumContext, SumOptions, Summarizer,
};
use std::path::Path;

pub struct SumParams<'a> {
    pub cwd: &'a Path,
    pub target: Option<SumTarget>,
    pub context_only: bool,
    pub force: bool,
    pub json: bool,
    pub cancel: &'a CancellationToken,
}

pub fn execute(p: SumParams<'_>) -> anyhow::Result<()> {
    let (ws, config) = open_workspace(p.cwd)?;
    let prompts = Prompts::load(&ws, &config.prompts)?;
    let command = config
        .summarizer
        .as_ref()
        .map(|s| CommandSummarizer::new(s.command.clone()).in_dir(&ws.root));
    if command.is_none() && !p.context_only {
        tracing::warn!("no summarizer configured; only context documents will be written");
    }

    let cx = SumContext {
        ws: &ws,
        summarizer: command.as_ref().map(|c| c as &dyn Summarizer),
        prompts: &prompts,
        opts: SumOptions {
            context_only: p.context_only,
            force: p.force,
        },
    };
    let workers = config.workers();

    let mut report = BatchReport::default();
    match p.target {
        Some(SumTarget::Repo { org, repo }) => {
            let keys = select_repos(&config, org.as_deref(), repo.as_deref())?;
            report.extend(sum_repo_batch(&cx, &keys, workers, p.cancel));
        }
        Some(SumTarget::Pr { org, repo, pr }) => {
            let keys = select_prs(&config, org.as_deref(), repo.as_deref(), pr.as_deref())?;
            report.extend(sum_pr_batch(&cx, &keys, workers, p.cancel));
        }
        None => {
            let repos = select_repos(&config, None, None)?;
            report.extend(sum_repo_batch(&cx, &repos, workers, p.cancel));
            let prs = select_prs(&config, None, None, None)?;
            report.extend(sum_pr_batch(&cx, &prs, workers, p.cancel));
        }
    }
    finish("summarize", &report, p.json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::init_workspace;

    fn params<'a>(
        cwd: &'a Path,
        target: Option<SumTarget>,
        cancel: &'a CancellationToken,
    ) -> SumParams<'a> {
        SumParams {
            cwd,
            target,
            context_only: true,
            force: false,
            json: false,
            cancel,
        }
    }

    #[test]
    fn requires_initialized_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let err = execute(params(tmp.path(), None, &cancel)).unwrap_err();
        assert!(err.to_string().contains("crev init"));
    }

    #[test]
    fn unknown_org_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        init_workspace(
            tmp.path(),
            r#"{"repos": [{"org": "acme", "name": "widgets", "pull_requests": [1]}]}"#,
        );
        let cancel = CancellationToken::new();
        let target = SumTarget::Pr {
            org: Some("other".into()),
            repo: None,
            pr: None,
        };
        assert!(execute(params(tmp.path(), Some(target), &cancel)).is_err());
    }

    #[test]
    fn fails_when_no_pr_was_extracted() {
        let tmp = tempfile::tempdir().unwrap();
        init_workspace(
            tmp.path(),
            r#"{"repos": [{"org": "acme", "name": "widgets", "pull_requests": [1]}]}"#,
        );
        let cancel = CancellationToken::new();
        let target = SumTarget::Pr {
            org: None,
            repo: None,
            pr: None,
        };
        let err = execute(params(tmp.path(), Some(target), &cancel)).unwrap_err();
        assert!(err.to_string().contains("every item failed"));
    }
}
