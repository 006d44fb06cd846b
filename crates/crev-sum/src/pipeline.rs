//! PR and repository summarization over a [`Summarizer`].
//!
//! Every artifact is checked for existence before work is done. A present
//! `.ai.` summary means the item is finished and is skipped unless `force`
//! is set; intermediate repository phases are reused the same way.

use crate::prompts::{Phase, Prompts};
use crate::summarizer::Summarizer;
use crev_context::{load_pr, render_file_listing, render_pr, render_repo, render_structure, FileCategories};
use crev_core::{
    run_batch, write_atomic, BatchReport, CancellationToken, Category, FailureKind, ItemOutcome,
    PrKey, RepoKey, Workspace,
};
use crev_extract::GitCli;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default)]
pub struct SumOptions {
    /// Write the assembled context and stop before calling the summarizer.
    pub context_only: bool,
    /// Redo work even when the output already exists.
    pub force: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SumError {
    #[error("{} not found; run `crev extract` or `crev pull` first", .0.display())]
    NotFound(PathBuf),
    #[error("no summarizer configured; set `summarizer.command` in configs.json or use --context-only")]
    NoSummarizer,
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("summarizer failed: {0:#}")]
    Summarizer(anyhow::Error),
}

impl SumError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SumError::NotFound(_) => FailureKind::NotFound,
            SumError::Summarizer(_) => FailureKind::MalformedInput,
            SumError::NoSummarizer | SumError::Io { .. } => FailureKind::Io,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SumOutcome {
    /// The `.ai.` summary already existed.
    Skipped,
    ContextWritten,
    Summarized,
}

impl SumOutcome {
    fn into_item(self, key: impl ToString) -> ItemOutcome {
        match self {
            SumOutcome::Skipped => ItemOutcome::skipped(key, "summary exists"),
            SumOutcome::ContextWritten => ItemOutcome::done(key, "context written"),
            SumOutcome::Summarized => ItemOutcome::done(key, "summarized"),
        }
    }
}

/// Collaborators and switches shared by every item of a summarization run.
#[derive(Clone, Copy)]
pub struct SumContext<'a> {
    pub ws: &'a Workspace,
    pub summarizer: Option<&'a dyn Summarizer>,
    pub prompts: &'a Prompts,
    pub opts: SumOptions,
}

impl<'a> SumContext<'a> {
    fn write(&self, rel: &str, text: &str) -> Result<(), SumError> {
        let path = self.ws.resolve(rel);
        write_atomic(&path, text.as_bytes()).map_err(|source| SumError::Io { path, source })
    }

    fn ask(&self, phase: Phase, context: &str) -> Result<String, SumError> {
        let summarizer = self.summarizer.ok_or(SumError::NoSummarizer)?;
        summarizer
            .summarize(&self.prompts.render(phase, context))
            .map_err(SumError::Summarizer)
    }

    /// Reuse the artifact at `rel` unless forced; otherwise produce and store it.
    fn cached(
        &self,
        rel: &str,
        produce: impl FnOnce() -> Result<String, SumError>,
    ) -> Result<String, SumError> {
        let path = self.ws.resolve(rel);
        if !self.opts.force && path.is_file() {
            tracing::debug!(path = %rel, "reusing cached artifact");
            return std::fs::read_to_string(&path).map_err(|source| SumError::Io { path, source });
        }
        let text = produce()?;
        self.write(rel, &text)?;
        Ok(text)
    }
}

/// Summarize one PR. The context document is always written before the
/// summarizer is called, so it survives a summarizer failure.
pub fn sum_pr(cx: &SumContext<'_>, key: &PrKey) -> Result<SumOutcome, SumError> {
    let pr_dir = cx.ws.pr_dir(key);
    if !pr_dir.is_dir() {
        return Err(SumError::NotFound(pr_dir));
    }
    if !cx.opts.force && cx.ws.resolve(&key.summary()).is_file() {
        return Ok(SumOutcome::Skipped);
    }

    let doc = load_pr(&pr_dir).map_err(|source| SumError::Io {
        path: pr_dir.clone(),
        source,
    })?;
    let context = render_pr(&doc);
    cx.write(&key.context(), &context)?;
    if cx.opts.context_only {
        return Ok(SumOutcome::ContextWritten);
    }

    let summary = cx.ask(Phase::Pr, &context)?;
    cx.write(&key.summary(), &summary)?;
    tracing::info!(pr = %key, "summarized");
    Ok(SumOutcome::Summarized)
}

/// Pull the first `{...}` object out of a free-form reply.
pub fn parse_categories(reply: &str) -> Option<FileCategories> {
    let start = reply.find('{')?;
    let mut stream = serde_json::Deserializer::from_str(&reply[start..]).into_iter::<FileCategories>();
    stream.next()?.ok()
}

fn commit_info(repo_dir: &std::path::Path) -> (u64, String) {
    let git = GitCli::new(repo_dir, "HEAD");
    match (git.commit_count(), git.short_hash()) {
        (Ok(count), Ok(hash)) => (count, hash),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(repo = %repo_dir.display(), error = %e, "cannot read commit info");
            (0, "unknown".to_string())
        }
    }
}

/// Multi-phase repository summary: file listing, categorization, structure,
/// one analysis per non-empty category, then the combined `sum.repo.ai.md`.
pub fn sum_repo(cx: &SumContext<'_>, key: &RepoKey) -> Result<SumOutcome, SumError> {
    let repo_dir = cx.ws.repo_dir(key);
    if !repo_dir.is_dir() {
        return Err(SumError::NotFound(repo_dir));
    }
    if !cx.opts.force && cx.ws.resolve(&key.summary()).is_file() {
        return Ok(SumOutcome::Skipped);
    }

    let listing = cx.cached(&key.categorization_context(), || {
        render_file_listing(&repo_dir).map_err(|source| SumError::Io {
            path: repo_dir.clone(),
            source,
        })
    })?;
    if cx.opts.context_only {
        return Ok(SumOutcome::ContextWritten);
    }

    let categories_json = cx.cached(&key.categorization(), || {
        let reply = cx.ask(Phase::RepoCategorize, &listing)?;
        let categories = parse_categories(&reply).unwrap_or_else(|| {
            tracing::warn!(repo = %key, "could not parse categorization reply");
            FileCategories::default()
        });
        serde_json::to_string_pretty(&categories).map_err(|e| SumError::Summarizer(e.into()))
    })?;
    let categories: FileCategories = serde_json::from_str(&categories_json).unwrap_or_else(|e| {
        tracing::warn!(repo = %key, error = %e, "cached categorization unreadable");
        FileCategories::default()
    });

    let structure_context = cx.cached(&key.structure_context(), || {
        Ok(render_structure(&categories))
    })?;
    let structure = cx.cached(&key.structure_result(), || {
        cx.ask(Phase::RepoStructure, &structure_context)
    })?;

    let mut analyses = Vec::new();
    for category in Category::ALL {
        let files = categories.get(category);
        if files.is_empty() {
            tracing::debug!(repo = %key, %category, "no files in category");
            continue;
        }
        let context = cx.cached(&key.category_context(category), || {
            Ok(render_repo(&repo_dir, files, Some(category)))
        })?;
        let analysis = cx.cached(&key.category_result(category), || {
            cx.ask(Phase::RepoCategory(category), &context)
        })?;
        analyses.push((category, analysis));
    }

    let (commits, hash) = commit_info(&repo_dir);
    let mut out = format!(
        "# Repository Summary: {key}\n\n*Generated from commit #{commits} ({hash})*\n\n---\n\n## Repository Structure\n\n{}\n\n---\n",
        structure.trim_end()
    );
    for (category, analysis) in analyses {
        out.push_str(&format!(
            "\n## {} Analysis\n\n{}\n\n---\n",
            category.title(),
            analysis.trim_end()
        ));
    }
    cx.write(&key.summary(), &out)?;
    tracing::info!(repo = %key, "summarized");
    Ok(SumOutcome::Summarized)
}

pub fn sum_pr_batch(
    cx: &SumContext<'_>,
    keys: &[PrKey],
    workers: usize,
    cancel: &CancellationToken,
) -> BatchReport {
    run_batch(keys, PrKey::to_string, workers, cancel, |key| match sum_pr(cx, key) {
        Ok(outcome) => outcome.into_item(key),
        Err(e) => {
            tracing::warn!(pr = %key, error = %e, "summarization failed");
            ItemOutcome::failed(key, e.kind(), e.to_string())
        }
    })
}

pub fn sum_repo_batch(
    cx: &SumContext<'_>,
    keys: &[RepoKey],
    workers: usize,
    cancel: &CancellationToken,
) -> BatchReport {
    run_batch(keys, RepoKey::to_string, workers, cancel, |key| match sum_repo(cx, key) {
        Ok(outcome) => outcome.into_item(key),
        Err(e) => {
            tracing::warn!(repo = %key, error = %e, "summarization failed");
            ItemOutcome::failed(key, e.kind(), e.to_string())
        }
    })
}
