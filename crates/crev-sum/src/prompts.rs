//! Prompt templates for each summarization phase.
//!
//! Lookup order: the path configured under `prompts.<key>` in
//! `configs.json`, then `prompts/<key>.txt` in the workspace, then the
//! built-in default.

use anyhow::{Context, Result};
use crev_core::{Category, Workspace};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Pr,
    RepoCategorize,
    RepoStructure,
    RepoCategory(Category),
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Pr,
        Phase::RepoCategorize,
        Phase::RepoStructure,
        Phase::RepoCategory(Category::App),
        Phase::RepoCategory(Category::Test),
        Phase::RepoCategory(Category::Infra),
    ];

    /// Key under `prompts` in `configs.json` and file stem under `prompts/`.
    pub fn key(self) -> &'static str {
        match self {
            Phase::Pr => "sum_pr",
            Phase::RepoCategorize => "sum_repo_file_category",
            Phase::RepoStructure => "sum_repo_structure",
            Phase::RepoCategory(Category::App) => "sum_repo_app",
            Phase::RepoCategory(Category::Test) => "sum_repo_test",
            Phase::RepoCategory(Category::Infra) => "sum_repo_infra",
        }
    }

    pub fn default_text(self) -> &'static str {
        match self {
            Phase::Pr => DEFAULT_PR,
            Phase::RepoCategorize => DEFAULT_CATEGORIZE,
            Phase::RepoStructure => DEFAULT_STRUCTURE,
            Phase::RepoCategory(Category::App) => DEFAULT_APP,
            Phase::RepoCategory(Category::Test) => DEFAULT_TEST,
            Phase::RepoCategory(Category::Infra) => DEFAULT_INFRA,
        }
    }
}

const DEFAULT_PR: &str = "\
You are reviewing a pull request. Using the attached diff and the initial and
final versions of every changed file, write a concise summary: what changed,
why it likely changed, and any risks or follow-ups a reviewer should check.";

const DEFAULT_CATEGORIZE: &str = "\
Categorize every file listed below as `app` (application code), `test` (tests
and fixtures), or `infra` (build, CI, deployment, configuration). Reply with a
single JSON object of the form {\"app\": [...], \"test\": [...], \"infra\": [...]}
using the paths exactly as listed.";

const DEFAULT_STRUCTURE: &str = "\
Describe the architecture of this repository from its file organization:
main components, how they relate, and where a newcomer should start reading.";

const DEFAULT_APP: &str = "\
Summarize the application code below: business purpose, main modules, data
flow, and notable design decisions.";

const DEFAULT_TEST: &str = "\
Summarize the test code below: what is covered, testing style and tools, and
obvious gaps.";

const DEFAULT_INFRA: &str = "\
Summarize the infrastructure files below: build, CI, deployment, and runtime
configuration.";

/// Resolved prompt text for every phase.
#[derive(Debug, Clone)]
pub struct Prompts {
    texts: BTreeMap<Phase, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            texts: Phase::ALL
                .iter()
                .map(|p| (*p, p.default_text().to_string()))
                .collect(),
        }
    }
}

impl Prompts {
    /// Resolve every phase. A configured path that cannot be read is an error.
    pub fn load(ws: &Workspace, overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut prompts = Self::default();
        for phase in Phase::ALL {
            if let Some(rel) = overrides.get(phase.key()) {
                let path = ws.root.join(Path::new(rel));
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("prompt file {} not found", path.display()))?;
                prompts.texts.insert(phase, text);
                continue;
            }
            let path = ws.prompts_dir.join(format!("{}.txt", phase.key()));
            if path.is_file() {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?;
                prompts.texts.insert(phase, text);
            }
        }
        Ok(prompts)
    }

    pub fn get(&self, phase: Phase) -> &str {
        self.texts
            .get(&phase)
            .map(String::as_str)
            .unwrap_or_else(|| phase.default_text())
    }

    /// Template followed by the assembled context.
    pub fn render(&self, phase: Phase, context: &str) -> String {
        format!("{}\n\n{}", self.get(phase).trim_end(), context)
    }
}
