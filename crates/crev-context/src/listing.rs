//! File listing used as input for repository categorization.

use crev_core::paths::{to_workspace_path, REPO_ARTIFACT_DIR};
use crev_core::walk_files;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::io;
use std::path::Path;

const BUILTIN_IGNORES: &[&str] = &[
    "**/.git/**",
    "**/__pycache__/**",
    "**/node_modules/**",
    "**/.venv/**",
    "**/venv/**",
    "**/*.pyc",
    "**/*.pyo",
    "**/.DS_Store",
];

const SHOWN_PATTERNS: usize = 20;

/// Repository files that survive the ignore rules, sorted, plus the
/// `.gitignore` patterns that were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    pub files: Vec<String>,
    pub patterns: Vec<String>,
}

impl FileListing {
    pub fn collect(repo_dir: &Path) -> io::Result<Self> {
        let patterns = read_gitignore(repo_dir)?;
        let ignore = build_ignore(&patterns);

        let mut files = Vec::new();
        for file in walk_files(repo_dir)? {
            let Some(rel) = file.strip_prefix(repo_dir).ok().and_then(to_workspace_path) else {
                continue;
            };
            if rel.starts_with(&format!("{REPO_ARTIFACT_DIR}/")) || ignore.is_match(&rel) {
                continue;
            }
            files.push(rel);
        }
        files.sort();
        Ok(Self { files, patterns })
    }

    pub fn render(&self) -> String {
        let mut out = String::from("# Repository Files for Categorization\n\n");

        if !self.patterns.is_empty() {
            out.push_str("## .gitignore Patterns Applied\n\n```\n");
            for p in self.patterns.iter().take(SHOWN_PATTERNS) {
                out.push_str(p);
                out.push('\n');
            }
            if self.patterns.len() > SHOWN_PATTERNS {
                out.push_str(&format!(
                    "... and {} more patterns\n",
                    self.patterns.len() - SHOWN_PATTERNS
                ));
            }
            out.push_str("```\n\n");
        }

        out.push_str("## Files to Categorize\n\n");
        out.push_str("Please categorize each file as `test`, `app`, or `infra`.\n\n```\n");
        for f in &self.files {
            out.push_str(f);
            out.push('\n');
        }
        out.push_str("```\n\n");
        out.push_str(&format!("Total files: {}\n", self.files.len()));
        out
    }
}

pub fn render_file_listing(repo_dir: &Path) -> io::Result<String> {
    Ok(FileListing::collect(repo_dir)?.render())
}

fn read_gitignore(repo_dir: &Path) -> io::Result<Vec<String>> {
    let content = match std::fs::read_to_string(repo_dir.join(".gitignore")) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Translate gitignore lines into globs. Negations are not supported and
/// are skipped.
fn build_ignore(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    let globs = BUILTIN_IGNORES
        .iter()
        .map(|g| g.to_string())
        .chain(patterns.iter().flat_map(|p| gitignore_globs(p)));
    for g in globs {
        match GlobBuilder::new(&g).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::warn!(pattern = %g, error = %e, "ignoring invalid pattern"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "cannot build ignore set; nothing is ignored");
        GlobSet::empty()
    })
}

fn gitignore_globs(line: &str) -> Vec<String> {
    if line.starts_with('!') {
        tracing::debug!(pattern = line, "negated ignore patterns are not supported");
        return Vec::new();
    }
    let trimmed = line.trim_end_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    let anchored = trimmed.contains('/');
    let body = trimmed.trim_start_matches('/');
    let base = if anchored {
        body.to_string()
    } else {
        format!("**/{body}")
    };
    vec![format!("{base}/**"), base]
}
