//! Repository mode: file contents per category, and the category → path
//! structure overview.

use crate::markdown::{push_snapshot, Snapshot, FILE_NOT_FOUND, NO_FILES_IN_CATEGORY};
use crev_core::{validate_relative, Category};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Repository files split by category, as stored in
/// `sum_repo.categorization.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCategories {
    #[serde(default)]
    pub app: Vec<String>,
    #[serde(default)]
    pub test: Vec<String>,
    #[serde(default)]
    pub infra: Vec<String>,
}

impl FileCategories {
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::App => &self.app,
            Category::Test => &self.test,
            Category::Infra => &self.infra,
        }
    }

    pub fn total(&self) -> usize {
        self.app.len() + self.test.len() + self.infra.len()
    }
}

/// One `## path` section per file, in the order given, with current content.
/// Paths that are not plain relative paths inside `repo_dir` render as not found.
pub fn render_repo(repo_dir: &Path, files: &[String], category: Option<Category>) -> String {
    let mut out = String::new();
    match category {
        Some(c) => out.push_str(&format!("# {} Files\n\n", c.title())),
        None => out.push_str("# Repository Files\n\n"),
    }

    for rel in files {
        out.push_str(&format!("## {rel}\n\n"));
        if let Err(e) = validate_relative(rel) {
            tracing::warn!(error = %e, "refusing path outside the repository");
            out.push_str(FILE_NOT_FOUND);
            out.push_str("\n\n");
            continue;
        }
        match std::fs::read(repo_dir.join(rel)) {
            Ok(bytes) => push_snapshot(&mut out, rel, &Snapshot::from_bytes(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                out.push_str(FILE_NOT_FOUND);
                out.push_str("\n\n");
            }
            Err(e) => {
                tracing::warn!(path = %rel, error = %e, "cannot read file for context");
                out.push_str(&format!("[Error reading file: {e}]\n\n"));
            }
        }
    }

    out.push_str(&format!("Total files: {}\n", files.len()));
    out
}

/// Category overview without content. Files are grouped by parent directory;
/// directories and files keep their first-appearance order.
pub fn render_structure(categories: &FileCategories) -> String {
    let mut out = String::from("# Repository File Organization\n\n");

    for category in Category::ALL {
        let files = categories.get(category);
        out.push_str(&format!(
            "## {} Files ({} files)\n\n",
            category.title(),
            files.len()
        ));
        if files.is_empty() {
            out.push_str(NO_FILES_IN_CATEGORY);
            out.push_str("\n\n");
            continue;
        }
        for (dir, names) in group_by_dir(files) {
            out.push_str(&format!("### {dir}/\n"));
            for name in names {
                out.push_str(&format!("- {name}\n"));
            }
            out.push('\n');
        }
    }

    out.push_str(&format!("**Total files:** {}\n", categories.total()));
    out
}

fn group_by_dir(files: &[String]) -> Vec<(&str, Vec<&str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for f in files {
        let (dir, name) = match f.rsplit_once('/') {
            Some((d, n)) => (d, n),
            None => ("(root)", f.as_str()),
        };
        match groups.iter_mut().find(|(d, _)| *d == dir) {
            Some((_, names)) => names.push(name),
            None => groups.push((dir, vec![name])),
        }
    }
    groups
}
