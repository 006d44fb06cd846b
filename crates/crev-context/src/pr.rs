//! Pull request mode: the unified diff followed by an Initial/Final pair
//! for every changed file.

use crate::markdown::{push_fenced, push_snapshot, Snapshot, DELETED, NEWLY_ADDED};
use crev_core::paths::to_workspace_path;
use crev_core::walk_files;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrFile {
    pub path: String,
    /// `None`: the file was added by the PR.
    pub initial: Option<Snapshot>,
    /// `None`: the file was deleted by the PR.
    pub final_: Option<Snapshot>,
}

/// Everything rendered for one PR. `files` is rendered in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrDocument {
    pub diff: Option<String>,
    pub files: Vec<PrFile>,
}

/// Read an extracted PR directory back into a [`PrDocument`].
/// Files are ordered by path.
pub fn load_pr(pr_dir: &Path) -> io::Result<PrDocument> {
    let diff = match std::fs::read(pr_dir.join("sum").join("diff.txt")) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    let initial_dir = pr_dir.join("code").join("initial");
    let final_dir = pr_dir.join("code").join("final");
    let mut paths = BTreeSet::new();
    for dir in [&initial_dir, &final_dir] {
        for file in walk_files(dir)? {
            let rel = file.strip_prefix(dir).ok().and_then(to_workspace_path);
            match rel {
                Some(rel) => {
                    paths.insert(rel);
                }
                None => tracing::warn!(path = %file.display(), "skipping unreadable snapshot path"),
            }
        }
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let initial = read_snapshot(&initial_dir, &path)?;
        let final_ = read_snapshot(&final_dir, &path)?;
        files.push(PrFile {
            path,
            initial,
            final_,
        });
    }
    Ok(PrDocument { diff, files })
}

fn read_snapshot(dir: &Path, rel: &str) -> io::Result<Option<Snapshot>> {
    let mut p = dir.to_path_buf();
    p.extend(rel.split('/'));
    match std::fs::read(&p) {
        Ok(bytes) => Ok(Some(Snapshot::from_bytes(bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn render_pr(doc: &PrDocument) -> String {
    let mut out = String::from("# Attachments\n\n");

    match &doc.diff {
        Some(diff) => {
            out.push_str("## Git Diff\n\n");
            push_fenced(&mut out, "diff", diff);
        }
        None => tracing::warn!("PR has no diff; rendering file changes only"),
    }

    if doc.files.is_empty() {
        return out;
    }
    out.push_str("## File Changes\n\n");
    for file in &doc.files {
        out.push_str(&format!("### {}\n\n", file.path));
        out.push_str("#### Initial\n\n");
        push_side(&mut out, &file.path, file.initial.as_ref(), NEWLY_ADDED);
        out.push_str("#### Final\n\n");
        push_side(&mut out, &file.path, file.final_.as_ref(), DELETED);
    }
    out
}

fn push_side(out: &mut String, path: &str, side: Option<&Snapshot>, absent: &str) {
    match side {
        Some(snapshot) => push_snapshot(out, path, snapshot),
        None => {
            out.push_str(absent);
            out.push_str("\n\n");
        }
    }
}
