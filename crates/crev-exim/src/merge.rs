//! Apply archive entries onto a live workspace without overwriting anything.
//!
//! Entries are grouped by logical key (`org/repo` or `org/repo/pr`). A group
//! whose key root already holds any file is skipped as a whole. Otherwise the
//! group is staged in a temporary directory inside the workspace and renamed
//! onto the key root, so either every file of the group appears or none does.

use crate::archive::{decode, Entry, RecordError};
use crev_core::paths::{to_workspace_path, CONFIG_FILE, PULLREQUESTS_DIR, REPOS_DIR};
use crev_core::{
    has_any_file, parse_key, validate_relative, walk_files, write_atomic, CancellationToken, Key,
    Workspace,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const STAGING_PREFIX: &str = ".crev-import-";

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("{} is not a .txtar file", .0.display())]
    NotArchive(PathBuf),
    #[error("folder {} must contain 'repos' and/or 'pullrequests'", .0.display())]
    NotWorkspaceFolder(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot stage {key}: {source}")]
    Stage {
        key: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeFailure {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Keys whose group was written.
    pub written: Vec<String>,
    /// Keys skipped because the workspace already had files under them.
    pub skipped: Vec<String>,
    /// Keys whose group could not be written; nothing of them is on disk.
    pub failed: Vec<MergeFailure>,
    pub ungrouped_written: Vec<String>,
    /// Ungrouped paths left alone because the target file exists.
    pub ungrouped_existing: Vec<String>,
    pub ungrouped_failed: Vec<MergeFailure>,
    /// Paths never imported, such as the workspace `configs.json`.
    pub reserved: Vec<String>,
    pub decode_errors: Vec<RecordError>,
    /// Keys and paths not attempted because the merge was cancelled.
    pub cancelled: Vec<String>,
    pub files_written: usize,
}

impl MergeReport {
    fn succeeded(&self) -> usize {
        self.written.len()
            + self.skipped.len()
            + self.ungrouped_written.len()
            + self.ungrouped_existing.len()
            + self.reserved.len()
    }

    fn failures(&self) -> usize {
        self.failed.len() + self.ungrouped_failed.len() + self.decode_errors.len()
    }

    /// True when something failed and nothing else happened.
    pub fn all_failed(&self) -> bool {
        self.failures() > 0 && self.succeeded() == 0
    }

    pub fn render(&self) -> String {
        let mut out = format!("Imported {} file(s)\n", self.files_written);
        let mut section = |title: &str, items: Vec<String>| {
            if items.is_empty() {
                return;
            }
            out.push_str(&format!("{title}:\n"));
            for item in items {
                out.push_str(&format!("  - {item}\n"));
            }
        };
        section("Written", self.written.clone());
        section("Skipped (already present)", self.skipped.clone());
        section(
            "Failed",
            self.failed
                .iter()
                .map(|f| format!("{}: {}", f.key, f.message))
                .collect(),
        );
        section("Written (ungrouped)", self.ungrouped_written.clone());
        section("Left alone (file exists)", self.ungrouped_existing.clone());
        section(
            "Failed (ungrouped)",
            self.ungrouped_failed
                .iter()
                .map(|f| format!("{}: {}", f.key, f.message))
                .collect(),
        );
        section("Reserved, not imported", self.reserved.clone());
        section(
            "Unreadable records",
            self.decode_errors.iter().map(|e| e.to_string()).collect(),
        );
        section("Cancelled", self.cancelled.clone());
        out
    }
}

/// Merge `entries` into the workspace. Groups are processed in key order,
/// then ungrouped entries in input order. Cancellation is checked before
/// each group and each ungrouped entry.
pub fn merge_entries(ws: &Workspace, entries: Vec<Entry>, cancel: &CancellationToken) -> MergeReport {
    let mut report = MergeReport::default();
    let mut groups: BTreeMap<Key, Vec<Entry>> = BTreeMap::new();
    let mut ungrouped = Vec::new();

    for entry in entries {
        if entry.path == CONFIG_FILE {
            report.reserved.push(entry.path);
            continue;
        }
        if let Err(e) = validate_relative(&entry.path) {
            report.ungrouped_failed.push(MergeFailure {
                key: entry.path,
                message: e.to_string(),
            });
            continue;
        }
        match parse_key(&entry.path) {
            Ok(key) if entry.path != key.root() => groups.entry(key).or_default().push(entry),
            Ok(_) => ungrouped.push(entry),
            Err(e) => {
                tracing::debug!(error = %e, "ungrouped entry");
                ungrouped.push(entry);
            }
        }
    }

    for (key, files) in groups {
        if cancel.is_cancelled() {
            report.cancelled.push(key.to_string());
            continue;
        }
        let root = ws.resolve(&key.root());
        match has_any_file(&root) {
            Ok(true) => {
                tracing::info!(key = %key, "already present, skipping");
                report.skipped.push(key.to_string());
            }
            Ok(false) => match write_group(ws, &key, &root, &files) {
                Ok(()) => {
                    report.files_written += files.len();
                    report.written.push(key.to_string());
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "group not written");
                    report.failed.push(MergeFailure {
                        key: key.to_string(),
                        message: e.to_string(),
                    });
                }
            },
            Err(e) => report.failed.push(MergeFailure {
                key: key.to_string(),
                message: format!("cannot inspect {}: {e}", root.display()),
            }),
        }
    }

    for entry in ungrouped {
        if cancel.is_cancelled() {
            report.cancelled.push(entry.path);
            continue;
        }
        let target = ws.resolve(&entry.path);
        if target.exists() {
            report.ungrouped_existing.push(entry.path);
            continue;
        }
        match write_atomic(&target, &entry.content) {
            Ok(()) => {
                report.files_written += 1;
                report.ungrouped_written.push(entry.path);
            }
            Err(e) => report.ungrouped_failed.push(MergeFailure {
                key: entry.path,
                message: e.to_string(),
            }),
        }
    }
    report
}

fn write_group(ws: &Workspace, key: &Key, root: &Path, files: &[Entry]) -> Result<(), MergeError> {
    let stage_err = |source: io::Error| MergeError::Stage {
        key: key.to_string(),
        source,
    };
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&ws.root)
        .map_err(stage_err)?;

    let prefix = format!("{}/", key.root());
    for entry in files {
        let rel = entry.path.strip_prefix(&prefix).ok_or_else(|| {
            stage_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not under {}", entry.path, key.root()),
            ))
        })?;
        let mut dst = staging.path().to_path_buf();
        dst.extend(rel.split('/'));
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(stage_err)?;
        }
        fs::write(&dst, &entry.content).map_err(stage_err)?;
    }

    // Only empty directories can be here; has_any_file said so.
    if root.is_dir() {
        fs::remove_dir_all(root).map_err(stage_err)?;
    }
    if let Some(parent) = root.parent() {
        fs::create_dir_all(parent).map_err(stage_err)?;
    }
    fs::rename(staging.path(), root).map_err(stage_err)?;
    Ok(())
}

/// Entries from a folder holding `repos/` and/or `pullrequests/`.
pub fn entries_from_folder(dir: &Path) -> Result<Vec<Entry>, MergeError> {
    let roots: Vec<PathBuf> = [REPOS_DIR, PULLREQUESTS_DIR]
        .iter()
        .map(|r| dir.join(r))
        .filter(|p| p.is_dir())
        .collect();
    if roots.is_empty() {
        return Err(MergeError::NotWorkspaceFolder(dir.to_path_buf()));
    }
    let read_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| MergeError::Read { path, source }
    };

    let mut entries = Vec::new();
    for root in roots {
        for file in walk_files(&root).map_err(read_err(&root))? {
            let Some(rel) = file.strip_prefix(dir).ok().and_then(to_workspace_path) else {
                tracing::warn!(path = %file.display(), "skipping non-UTF-8 path");
                continue;
            };
            let content = fs::read(&file).map_err(read_err(&file))?;
            entries.push(Entry::new(rel, content));
        }
    }
    Ok(entries)
}

/// Import a `.txtar` archive or an exported folder into the workspace.
pub fn import_path(
    ws: &Workspace,
    input: &Path,
    cancel: &CancellationToken,
) -> Result<MergeReport, MergeError> {
    if input.is_dir() {
        let entries = entries_from_folder(input)?;
        return Ok(merge_entries(ws, entries, cancel));
    }
    if !input.is_file() {
        return Err(MergeError::Missing(input.to_path_buf()));
    }
    if input.extension().and_then(|e| e.to_str()) != Some(crate::export::ARCHIVE_EXTENSION) {
        return Err(MergeError::NotArchive(input.to_path_buf()));
    }
    let bytes = fs::read(input).map_err(|source| MergeError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let decoded = decode(&text);
    if !decoded.errors.is_empty() {
        tracing::warn!(errors = decoded.errors.len(), "archive has unreadable records");
    }
    let mut report = merge_entries(ws, decoded.entries, cancel);
    report.decode_errors = decoded.errors;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::encode;

    fn ws() -> (tempfile::TempDir, Workspace) {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::discover(tmp.path());
        (tmp, ws)
    }

    fn no_staging_left(ws: &Workspace) -> bool {
        fs::read_dir(&ws.root)
            .unwrap()
            .flatten()
            .all(|e| !e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
    }

    #[test]
    fn archive_merge_twice_skips_second_time() {
        let (_tmp, ws) = ws();
        let text = encode(&[Entry::new("repos/acme/widgets/app.txt", "x")]).text;
        let entries = decode(&text).entries;
        let cancel = CancellationToken::new();

        let first = merge_entries(&ws, entries.clone(), &cancel);
        assert_eq!(first.written, vec!["acme/widgets"]);
        assert!(first.skipped.is_empty());
        let target = ws.resolve("repos/acme/widgets/app.txt");
        assert_eq!(fs::read_to_string(&target).unwrap(), "x");

        let mut changed = entries;
        changed[0].content = b"y".to_vec();
        let second = merge_entries(&ws, changed, &cancel);
        assert_eq!(second.skipped, vec!["acme/widgets"]);
        assert!(second.written.is_empty());
        assert_eq!(fs::read_to_string(&target).unwrap(), "x");
        assert!(no_staging_left(&ws));
    }

    #[test]
    fn collision_is_per_key_not_per_file() {
        let (_tmp, ws) = ws();
        write_atomic(&ws.resolve("pullrequests/acme/widgets/7/sum/diff.txt"), b"old").unwrap();
        let report = merge_entries(
            &ws,
            vec![
                Entry::new("pullrequests/acme/widgets/7/sum/summary.pr.7.ai.md", "new"),
                Entry::new("pullrequests/acme/widgets/8/sum/summary.pr.8.ai.md", "eight"),
                Entry::new("repos/acme/gadgets/.crev/sum.repo.ai.md", "g"),
            ],
            &CancellationToken::new(),
        );
        assert_eq!(report.skipped, vec!["acme/widgets/7"]);
        assert_eq!(report.written, vec!["acme/gadgets", "acme/widgets/8"]);
        assert_eq!(report.files_written, 2);
        assert!(!ws
            .resolve("pullrequests/acme/widgets/7/sum/summary.pr.7.ai.md")
            .exists());
        assert_eq!(
            fs::read(ws.resolve("pullrequests/acme/widgets/7/sum/diff.txt")).unwrap(),
            b"old"
        );
    }

    #[test]
    fn new_keys_write_everything_with_zero_skips() {
        let (_tmp, ws) = ws();
        let report = merge_entries(
            &ws,
            vec![
                Entry::new("repos/a/b/x.md", "1"),
                Entry::new("repos/a/b/deep/y.md", "2"),
                Entry::new("pullrequests/a/b/1/sum/diff.txt", "3"),
            ],
            &CancellationToken::new(),
        );
        assert!(report.skipped.is_empty());
        assert_eq!(report.files_written, 3);
        assert_eq!(fs::read(ws.resolve("repos/a/b/deep/y.md")).unwrap(), b"2");
        assert!(!report.all_failed());
    }

    #[test]
    fn empty_dirs_under_key_root_are_not_a_collision() {
        let (_tmp, ws) = ws();
        fs::create_dir_all(ws.resolve("repos/acme/widgets/empty/nested")).unwrap();
        let report = merge_entries(
            &ws,
            vec![Entry::new("repos/acme/widgets/app.txt", "x")],
            &CancellationToken::new(),
        );
        assert_eq!(report.written, vec!["acme/widgets"]);
        assert!(ws.resolve("repos/acme/widgets/app.txt").is_file());
    }

    #[test]
    fn failed_group_leaves_nothing_behind() {
        let (_tmp, ws) = ws();
        // `a` is both a file and a directory inside one group.
        let report = merge_entries(
            &ws,
            vec![
                Entry::new("repos/acme/widgets/a", "file"),
                Entry::new("repos/acme/widgets/a/b", "child"),
                Entry::new("repos/acme/other/ok.txt", "ok"),
            ],
            &CancellationToken::new(),
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, "acme/widgets");
        assert!(!ws.resolve("repos/acme/widgets").exists());
        assert_eq!(report.written, vec!["acme/other"]);
        assert!(no_staging_left(&ws));
    }

    #[test]
    fn ungrouped_entries_never_overwrite() {
        let (_tmp, ws) = ws();
        write_atomic(&ws.resolve("notes/readme.md"), b"mine").unwrap();
        let report = merge_entries(
            &ws,
            vec![
                Entry::new("configs.json", "{}"),
                Entry::new("notes/readme.md", "theirs"),
                Entry::new("notes/new.md", "new"),
                Entry::new("repos/acme", "two segments"),
                Entry::new("pullrequests/acme/widgets/abc/x", "non-numeric pr"),
            ],
            &CancellationToken::new(),
        );
        assert_eq!(report.reserved, vec!["configs.json"]);
        assert_eq!(report.ungrouped_existing, vec!["notes/readme.md"]);
        assert_eq!(
            report.ungrouped_written,
            vec!["notes/new.md", "repos/acme", "pullrequests/acme/widgets/abc/x"]
        );
        assert_eq!(fs::read(ws.resolve("notes/readme.md")).unwrap(), b"mine");
        assert!(!ws.resolve("configs.json").exists());
    }

    #[test]
    fn non_canonical_pr_numbers_stay_at_their_literal_paths() {
        let (_tmp, ws) = ws();
        write_atomic(&ws.resolve("pullrequests/a/b/7/sum/diff.txt"), b"seven").unwrap();
        let report = merge_entries(
            &ws,
            vec![
                Entry::new("pullrequests/a/b/+9/sum/diff.txt", "plus"),
                Entry::new("pullrequests/a/b/007/x", "zeros"),
            ],
            &CancellationToken::new(),
        );
        assert!(report.written.is_empty());
        assert!(report.skipped.is_empty());
        assert_eq!(
            report.ungrouped_written,
            vec!["pullrequests/a/b/+9/sum/diff.txt", "pullrequests/a/b/007/x"]
        );
        assert_eq!(
            fs::read(ws.resolve("pullrequests/a/b/+9/sum/diff.txt")).unwrap(),
            b"plus"
        );
        assert_eq!(fs::read(ws.resolve("pullrequests/a/b/007/x")).unwrap(), b"zeros");
        assert!(!ws.resolve("pullrequests/a/b/9").exists());
        assert_eq!(
            fs::read(ws.resolve("pullrequests/a/b/7/sum/diff.txt")).unwrap(),
            b"seven"
        );
    }

    #[test]
    fn cancelled_merge_writes_nothing() {
        let (_tmp, ws) = ws();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = merge_entries(
            &ws,
            vec![Entry::new("repos/a/b/x", "1"), Entry::new("loose.txt", "2")],
            &cancel,
        );
        assert_eq!(report.cancelled, vec!["a/b", "loose.txt"]);
        assert_eq!(report.files_written, 0);
        assert!(!ws.resolve("repos/a/b/x").exists());
    }

    #[test]
    fn import_archive_keeps_good_records_and_reports_bad() {
        let (tmp, ws) = ws();
        let archive = tmp.path().join("in.txtar");
        fs::write(
            &archive,
            "-- repos/acme/widgets/a.md --\nA\n-- ../escape --\nx\n-- repos/acme/widgets/b.md --\ntrunc",
        )
        .unwrap();
        let report = import_path(&ws, &archive, &CancellationToken::new()).unwrap();
        assert_eq!(report.written, vec!["acme/widgets"]);
        assert_eq!(report.decode_errors.len(), 2);
        assert_eq!(fs::read(ws.resolve("repos/acme/widgets/a.md")).unwrap(), b"A\n");
        assert!(!ws.resolve("repos/acme/widgets/b.md").exists());
    }

    #[test]
    fn import_folder_and_preconditions() {
        let (tmp, ws) = ws();
        let src = tmp.path().join("incoming");
        write_atomic(&src.join("repos/acme/widgets/.crev/sum.repo.ai.md"), b"s").unwrap();
        write_atomic(&src.join("configs.json"), b"{}").unwrap();
        write_atomic(&src.join("other/ignored.txt"), b"i").unwrap();

        let report = import_path(&ws, &src, &CancellationToken::new()).unwrap();
        assert_eq!(report.written, vec!["acme/widgets"]);
        assert_eq!(report.files_written, 1);
        assert!(!ws.resolve("other/ignored.txt").exists());

        let plain = tmp.path().join("plain");
        fs::create_dir_all(&plain).unwrap();
        assert!(matches!(
            import_path(&ws, &plain, &CancellationToken::new()),
            Err(MergeError::NotWorkspaceFolder(_))
        ));
        let wrong_ext = tmp.path().join("in.zip");
        fs::write(&wrong_ext, "x").unwrap();
        assert!(matches!(
            import_path(&ws, &wrong_ext, &CancellationToken::new()),
            Err(MergeError::NotArchive(_))
        ));
        assert!(matches!(
            import_path(&ws, &tmp.path().join("nope.txtar"), &CancellationToken::new()),
            Err(MergeError::Missing(_))
        ));
    }

    #[test]
    fn all_failed_only_when_nothing_succeeded() {
        let mut report = MergeReport::default();
        assert!(!report.all_failed());
        report.decode_errors.push(RecordError::Truncated {
            path: "x".into(),
            line: 1,
        });
        assert!(report.all_failed());
        report.skipped.push("a/b".into());
        assert!(!report.all_failed());
    }
}
