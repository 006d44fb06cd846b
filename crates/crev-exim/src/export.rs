//! Export selected workspace files as a text archive or a folder copy.

use crate::archive::{encode, Entry, Rejected};
use anyhow::{bail, Context, Result};
use crev_core::paths::{to_workspace_path, CONFIG_FILE, PROMPTS_DIR, PULLREQUESTS_DIR, REPOS_DIR};
use crev_core::{validate_relative, walk_files, write_atomic, Scope, Workspace};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_EXPORT_NAME: &str = "export";
pub const ARCHIVE_EXTENSION: &str = "txtar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txtar,
    Folder,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Txtar => "txtar",
            OutputFormat::Folder => "folder",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "txtar" => Ok(OutputFormat::Txtar),
            "folder" => Ok(OutputFormat::Folder),
            other => bail!("unknown output format '{other}' (expected txtar or folder)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub name: String,
    pub format: OutputFormat,
    /// Top-level folders to walk; empty means `repos` and `pullrequests`.
    pub folders: Vec<String>,
    pub scope: Scope,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_EXPORT_NAME.to_string(),
            format: OutputFormat::default(),
            folders: Vec::new(),
            scope: Scope::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// `None` when nothing matched and nothing was written.
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub scope: Scope,
    pub files: Vec<String>,
    pub rejected: Vec<Rejected>,
}

impl ExportReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        match &self.output {
            Some(path) => out.push_str(&format!(
                "Exported {} file(s) to {}\n",
                self.files.len(),
                path.display()
            )),
            None => out.push_str(&format!("No files found matching scope '{}'\n", self.scope)),
        }
        for r in &self.rejected {
            out.push_str(&format!("  rejected {} ({})\n", r.path, r.reason));
        }
        out
    }
}

fn scope_folders(folders: &[String]) -> Vec<String> {
    if folders.is_empty() {
        vec![REPOS_DIR.to_string(), PULLREQUESTS_DIR.to_string()]
    } else {
        folders.to_vec()
    }
}

/// Workspace-relative paths under `folders` whose file name matches `scope`, sorted.
pub fn collect_export(ws: &Workspace, folders: &[String], scope: Scope) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for folder in scope_folders(folders) {
        validate_relative(&folder).with_context(|| format!("invalid scope folder '{folder}'"))?;
        let dir = ws.resolve(&folder);
        for file in walk_files(&dir).with_context(|| format!("walk {}", dir.display()))? {
            let Some(rel) = file.strip_prefix(&ws.root).ok().and_then(to_workspace_path) else {
                tracing::warn!(path = %file.display(), "skipping non-UTF-8 path");
                continue;
            };
            if scope.matches_path(&rel) {
                out.push(rel);
            }
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || validate_relative(name).is_err() {
        bail!("export name '{name}' must be a single path segment");
    }
    let reserved = [REPOS_DIR, PULLREQUESTS_DIR, PROMPTS_DIR, CONFIG_FILE];
    if reserved.contains(&name) {
        bail!("export name '{name}' is reserved by the workspace");
    }
    Ok(())
}

/// Export according to `opts`. `configs.json` always leads the output when present.
pub fn export(ws: &Workspace, opts: &ExportOptions) -> Result<ExportReport> {
    check_name(&opts.name)?;
    let files = collect_export(ws, &opts.folders, opts.scope)?;
    let mut report = ExportReport {
        format: opts.format,
        scope: opts.scope,
        ..Default::default()
    };
    if files.is_empty() {
        tracing::info!(scope = %opts.scope, "nothing to export");
        return Ok(report);
    }

    let with_config: Vec<String> = ws
        .config_json
        .is_file()
        .then(|| CONFIG_FILE.to_string())
        .into_iter()
        .chain(files.iter().cloned())
        .collect();

    match opts.format {
        OutputFormat::Txtar => {
            let mut entries = Vec::with_capacity(with_config.len());
            for rel in &with_config {
                let path = ws.resolve(rel);
                let content = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
                entries.push(Entry::new(rel.clone(), content));
            }
            let encoded = encode(&entries);
            let target = ws.root.join(format!("{}.{ARCHIVE_EXTENSION}", opts.name));
            write_atomic(&target, encoded.text.as_bytes())
                .with_context(|| format!("write {}", target.display()))?;
            report.files = encoded.paths;
            report.rejected = encoded.rejected;
            report.output = Some(target);
        }
        OutputFormat::Folder => {
            let target = ws.root.join(&opts.name);
            if target.is_dir() {
                fs::remove_dir_all(&target)
                    .with_context(|| format!("remove previous export {}", target.display()))?;
            } else if target.exists() {
                bail!("{} exists and is not a directory", target.display());
            }
            for rel in &with_config {
                let src = ws.resolve(rel);
                let mut dst = target.clone();
                dst.extend(rel.split('/'));
                if let Some(parent) = dst.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("create {}", parent.display()))?;
                }
                fs::copy(&src, &dst).with_context(|| format!("copy {}", src.display()))?;
            }
            report.files = with_config;
            report.output = Some(target);
        }
    }
    tracing::info!(files = report.files.len(), format = %opts.format, "export written");
    Ok(report)
}
