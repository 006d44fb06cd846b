//! Shared formatting pieces: language hints, fences, absence sentinels.

use std::path::Path;

pub const FILE_NOT_FOUND: &str = "*File not found*";
pub const NEWLY_ADDED: &str = "*File did not exist (newly added)*";
pub const DELETED: &str = "*File was deleted*";
pub const BINARY_FILE: &str = "*Binary file (not shown)*";
pub const NO_FILES_IN_CATEGORY: &str = "*No files in this category*";

/// Fence language for a path, derived from its extension.
/// Unknown extensions are passed through; no extension yields "".
pub fn language_hint(path: &str) -> &str {
    let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
        return "";
    };
    match ext {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "jsx" => "jsx",
        "rb" => "ruby",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "kt" => "kotlin",
        "swift" => "swift",
        "cs" => "csharp",
        "cpp" => "cpp",
        "c" | "h" => "c",
        "hpp" => "cpp",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "md" => "markdown",
        "sh" | "bash" | "zsh" => "bash",
        "sql" => "sql",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "xml" => "xml",
        other => other,
    }
}

/// Content as it will be shown: text, or a marker for undisplayable bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    Text(String),
    Binary,
}

impl Snapshot {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        if crev_core::is_binary(&bytes) {
            return Snapshot::Binary;
        }
        match String::from_utf8(bytes) {
            Ok(s) => Snapshot::Text(s),
            Err(_) => Snapshot::Binary,
        }
    }
}

/// Append `content` in a fenced block. The fence is longer than any
/// backtick run inside the content so the block cannot close early.
pub(crate) fn push_fenced(out: &mut String, lang: &str, content: &str) {
    let fence = "`".repeat(longest_backtick_run(content).max(2) + 1);
    out.push_str(&fence);
    out.push_str(lang);
    out.push('\n');
    out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out.push_str("\n\n");
}

pub(crate) fn push_snapshot(out: &mut String, path: &str, snapshot: &Snapshot) {
    match snapshot {
        Snapshot::Text(text) => push_fenced(out, language_hint(path), text),
        Snapshot::Binary => {
            out.push_str(BINARY_FILE);
            out.push_str("\n\n");
        }
    }
}

fn longest_backtick_run(s: &str) -> usize {
    let mut best = 0;
    let mut run = 0;
    for c in s.chars() {
        if c == '`' {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}
