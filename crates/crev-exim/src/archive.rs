//! Text archive codec (txtar-compatible).
//!
//! An archive is a sequence of records. Each record is a header line
//! `-- {path} --` followed by the file's lines. A header written as
//! `-- {path} -- noeol` marks content that had no trailing newline; the
//! encoder adds one so every record ends on a line boundary.
//!
//! Content lines that would read as a header once all leading `\` are
//! removed get one extra leading `\`, and decode removes exactly one.
//! That mapping is a bijection, so arbitrary text round-trips unchanged,
//! including lines like `-- x --` or `\-- x --` inside a file.

use crev_core::{is_binary, validate_relative};
use serde::Serialize;
use std::collections::HashSet;

const NOEOL: &str = " -- noeol";

/// A workspace-relative path and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub content: Vec<u8>,
}

impl Entry {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A record the decoder could not accept. `line` is the 1-based header line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    #[error("line {line}: record {path} is truncated")]
    Truncated { path: String, line: usize },
    #[error("line {line}: unsafe path {path:?}: {reason}")]
    UnsafePath {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("line {line}: duplicate path {path}, keeping the first")]
    DuplicatePath { path: String, line: usize },
}

/// Why the encoder refused a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejected {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    pub text: String,
    pub paths: Vec<String>,
    pub rejected: Vec<Rejected>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Text before the first header.
    pub comment: String,
    pub entries: Vec<Entry>,
    pub errors: Vec<RecordError>,
}

/// `-- path --` or `-- path -- noeol`. Returns the path and the noeol flag.
fn parse_header(line: &str) -> Option<(&str, bool)> {
    let rest = line.strip_prefix("-- ")?;
    if let Some(path) = rest.strip_suffix(" --") {
        if !path.is_empty() {
            return Some((path, false));
        }
    }
    match rest.strip_suffix(NOEOL) {
        Some(path) if !path.is_empty() => Some((path, true)),
        _ => None,
    }
}

fn needs_escape(line: &str) -> bool {
    parse_header(line.trim_start_matches('\\')).is_some()
}

fn check_path(path: &str) -> Result<(), String> {
    if path.contains(['\n', '\r']) {
        return Err("path contains a line break".into());
    }
    validate_relative(path).map_err(|e| e.to_string())
}

/// Encode `entries` in order. Binary content and unsafe paths are rejected
/// and listed; every other entry becomes exactly one record.
pub fn encode(entries: &[Entry]) -> Encoded {
    let mut out = Encoded::default();
    for entry in entries {
        if let Err(reason) = check_path(&entry.path) {
            out.rejected.push(Rejected {
                path: entry.path.clone(),
                reason,
            });
            continue;
        }
        let content = match std::str::from_utf8(&entry.content) {
            Ok(text) if !is_binary(&entry.content) => text,
            _ => {
                tracing::warn!(path = %entry.path, "binary file not supported in archive");
                out.rejected.push(Rejected {
                    path: entry.path.clone(),
                    reason: "binary content".into(),
                });
                continue;
            }
        };
        push_record(&mut out.text, &entry.path, content);
        out.paths.push(entry.path.clone());
    }
    out
}

fn push_record(out: &mut String, path: &str, content: &str) {
    let noeol = !content.is_empty() && !content.ends_with('\n');
    out.push_str("-- ");
    out.push_str(path);
    out.push_str(if noeol { NOEOL } else { " --" });
    out.push('\n');
    for seg in content.split_inclusive('\n') {
        let line = seg.strip_suffix('\n').unwrap_or(seg);
        if needs_escape(line) {
            out.push('\\');
        }
        out.push_str(seg);
    }
    if noeol {
        out.push('\n');
    }
}

struct Pending<'a> {
    path: &'a str,
    noeol: bool,
    line: usize,
    header_complete: bool,
    body: String,
}

/// Parse an archive. Never fails as a whole: bad records are reported in
/// `errors` and every other record is still returned, in archive order.
pub fn decode(text: &str) -> Decoded {
    let mut out = Decoded::default();
    let mut seen = HashSet::new();
    let mut current: Option<Pending> = None;

    for (idx, seg) in text.split_inclusive('\n').enumerate() {
        let line = seg.strip_suffix('\n').unwrap_or(seg);
        if let Some((path, noeol)) = parse_header(line) {
            if let Some(done) = current.take() {
                finish(done, &mut seen, &mut out);
            }
            current = Some(Pending {
                path,
                noeol,
                line: idx + 1,
                header_complete: seg.ends_with('\n'),
                body: String::new(),
            });
            continue;
        }
        match current.as_mut() {
            None => out.comment.push_str(seg),
            Some(rec) => {
                if line.starts_with('\\') && needs_escape(line) {
                    rec.body.push_str(&seg[1..]);
                } else {
                    rec.body.push_str(seg);
                }
            }
        }
    }
    if let Some(done) = current.take() {
        finish(done, &mut seen, &mut out);
    }
    out
}

fn finish<'a>(rec: Pending<'a>, seen: &mut HashSet<&'a str>, out: &mut Decoded) {
    let truncated = !rec.header_complete
        || (!rec.body.is_empty() && !rec.body.ends_with('\n'))
        || (rec.noeol && rec.body.is_empty());
    if truncated {
        out.errors.push(RecordError::Truncated {
            path: rec.path.to_string(),
            line: rec.line,
        });
        return;
    }
    if let Err(reason) = check_path(rec.path) {
        out.errors.push(RecordError::UnsafePath {
            path: rec.path.to_string(),
            line: rec.line,
            reason,
        });
        return;
    }
    if !seen.insert(rec.path) {
        out.errors.push(RecordError::DuplicatePath {
            path: rec.path.to_string(),
            line: rec.line,
        });
        return;
    }
    let mut body = rec.body;
    if rec.noeol {
        body.pop();
    }
    out.entries.push(Entry::new(rec.path, body));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(entries: Vec<Entry>) {
        let enc = encode(&entries);
        assert!(enc.rejected.is_empty(), "{:?}", enc.rejected);
        let dec = decode(&enc.text);
        assert!(dec.errors.is_empty(), "{:?}", dec.errors);
        assert_eq!(dec.entries, entries);
    }

    #[test]
    fn single_record_scenario() {
        let text = encode(&[Entry::new("repos/acme/widgets/app.txt", "x")]).text;
        assert_eq!(text, "-- repos/acme/widgets/app.txt -- noeol\nx\n");
        let dec = decode(&text);
        assert_eq!(dec.entries, vec![Entry::new("repos/acme/widgets/app.txt", "x")]);
    }

    #[test]
    fn plain_text_files_use_plain_headers() {
        let text = encode(&[
            Entry::new("a.md", "one\ntwo\n"),
            Entry::new("empty.md", ""),
        ])
        .text;
        assert_eq!(text, "-- a.md --\none\ntwo\n-- empty.md --\n");
    }

    #[test]
    fn near_match_boundary_lines_roundtrip() {
        let tricky = [
            "-- a.md --",
            "\\-- a.md --",
            "\\\\-- a.md -- noeol",
            "-- --",
            "--  --",
            "--a.md--",
            "-- a.md --\r",
            "- - a.md - -",
            "-- a.md -- noeol",
            "\\",
            "\\\\",
        ];
        let content = tricky.join("\n") + "\n";
        roundtrip(vec![
            Entry::new("notes/tricky.md", content.clone()),
            Entry::new("notes/tricky-noeol.md", content.trim_end().to_string()),
            Entry::new("after.md", "still here\n"),
        ]);
    }

    #[test]
    fn escaped_lines_carry_one_extra_backslash() {
        let text = encode(&[Entry::new("f", "-- g --\n\\-- g --\nplain\n")]).text;
        assert_eq!(text, "-- f --\n\\-- g --\n\\\\-- g --\nplain\n");
    }

    #[test]
    fn comment_before_first_header_is_ignored() {
        let dec = decode("exported by crev\n\n-- a --\nA\n");
        assert_eq!(dec.comment, "exported by crev\n\n");
        assert_eq!(dec.entries, vec![Entry::new("a", "A\n")]);
    }

    #[test]
    fn foreign_txtar_is_accepted() {
        let dec = decode("-- hello.txt --\nhello\n-- sub/world.txt --\nworld\n");
        assert_eq!(dec.entries.len(), 2);
        assert_eq!(dec.entries[1].content, b"world\n");
    }

    #[test]
    fn truncated_last_record_keeps_earlier_ones() {
        let dec = decode("-- a --\nA\n-- b --\nhalf a li");
        assert_eq!(dec.entries, vec![Entry::new("a", "A\n")]);
        assert_eq!(
            dec.errors,
            vec![RecordError::Truncated {
                path: "b".into(),
                line: 3
            }]
        );
    }

    #[test]
    fn empty_noeol_record_is_truncated() {
        let dec = decode("-- a -- noeol\n-- b --\nB\n");
        assert_eq!(dec.entries, vec![Entry::new("b", "B\n")]);
        assert!(matches!(dec.errors[0], RecordError::Truncated { .. }));
    }

    #[test]
    fn header_at_eof_without_newline_is_truncated() {
        let dec = decode("-- a --\nA\n-- b --");
        assert_eq!(dec.entries.len(), 1);
        assert!(matches!(dec.errors[0], RecordError::Truncated { ref path, .. } if path == "b"));
    }

    #[test]
    fn bad_records_in_the_middle_do_not_hide_later_ones() {
        let dec = decode("-- ../etc/passwd --\nx\n-- a --\n1\n-- a --\n2\n-- /abs --\n3\n-- c --\n4\n");
        let paths: Vec<_> = dec.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "c"]);
        assert_eq!(dec.entries[0].content, b"1\n");
        assert_eq!(dec.errors.len(), 3);
        assert!(matches!(dec.errors[0], RecordError::UnsafePath { line: 1, .. }));
        assert!(matches!(dec.errors[1], RecordError::DuplicatePath { line: 5, .. }));
        assert!(matches!(dec.errors[2], RecordError::UnsafePath { line: 7, .. }));
    }

    #[test]
    fn encoder_rejects_binary_and_unsafe_paths() {
        let enc = encode(&[
            Entry::new("ok.txt", "fine\n"),
            Entry::new("img.png", vec![0x89, 0x50, 0x4e, 0x47, 0x00]),
            Entry::new("bad\nname", "x"),
            Entry::new("../up", "x"),
        ]);
        assert_eq!(enc.paths, vec!["ok.txt"]);
        let rejected: Vec<_> = enc.rejected.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(rejected, vec!["img.png", "bad\nname", "../up"]);
        assert_eq!(enc.text, "-- ok.txt --\nfine\n");
    }

    #[test]
    fn every_input_is_either_encoded_or_rejected() {
        let entries = vec![
            Entry::new("latin1.txt", vec![b'c', b'a', b'f', 0xe9, b'\n']),
            Entry::new("nul.txt", "a\0b"),
            Entry::new("", "x"),
            Entry::new("ok.md", "# ok"),
        ];
        let enc = encode(&entries);
        assert_eq!(enc.paths.len() + enc.rejected.len(), entries.len());
        assert_eq!(enc.paths, vec!["ok.md"]);
        let latin1 = enc.rejected.iter().find(|r| r.path == "latin1.txt").unwrap();
        assert_eq!(latin1.reason, "binary content");
    }

    #[test]
    fn crlf_and_unicode_roundtrip() {
        roundtrip(vec![
            Entry::new("win.txt", "a\r\nb\r\n"),
            Entry::new("uni/ünï.md", "héllo -- wörld --\n"),
            Entry::new("blank-lines.txt", "\n\n\n"),
        ]);
    }
}
