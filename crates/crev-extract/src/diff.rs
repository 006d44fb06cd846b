//! Changed-path enumeration from `git diff` output.
//!
//! Paths come from the extended header of each file section: the
//! `diff --git` line, `rename`/`copy` lines and the `---`/`+++` lines.
//! Hunk bodies are never inspected, so a removed line that happens to start
//! with `--` cannot be mistaken for a header.

use std::collections::HashSet;

/// Every path touched by `diff`, in order of first appearance, deduplicated.
/// For renames both the old and the new path are listed.
pub fn changed_paths(diff: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |p: String, out: &mut Vec<String>| {
        if !p.is_empty() && seen.insert(p.clone()) {
            out.push(p);
        }
    };

    let mut in_header = false;
    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            in_header = true;
            if let Some((a, b)) = parse_git_header(rest) {
                push(a, &mut out);
                push(b, &mut out);
            }
            continue;
        }
        if !in_header {
            continue;
        }
        if line.starts_with("@@") {
            in_header = false;
            continue;
        }
        for prefix in ["rename from ", "rename to ", "copy from ", "copy to "] {
            if let Some(p) = line.strip_prefix(prefix) {
                push(unquote_path(p), &mut out);
            }
        }
        if let Some(p) = line.strip_prefix("--- ") {
            if let Some(p) = side_path(p, "a/") {
                push(p, &mut out);
            }
        } else if let Some(p) = line.strip_prefix("+++ ") {
            if let Some(p) = side_path(p, "b/") {
                push(p, &mut out);
            }
        }
    }
    out
}

/// `a/foo` → `foo`; `/dev/null` → None.
///
/// Git terminates an unquoted name containing a space with a TAB here.
fn side_path(raw: &str, prefix: &str) -> Option<String> {
    let raw = if raw.starts_with('"') {
        raw
    } else {
        raw.strip_suffix('\t').unwrap_or(raw)
    };
    let p = unquote_path(raw);
    if p == "/dev/null" {
        return None;
    }
    Some(p.strip_prefix(prefix).map(str::to_string).unwrap_or(p))
}

/// Split the remainder of `diff --git ` into the two side paths.
fn parse_git_header(rest: &str) -> Option<(String, String)> {
    if rest.starts_with('"') {
        let (a, tail) = unquote(rest)?;
        let tail = tail.strip_prefix(' ')?;
        let b = if tail.starts_with('"') {
            unquote(tail)?.0
        } else {
            tail.to_string()
        };
        return Some((strip_side(a, "a/"), strip_side(b, "b/")));
    }
    if rest.ends_with('"') {
        let idx = rest.rfind(" \"")?;
        let (b, _) = unquote(&rest[idx + 1..])?;
        return Some((strip_side(rest[..idx].to_string(), "a/"), strip_side(b, "b/")));
    }
    // Unquoted: `a/X b/X` is only unambiguous when both sides match.
    let n = rest.len().checked_sub(5)?;
    if n % 2 != 0 {
        return None;
    }
    let half = n / 2;
    let a = rest.get(2..2 + half)?;
    let sep = rest.get(2 + half..5 + half)?;
    let b = rest.get(5 + half..)?;
    if rest.starts_with("a/") && sep == " b/" && a == b {
        Some((a.to_string(), b.to_string()))
    } else {
        None
    }
}

fn strip_side(p: String, prefix: &str) -> String {
    match p.strip_prefix(prefix) {
        Some(s) => s.to_string(),
        None => p,
    }
}

fn unquote_path(raw: &str) -> String {
    if raw.starts_with('"') {
        if let Some((s, _)) = unquote(raw) {
            return s;
        }
    }
    raw.to_string()
}

/// Decode a git C-style quoted string starting at `s[0] == '"'`.
/// Returns the decoded value and the text after the closing quote.
fn unquote(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let bytes = body.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let value = String::from_utf8_lossy(&out).into_owned();
                return Some((value, &body[i + 1..]));
            }
            b'\\' => {
                let esc = *bytes.get(i + 1)?;
                i += 2;
                match esc {
                    b'n' => out.push(b'\n'),
                    b't' => out.push(b'\t'),
                    b'r' => out.push(b'\r'),
                    b'a' => out.push(0x07),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'v' => out.push(0x0b),
                    b'0'..=b'7' => {
                        let digits = body.get(i - 1..i + 2)?;
                        let value = u8::from_str_radix(digits, 8).ok()?;
                        out.push(value);
                        i += 2;
                    }
                    other => out.push(other),
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    None
}
