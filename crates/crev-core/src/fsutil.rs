use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no parent dir for {}", path.display()),
        )
    })?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// All regular files under `dir`, sorted. `.git` directories and symlinks are skipped.
/// A missing `dir` yields an empty list.
pub fn walk_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if dir.is_dir() {
        walk_into(dir, &mut out)?;
    }
    out.sort();
    Ok(out)
}

fn walk_into(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let ft = entry.file_type()?;
        let path = entry.path();
        if ft.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            walk_into(&path, out)?;
        } else if ft.is_file() {
            out.push(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping non-regular file");
        }
    }
    Ok(())
}

/// True if any regular file exists anywhere under `dir`.
pub fn has_any_file(dir: &Path) -> io::Result<bool> {
    if !dir.is_dir() {
        return Ok(dir.is_file());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let ft = entry.file_type()?;
        if ft.is_dir() {
            if has_any_file(&entry.path())? {
                return Ok(true);
            }
        } else {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Content the text archive cannot carry: invalid UTF-8 or a NUL byte.
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.contains(&0) || std::str::from_utf8(bytes).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a").join("b").join("c.txt");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
        write_atomic(&path, b"again").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "again");
    }

    #[test]
    fn walk_files_sorted_and_skips_git() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join(".git").join("objects")).unwrap();
        fs::write(root.join("b").join("z.txt"), "z").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join(".git").join("HEAD"), "ref").unwrap();

        let files = walk_files(root).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(rel, vec![PathBuf::from("a.txt"), Path::new("b").join("z.txt")]);
        assert!(walk_files(&root.join("missing")).unwrap().is_empty());
    }

    #[test]
    fn has_any_file_ignores_empty_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("repos").join("acme");
        fs::create_dir_all(root.join("empty").join("deeper")).unwrap();
        assert!(!has_any_file(&root).unwrap());
        fs::write(root.join("empty").join("deeper").join("f"), "x").unwrap();
        assert!(has_any_file(&root).unwrap());
        assert!(!has_any_file(&tmp.path().join("nope")).unwrap());
    }

    #[test]
    fn binary_detection() {
        assert!(!is_binary(b"plain text\n"));
        assert!(!is_binary("héllo".as_bytes()));
        assert!(is_binary(b"a\0b"));
        assert!(is_binary(&[0xff, 0xfe, 0x41]));
    }
}
