//! Persist a buffer to disk, but only touch the file if its contents
//! actually changed.
//!
//! Codegen output is deterministic (see spec.md §8, "source determinism"),
//! so re-running generation against an unchanged catalog produces
//! byte-identical source files. Rewriting them anyway would bump their
//! mtime on every start-up, defeating downstream build caches (`cargo`,
//! file watchers, incremental compilers) that key off it.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Write `contents` to `path`, unless a file already exists at `path` with
/// the exact same contents.
///
/// Returns `true` if the file was (over)written, `false` if it was left
/// untouched because it already matched.
pub fn persist_if_changed(path: &Path, contents: &[u8]) -> Result<bool, anyhow::Error> {
    if let Ok(existing) = fs_err::read(path) {
        if digest(&existing) == digest(contents) {
            tracing::trace!(path = %path.display(), "Skipping write, contents unchanged");
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, contents)?;
    tracing::debug!(path = %path.display(), "Persisted file");
    Ok(true)
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_when_missing_and_skips_when_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.rs");

        assert!(persist_if_changed(&path, b"fn main() {}").unwrap());
        let mtime_after_first_write = fs_err::metadata(&path).unwrap().modified().unwrap();

        assert!(!persist_if_changed(&path, b"fn main() {}").unwrap());
        let mtime_after_second_write = fs_err::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(mtime_after_first_write, mtime_after_second_write);

        assert!(persist_if_changed(&path, b"fn main() { loop {} }").unwrap());
    }
}
