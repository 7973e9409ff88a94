use crate::error::{DirStoreError, Result};
use crate::writer;
use std::fs;
use std::path::Path;

/// Reject moving the directory `old_id` under `new_dir`.
///
/// Both arguments are canonical ids relative to the collection root. The
/// check runs on the requested directory field before anything touches the
/// filesystem.
pub fn ensure_not_into_self(old_id: &str, new_dir: &str) -> Result<()> {
    let inside = new_dir == old_id
        || new_dir
            .strip_prefix(old_id)
            .is_some_and(|rest| rest.starts_with('/'));

    if inside {
        return Err(DirStoreError::CyclicMove {
            from: old_id.to_string(),
            to: new_dir.to_string(),
        });
    }
    Ok(())
}

/// Move a filesystem entry with a single rename, creating the destination parent.
///
/// An existing entry at `to` is never replaced; the move fails with
/// [`DirStoreError::AlreadyExists`] instead.
pub fn move_entry(from: &Path, to: &Path) -> Result<()> {
    if from == to {
        return Ok(());
    }
    // Case-only renames on case-insensitive filesystems resolve to `from`
    if fs::symlink_metadata(to).is_ok() && !writer::is_same_file(from, to)? {
        return Err(DirStoreError::AlreadyExists(to.display().to_string()));
    }
    if let Some(parent) = to.parent() {
        writer::ensure_dir(parent)?;
    }
    fs::rename(from, to)?;
    log::debug!("moved {} to {}", from.display(), to.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_moves_into_self() {
        assert!(matches!(
            ensure_not_into_self("rootdir", "rootdir"),
            Err(DirStoreError::CyclicMove { .. })
        ));
        assert!(ensure_not_into_self("rootdir", "rootdir/sub").is_err());
        assert!(ensure_not_into_self("a/b", "a/b/c/d").is_err());
    }

    #[test]
    fn test_allows_siblings_and_parents() {
        ensure_not_into_self("rootdir", "").unwrap();
        ensure_not_into_self("rootdir", "tmpdir").unwrap();
        // Shared prefix is not containment
        ensure_not_into_self("rootdir", "rootdir2").unwrap();
        ensure_not_into_self("a/b", "a").unwrap();
    }

    #[test]
    fn test_move_entry_renames_directory_tree() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("rootdir");
        fs::create_dir_all(from.join("sub")).unwrap();
        fs::write(from.join("sub/file.txt"), "x").unwrap();

        let to = tmp.path().join("newparent/rootdir");
        move_entry(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(to.join("sub/file.txt")).unwrap(), "x");
    }

    #[test]
    fn test_move_entry_refuses_to_replace_file() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.txt");
        let to = tmp.path().join("b.txt");
        fs::write(&from, "AAA").unwrap();
        fs::write(&to, "BBB").unwrap();

        assert!(matches!(
            move_entry(&from, &to),
            Err(DirStoreError::AlreadyExists(_))
        ));
        assert_eq!(fs::read_to_string(&from).unwrap(), "AAA");
        assert_eq!(fs::read_to_string(&to).unwrap(), "BBB");
    }

    #[test]
    fn test_move_entry_refuses_to_replace_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a");
        let to = tmp.path().join("b");
        fs::create_dir(&from).unwrap();
        fs::create_dir(&to).unwrap();

        assert!(matches!(
            move_entry(&from, &to),
            Err(DirStoreError::AlreadyExists(_))
        ));
        assert!(from.is_dir());
        assert!(to.is_dir());
    }

    #[test]
    fn test_move_entry_same_path_is_noop() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.txt");
        fs::write(&path, "x").unwrap();

        move_entry(&path, &path).unwrap();
        assert!(path.exists());
    }
}
