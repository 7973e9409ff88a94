use crate::content::Content;
use crate::error::Result;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Create a directory and all of its parents. Existing directories are fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Create a directory document, including missing parents.
pub fn create_directory(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Persist content at `target`, replacing whatever file is there.
///
/// Streams are drained into a temporary file next to the target, flushed and
/// synced, then renamed over it, so a failed write never leaves a truncated
/// document behind. File references are copied byte for byte and the source
/// is left in place. Returns the number of bytes written.
pub fn write_content(target: &Path, content: Content) -> Result<u64> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    match content {
        Content::Stream(mut reader) => {
            let mut tmp = NamedTempFile::new_in(parent)?;
            let written = {
                let mut out = BufWriter::new(tmp.as_file_mut());
                let written = io::copy(&mut reader, &mut out)?;
                out.flush()?;
                written
            };
            tmp.as_file().sync_all()?;
            tmp.persist(target).map_err(|e| e.error)?;
            log::debug!("wrote {written} bytes to {}", target.display());
            Ok(written)
        }
        Content::File(source) => {
            if is_same_file(source.path(), target)? {
                return Ok(fs::metadata(target)?.len());
            }
            let written = fs::copy(source.path(), target)?;
            log::debug!(
                "copied {written} bytes from {} to {}",
                source.path().display(),
                target.display()
            );
            Ok(written)
        }
    }
}

pub(crate) fn is_same_file(a: &Path, b: &Path) -> Result<bool> {
    if !b.exists() {
        return Ok(false);
    }
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}
