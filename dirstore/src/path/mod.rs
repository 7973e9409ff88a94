// Path resolution - normalization, name/ext/dir splitting, id regeneration

use crate::error::{DirStoreError, Result};
use std::path::{Path, PathBuf};

/// Normalize a raw relative path into its canonical form.
///
/// Empty and `.` segments are dropped, `..` pops the previous segment and
/// both `/` and `\` act as separators. A leading `/` is relative to the
/// collection root. The root itself normalizes to `""`.
pub fn normalize(raw: &str) -> Result<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(DirStoreError::InvalidPath(format!(
                        "'{raw}' escapes the collection root"
                    )));
                }
            }
            s => parts.push(s),
        }
    }
    Ok(parts.join("/"))
}

/// A document path split into its components.
///
/// The canonical id is always regenerated from the parts, so updating the
/// name, directory or extension keeps `id == join(dir, name + ext)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    dir: String,
    name: String,
    ext: String,
}

impl ResolvedPath {
    /// Resolve a raw document id.
    pub fn parse(id: &str) -> Result<Self> {
        let normalized = normalize(id)?;
        if normalized.is_empty() {
            return Err(DirStoreError::InvalidPath(format!(
                "'{id}' does not name a document"
            )));
        }

        let (dir, base) = match normalized.rfind('/') {
            Some(i) => (&normalized[..i], &normalized[i + 1..]),
            None => ("", normalized.as_str()),
        };
        let (name, ext) = split_base(base);

        Ok(ResolvedPath {
            dir: dir.to_string(),
            name: name.to_string(),
            ext: ext.to_string(),
        })
    }

    /// Build a path from a directory and a bare name (no extension yet).
    pub fn from_parts(dir: &str, name: &str) -> Result<Self> {
        let mut path = ResolvedPath {
            dir: String::new(),
            name: String::new(),
            ext: String::new(),
        };
        path.set_dir(dir)?;
        path.set_name(name)?;
        Ok(path)
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension including its leading dot, or `""`.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn base(&self) -> String {
        format!("{}{}", self.name, self.ext)
    }

    pub fn id(&self) -> String {
        if self.dir.is_empty() {
            self.base()
        } else {
            format!("{}/{}", self.dir, self.base())
        }
    }

    /// Names are a single path segment.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let normalized = normalize(name)?;
        if normalized.is_empty() || normalized.contains('/') {
            return Err(DirStoreError::InvalidPath(format!(
                "'{name}' is not a valid document name"
            )));
        }
        self.name = normalized;
        Ok(())
    }

    pub fn set_dir(&mut self, dir: &str) -> Result<()> {
        self.dir = normalize(dir)?;
        Ok(())
    }

    /// Set the extension, with or without a leading dot.
    pub fn set_ext(&mut self, ext: &str) {
        let ext = ext.trim_start_matches('.');
        self.ext = if ext.is_empty() {
            String::new()
        } else {
            format!(".{ext}")
        };
    }

    pub fn clear_ext(&mut self) {
        self.ext.clear();
    }

    /// Make the whole base the name. Directories carry no extension.
    pub fn fold_ext(&mut self) {
        if !self.ext.is_empty() {
            self.name = self.base();
            self.ext.clear();
        }
    }

    /// Absolute location of this document under a collection root.
    pub fn absolute(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.id().split('/') {
            path.push(segment);
        }
        path
    }
}

/// Split a base filename the way `name.ext` is usually read: the last dot
/// starts the extension unless it is the first character.
fn split_base(base: &str) -> (&str, &str) {
    match base.rfind('.') {
        Some(i) if i > 0 => (&base[..i], &base[i..]),
        _ => (base, ""),
    }
}
