use crate::config::{IdStrategy, StorageConfig};
use crate::content::FileRef;
use crate::document::{Document, DocumentPatch, Field, NewDocument};
use crate::driver::{Driver, FieldKind, FieldSchema, FieldSpec, ListQuery, ListResult};
use crate::error::{DirStoreError, Result};
use crate::path::{self, ResolvedPath};
use crate::sniff::{self, DIR_TYPE};
use crate::tree;
use crate::writer;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Factory binding drivers to collections under a storage root.
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Self {
        Storage { config }
    }

    /// Storage rooted at `root` with default settings.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Storage::new(StorageConfig::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Get a driver for the named collection, creating its directory on demand.
    pub fn collection(&self, name: &str) -> Result<StorageDriver> {
        let normalized = path::normalize(name)?;
        if normalized.is_empty() || normalized.contains('/') {
            return Err(DirStoreError::InvalidPath(format!(
                "'{name}' is not a valid collection name"
            )));
        }

        let root = self.config.root.join(&normalized);
        writer::ensure_dir(&root)?;

        Ok(StorageDriver {
            name: normalized,
            root,
            ids: self.config.id,
        })
    }
}

/// A driver treating one collection directory as a document database.
///
/// There is no index: every call reads the live filesystem, and documents
/// exist exactly when an entry exists at their path.
#[derive(Debug, Clone)]
pub struct StorageDriver {
    name: String,
    root: PathBuf,
    ids: IdStrategy,
}

impl StorageDriver {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fields this driver exposes to the validation layer.
    pub fn schema() -> FieldSchema {
        FieldSchema::from([
            ("name", FieldSpec { kind: FieldKind::Text }),
            ("dir", FieldSpec { kind: FieldKind::Text }),
            ("type", FieldSpec { kind: FieldKind::Text }),
            ("data", FieldSpec { kind: FieldKind::Any }),
        ])
    }

    fn read(&self, path: &ResolvedPath) -> Result<Option<Document>> {
        let abs = path.absolute(&self.root);
        let meta = match fs::metadata(&abs) {
            Ok(meta) => meta,
            Err(_) if !abs.exists() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let modified_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let mut path = path.clone();
        let (doc_type, data, size) = if meta.is_dir() {
            path.fold_ext();
            (DIR_TYPE.to_string(), None, None)
        } else {
            (
                sniff::type_of_path(&abs)?,
                Some(FileRef::new(abs)),
                Some(meta.len()),
            )
        };

        Ok(Some(Document {
            id: path.id(),
            name: path.name().to_string(),
            dir: path.dir().to_string(),
            doc_type,
            data,
            size,
            modified_at,
        }))
    }

    /// Read back an entry this driver just wrote.
    fn reread(&self, path: &ResolvedPath) -> Result<Document> {
        self.read(path)?.ok_or_else(|| DirStoreError::Vanished {
            collection: self.name.clone(),
            id: path.id(),
        })
    }

    fn dir_path(&self, dir: &str) -> PathBuf {
        let mut abs = self.root.clone();
        for segment in dir.split('/').filter(|s| !s.is_empty()) {
            abs.push(segment);
        }
        abs
    }

    fn patch_directory(&self, old_path: ResolvedPath, patch: DocumentPatch) -> Result<Document> {
        match patch.doc_type {
            Field::Unset => {}
            Field::Set(ref t) if t == DIR_TYPE => {}
            Field::Set(t) => {
                return Err(DirStoreError::InvalidTypeChange(format!(
                    "directory cannot become {t}"
                )))
            }
            Field::Clear => {
                return Err(DirStoreError::InvalidTypeChange(
                    "directory type cannot be cleared".into(),
                ))
            }
        }
        if let Field::Set(_) = patch.data {
            return Err(DirStoreError::InvalidTypeChange(
                "directories cannot carry content".into(),
            ));
        }

        let mut new_path = old_path.clone();
        new_path.fold_ext();
        overlay(&mut new_path, patch.name, patch.dir)?;
        tree::ensure_not_into_self(&old_path.id(), new_path.dir())?;

        tree::move_entry(
            &old_path.absolute(&self.root),
            &new_path.absolute(&self.root),
        )?;
        log::debug!(
            "moved directory {}/{} to {}",
            self.name,
            old_path.id(),
            new_path.id()
        );
        self.reread(&new_path)
    }

    fn patch_file(
        &self,
        old: &Document,
        old_path: ResolvedPath,
        patch: DocumentPatch,
    ) -> Result<Document> {
        let DocumentPatch {
            name,
            dir,
            doc_type,
            data,
        } = patch;

        let mut new_path = old_path.clone();
        overlay(&mut new_path, name, dir)?;

        match data {
            Field::Set(content) => {
                // New content is created from scratch so the stored type and
                // extension always match what the bytes sniff as.
                let declared = doc_type.merge(Some(old.doc_type.clone()));
                let created = self.create(NewDocument {
                    id: Some(new_path.id()),
                    name: Some(new_path.name().to_string()),
                    dir: Some(new_path.dir().to_string()),
                    doc_type: declared,
                    data: Some(content),
                })?;
                if created.id != old.id {
                    self.remove(&old.id)?;
                }
                return Ok(created);
            }
            Field::Clear => return Err(DirStoreError::NoData),
            Field::Unset => {}
        }

        let new_type = match doc_type {
            Field::Set(t) => t,
            Field::Unset | Field::Clear => old.doc_type.clone(),
        };
        if new_type != old.doc_type {
            if !(sniff::is_text(&old.doc_type) && sniff::is_text(&new_type)) {
                return Err(DirStoreError::InvalidTypeChange(format!(
                    "cannot change non-text type ({} to {new_type}) without new content",
                    old.doc_type
                )));
            }
            match sniff::extension_for(&new_type) {
                Some(ext) => new_path.set_ext(ext),
                None => new_path.clear_ext(),
            }
        }

        tree::move_entry(
            &old_path.absolute(&self.root),
            &new_path.absolute(&self.root),
        )?;
        log::debug!("moved {}/{} to {}", self.name, old.id, new_path.id());
        self.reread(&new_path)
    }
}

/// Apply the name and dir fields of a patch. Clearing `dir` moves to the root.
fn overlay(path: &mut ResolvedPath, name: Field<String>, dir: Field<String>) -> Result<()> {
    match name {
        Field::Unset => {}
        Field::Clear => {
            return Err(DirStoreError::InvalidPath(
                "document name cannot be cleared".into(),
            ))
        }
        Field::Set(name) => path.set_name(&name)?,
    }
    match dir {
        Field::Unset => {}
        Field::Clear => path.set_dir("")?,
        Field::Set(dir) => path.set_dir(&dir)?,
    }
    Ok(())
}

impl Driver for StorageDriver {
    type Document = Document;
    type Input = NewDocument;
    type Patch = DocumentPatch;

    fn namespace(&self) -> &str {
        &self.name
    }

    fn id(&self, raw: Option<&str>) -> String {
        match raw {
            Some(raw) if !raw.is_empty() => raw.to_string(),
            _ => self.ids.generate(),
        }
    }

    fn get(&self, id: &str) -> Result<Option<Document>> {
        let path = ResolvedPath::parse(id)?;
        self.read(&path)
    }

    /// List the direct children of one directory.
    ///
    /// The only accepted filter is `dir` (default: the collection root);
    /// any other filter shape yields an empty result. Listings are never
    /// paginated, so `limit` is always `-1`.
    fn list(&self, query: &ListQuery) -> Result<ListResult<Document>> {
        let filters: Vec<_> = query.filters().collect();
        let requested = match filters.as_slice() {
            [] => ".",
            [(key, serde_json::Value::String(dir))] if key.as_str() == "dir" => dir.as_str(),
            _ => return Ok(ListResult::empty()),
        };

        let dir = path::normalize(requested)?;
        let abs = self.dir_path(&dir);
        if !abs.is_dir() {
            return Ok(ListResult::empty());
        }

        let mut names: Vec<String> = fs::read_dir(&abs)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        let mut data = Vec::with_capacity(names.len());
        for name in names {
            let id = if dir.is_empty() {
                name
            } else {
                format!("{dir}/{name}")
            };
            match self.get(&id)? {
                Some(doc) => data.push(doc),
                None => log::warn!("{}/{} vanished while listing", self.name, id),
            }
        }

        Ok(ListResult::unbounded(data))
    }

    fn create(&self, doc: NewDocument) -> Result<Document> {
        let is_dir = doc.is_directory();
        let NewDocument {
            id,
            name,
            dir,
            doc_type,
            data,
        } = doc;

        let raw_id = self.id(id.as_deref());
        let mut path = ResolvedPath::parse(&raw_id)?;
        if let Some(name) = &name {
            path.set_name(name)?;
        }
        if let Some(dir) = &dir {
            path.set_dir(dir)?;
        }

        if is_dir {
            if data.is_some() {
                return Err(DirStoreError::Validation(
                    "directory documents cannot carry data".into(),
                ));
            }
            if name.is_some() {
                path.clear_ext();
            }
            writer::create_directory(&path.absolute(&self.root))?;
            log::debug!("created directory {}/{}", self.name, path.id());
            return self.reread(&path);
        }

        let content = data.ok_or(DirStoreError::NoData)?;
        let buffered = content.buffer_head()?;
        let sniffed = sniff::classify(buffered.head(), doc_type.as_deref())?;
        path.set_ext(&sniffed.ext);

        let written = writer::write_content(&path.absolute(&self.root), buffered.into_content())?;
        log::debug!(
            "created {}/{} ({}, {written} bytes)",
            self.name,
            path.id(),
            sniffed.mime
        );
        self.reread(&path)
    }

    /// Overlay `patch` onto an existing document.
    ///
    /// Directories are renamed in place. Files with new content are created
    /// anew and the old entry is removed afterwards; without new content
    /// they are renamed, and may only switch between text types.
    fn patch(&self, id: &str, patch: DocumentPatch) -> Result<Option<Document>> {
        let old_path = ResolvedPath::parse(id)?;
        let Some(old) = self.read(&old_path)? else {
            return Ok(None);
        };

        let doc = if old.is_dir() {
            self.patch_directory(old_path, patch)?
        } else {
            self.patch_file(&old, old_path, patch)?
        };
        Ok(Some(doc))
    }

    /// Delete a document, recursively for directories. The returned
    /// document describes the entry as it was before deletion.
    fn remove(&self, id: &str) -> Result<Option<Document>> {
        let path = ResolvedPath::parse(id)?;
        let Some(doc) = self.read(&path)? else {
            return Ok(None);
        };

        let abs = path.absolute(&self.root);
        if doc.is_dir() {
            fs::remove_dir_all(&abs)?;
        } else {
            fs::remove_file(&abs)?;
        }
        log::debug!("removed {}/{}", self.name, doc.id);
        Ok(Some(doc))
    }
}
