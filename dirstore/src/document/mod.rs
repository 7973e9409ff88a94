// Document types - stored documents, creation input and sparse patches

use crate::content::{Content, FileRef};
use crate::error::{DirStoreError, Result};
use crate::sniff::DIR_TYPE;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One filesystem entry under a collection root.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub dir: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FileRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub modified_at: DateTime<Utc>,
}

impl Document {
    pub fn is_dir(&self) -> bool {
        self.doc_type == DIR_TYPE
    }
}

/// Input to `create`. Unset fields are derived from the id, which is
/// generated when absent.
#[derive(Debug, Default)]
pub struct NewDocument {
    pub id: Option<String>,
    pub name: Option<String>,
    pub dir: Option<String>,
    pub doc_type: Option<String>,
    pub data: Option<Content>,
}

impl NewDocument {
    pub fn file(data: Content) -> Self {
        NewDocument {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn directory() -> Self {
        NewDocument {
            doc_type: Some(DIR_TYPE.to_string()),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn data(mut self, data: Content) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_directory(&self) -> bool {
        self.doc_type.as_deref() == Some(DIR_TYPE)
    }
}

/// One field of a sparse overlay.
#[derive(Debug)]
pub enum Field<T> {
    /// Omitted: keep the current value
    Unset,
    /// Explicit null: clear the current value
    Clear,
    Set(T),
}

impl<T> Field<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    /// Overlay this field onto the current value.
    pub fn merge(self, current: Option<T>) -> Option<T> {
        match self {
            Field::Unset => current,
            Field::Clear => None,
            Field::Set(value) => Some(value),
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unset
    }
}

/// Input to `patch`: a sparse overlay of the document fields.
#[derive(Debug, Default)]
pub struct DocumentPatch {
    pub name: Field<String>,
    pub dir: Field<String>,
    pub doc_type: Field<String>,
    pub data: Field<Content>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Field::Set(name.into());
        self
    }

    pub fn dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Field::Set(dir.into());
        self
    }

    pub fn clear_dir(mut self) -> Self {
        self.dir = Field::Clear;
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Field::Set(doc_type.into());
        self
    }

    pub fn clear_doc_type(mut self) -> Self {
        self.doc_type = Field::Clear;
        self
    }

    pub fn data(mut self, data: Content) -> Self {
        self.data = Field::Set(data);
        self
    }

    /// Build a patch from a JSON object.
    ///
    /// Missing keys are left unset, `null` clears and strings set. A string
    /// `data` value becomes the new content bytes.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            DirStoreError::Validation("patch must be a JSON object".into())
        })?;

        let text = |key: &str| -> Result<Field<String>> {
            match object.get(key) {
                None => Ok(Field::Unset),
                Some(serde_json::Value::Null) => Ok(Field::Clear),
                Some(serde_json::Value::String(s)) => Ok(Field::Set(s.clone())),
                Some(other) => Err(DirStoreError::Validation(format!(
                    "field '{key}' must be a string, got {other}"
                ))),
            }
        };

        Ok(DocumentPatch {
            name: text("name")?,
            dir: text("dir")?,
            doc_type: text("type")?,
            data: match text("data")? {
                Field::Unset => Field::Unset,
                Field::Clear => Field::Clear,
                Field::Set(body) => Field::Set(Content::from_bytes(body)),
            },
        })
    }
}
