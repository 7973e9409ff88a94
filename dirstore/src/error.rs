use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirStoreError {
    #[error("No file data")]
    NoData,

    #[error("Cannot detect file type")]
    UndetectableType,

    #[error("Cannot change type: {0}")]
    InvalidTypeChange(String),

    #[error("Cannot move directory {from} into itself or its own subtree ({to})")]
    CyclicMove { from: String, to: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document vanished after write: {collection}/{id}")]
    Vanished { collection: String, id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, DirStoreError>;
