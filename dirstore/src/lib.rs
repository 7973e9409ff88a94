pub mod cache;
pub mod config;
pub mod content;
pub mod document;
pub mod driver;
pub mod error;
pub mod path;
pub mod sniff;
pub mod storage;
pub mod tree;
pub mod watcher;
pub mod writer;

pub use cache::{CachedDriver, QueryCache};
pub use config::{IdStrategy, StorageConfig};
pub use content::{Content, FileRef};
pub use document::{Document, DocumentPatch, Field, NewDocument};
pub use driver::{Driver, ListQuery, ListResult};
pub use error::{DirStoreError, Result};
pub use sniff::DIR_TYPE;
pub use storage::{Storage, StorageDriver};
