// Content handles - lazy file references and sniff-then-replay streams

use crate::error::Result;
use crate::sniff::{self, Sniffed};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// A handle to file bytes on disk. Nothing is opened until a read is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    path: PathBuf,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileRef { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }

    pub fn read_string(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    /// Sniff the type of the referenced file from its leading bytes.
    pub fn sniff(&self) -> Result<Option<Sniffed>> {
        let mut file = self.open()?;
        let head = sniff::read_head(&mut file)?;
        Ok(sniff::sniff(&head))
    }
}

/// Incoming document content: a byte stream or an existing file.
pub enum Content {
    Stream(Box<dyn Read + Send>),
    File(FileRef),
}

impl Content {
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Content::Stream(Box::new(reader))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Content::Stream(Box::new(Cursor::new(bytes.into())))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Content::File(FileRef::new(path))
    }

    /// Buffer the sniffable prefix of this content.
    ///
    /// Streams are read up to [`sniff::SNIFF_LEN`] bytes; the buffered
    /// prefix is replayed in front of the rest by [`Buffered::into_content`].
    pub fn buffer_head(self) -> Result<Buffered> {
        match self {
            Content::Stream(mut reader) => {
                let head = sniff::read_head(&mut reader)?;
                Ok(Buffered {
                    head,
                    source: Content::Stream(reader),
                })
            }
            Content::File(file) => {
                let mut handle = file.open()?;
                let head = sniff::read_head(&mut handle)?;
                Ok(Buffered {
                    head,
                    source: Content::File(file),
                })
            }
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Stream(_) => f.write_str("Content::Stream(..)"),
            Content::File(file) => f.debug_tuple("Content::File").field(&file.path).finish(),
        }
    }
}

impl From<FileRef> for Content {
    fn from(file: FileRef) -> Self {
        Content::File(file)
    }
}

/// Content whose leading bytes have been read for sniffing.
pub struct Buffered {
    head: Vec<u8>,
    source: Content,
}

impl Buffered {
    pub fn head(&self) -> &[u8] {
        &self.head
    }

    /// The full, unconsumed content: buffered prefix followed by the rest
    /// of the stream. File references are returned untouched.
    pub fn into_content(self) -> Content {
        match self.source {
            Content::Stream(rest) => {
                Content::Stream(Box::new(Cursor::new(self.head).chain(rest)))
            }
            file @ Content::File(_) => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn drain(content: Content) -> Vec<u8> {
        match content {
            Content::Stream(mut reader) => {
                let mut out = Vec::new();
                reader.read_to_end(&mut out).unwrap();
                out
            }
            Content::File(file) => file.read_bytes().unwrap(),
        }
    }

    #[test]
    fn test_buffering_replays_every_byte() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let buffered = Content::from_bytes(data.clone()).buffer_head().unwrap();
        assert_eq!(buffered.head(), &data[..sniff::SNIFF_LEN]);
        assert_eq!(drain(buffered.into_content()), data);
    }

    #[test]
    fn test_buffering_short_stream() {
        let buffered = Content::from_bytes("hello world").buffer_head().unwrap();
        assert_eq!(buffered.head(), b"hello world");
        assert_eq!(drain(buffered.into_content()), b"hello world");
    }

    #[test]
    fn test_file_ref_accessors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("note.txt");
        std::fs::write(&path, "say hi").unwrap();

        let file = FileRef::new(&path);
        assert_eq!(file.path(), path.as_path());
        assert_eq!(file.read_string().unwrap(), "say hi");
        assert_eq!(file.read_bytes().unwrap(), b"say hi");

        let mut opened = String::new();
        file.open().unwrap().read_to_string(&mut opened).unwrap();
        assert_eq!(opened, "say hi");
        assert!(file.sniff().unwrap().is_none());
    }

    #[test]
    fn test_file_content_stays_a_reference() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("image");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nrest").unwrap();

        let buffered = Content::from_path(&path).buffer_head().unwrap();
        assert_eq!(sniff::sniff(buffered.head()).unwrap().mime, "image/png");
        match buffered.into_content() {
            Content::File(file) => assert_eq!(file.path(), path.as_path()),
            other => panic!("expected a file reference, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_fails_to_buffer() {
        let tmp = TempDir::new().unwrap();
        let result = Content::from_path(tmp.path().join("missing")).buffer_head();
        assert!(result.is_err());
    }
}
