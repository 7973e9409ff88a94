// Content type detection - magic bytes first, declared text types second

use crate::error::{DirStoreError, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Reserved type of directory documents.
pub const DIR_TYPE: &str = "inode/directory";

/// Fallback type for files nothing else could classify at read time.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Number of leading bytes inspected when sniffing.
pub const SNIFF_LEN: usize = 4100;

/// Preferred extensions for types whose reverse mapping is ambiguous.
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/markdown", "md"),
    ("text/css", "css"),
    ("text/csv", "csv"),
    ("text/xml", "xml"),
    ("text/javascript", "js"),
    ("application/json", "json"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("application/pdf", "pdf"),
];

/// A detected content type together with the extension it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sniffed {
    pub mime: String,
    pub ext: String,
}

/// Detect a type from magic bytes. Extensions and declared types are not consulted.
///
/// The reported type is the one the stored extension reads back as, so a
/// sniffed `audio/x-wav` is reported as `audio/wav`.
pub fn sniff(head: &[u8]) -> Option<Sniffed> {
    infer::get(head).map(|kind| {
        let ext = kind.extension();
        let mime = mime_guess::from_ext(ext)
            .first_raw()
            .unwrap_or(kind.mime_type());
        Sniffed {
            mime: mime.to_string(),
            ext: ext.to_string(),
        }
    })
}

/// Decide the stored type of new content.
///
/// Sniffed magic bytes always win. Without them a declared `text/*` type is
/// trusted, anything else is undetectable.
pub fn classify(head: &[u8], declared: Option<&str>) -> Result<Sniffed> {
    if let Some(sniffed) = sniff(head) {
        return Ok(sniffed);
    }

    match declared {
        Some(mime) if is_text(mime) => Ok(Sniffed {
            mime: mime.to_string(),
            ext: extension_for(mime).unwrap_or_default().to_string(),
        }),
        _ => Err(DirStoreError::UndetectableType),
    }
}

pub fn is_text(mime: &str) -> bool {
    mime.starts_with("text/")
}

/// Extension (without dot) documents of this type are stored under.
pub fn extension_for(mime: &str) -> Option<&'static str> {
    PREFERRED_EXTENSIONS
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(mime).and_then(|exts| exts.first().copied())
        })
}

/// Classify an existing filesystem entry.
///
/// Directories get [`DIR_TYPE`]. Files are typed by extension, then by
/// their leading bytes, and finally fall back to [`OCTET_STREAM`].
pub fn type_of_path(path: &Path) -> Result<String> {
    if path.is_dir() {
        return Ok(DIR_TYPE.to_string());
    }

    if let Some(mime) = mime_guess::from_path(path).first_raw() {
        return Ok(mime.to_string());
    }

    let mut file = File::open(path)?;
    let head = read_head(&mut file)?;
    Ok(sniff(&head)
        .map(|s| s.mime)
        .unwrap_or_else(|| OCTET_STREAM.to_string()))
}

/// Read up to [`SNIFF_LEN`] bytes, stopping early only at end of input.
pub fn read_head<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    reader.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const PNG_HEAD: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const WAV_HEAD: &[u8] = b"RIFF\x24\0\0\0WAVEfmt \x10\0\0\0";

    #[test]
    fn test_sniff_magic_bytes() {
        let png = sniff(PNG_HEAD).unwrap();
        assert_eq!(png.mime, "image/png");
        assert_eq!(png.ext, "png");

        let jpeg = sniff(JPEG_HEAD).unwrap();
        assert_eq!(jpeg.mime, "image/jpeg");
        assert_eq!(jpeg.ext, "jpg");

        assert!(sniff(b"hello world").is_none());
    }

    #[test]
    fn test_sniffed_type_matches_extension_type() {
        let tmp = TempDir::new().unwrap();
        let wav = sniff(WAV_HEAD).unwrap();
        assert_eq!(wav.ext, "wav");

        let path = tmp.path().join(format!("sound.{}", wav.ext));
        std::fs::write(&path, WAV_HEAD).unwrap();
        assert_eq!(type_of_path(&path).unwrap(), wav.mime);
    }

    #[test]
    fn test_classify_prefers_sniffed_type() {
        let sniffed = classify(PNG_HEAD, Some("text/plain")).unwrap();
        assert_eq!(sniffed.mime, "image/png");
    }

    #[test]
    fn test_classify_trusts_declared_text() {
        let sniffed = classify(b"hello world", Some("text/plain")).unwrap();
        assert_eq!(sniffed.mime, "text/plain");
        assert_eq!(sniffed.ext, "txt");
    }

    #[test]
    fn test_classify_rejects_undetectable() {
        assert!(matches!(
            classify(b"hello world", None),
            Err(DirStoreError::UndetectableType)
        ));
        assert!(matches!(
            classify(b"hello world", Some("image/png")),
            Err(DirStoreError::UndetectableType)
        ));
    }

    #[test]
    fn test_extension_round_trips_through_path_type() {
        let tmp = TempDir::new().unwrap();
        for mime in ["text/plain", "text/html", "image/jpeg", "image/png"] {
            let ext = extension_for(mime).unwrap();
            let path = tmp.path().join(format!("doc.{ext}"));
            std::fs::write(&path, b"x").unwrap();
            assert_eq!(type_of_path(&path).unwrap(), mime);
        }
    }

    #[test]
    fn test_type_of_path_falls_back_to_content() {
        let tmp = TempDir::new().unwrap();

        let dir = tmp.path().join("sub");
        std::fs::create_dir(&dir).unwrap();
        assert_eq!(type_of_path(&dir).unwrap(), DIR_TYPE);

        let image = tmp.path().join("noext");
        std::fs::write(&image, PNG_HEAD).unwrap();
        assert_eq!(type_of_path(&image).unwrap(), "image/png");

        let blob = tmp.path().join("blob");
        std::fs::write(&blob, b"plain bytes").unwrap();
        assert_eq!(type_of_path(&blob).unwrap(), OCTET_STREAM);
    }

    #[test]
    fn test_read_head_is_bounded() {
        let data = vec![7u8; SNIFF_LEN * 2];
        let mut reader = Cursor::new(data);
        let head = read_head(&mut reader).unwrap();
        assert_eq!(head.len(), SNIFF_LEN);
        assert_eq!(reader.position() as usize, SNIFF_LEN);
    }
}
