//! In-memory archive sink for branded output.
//!
//! The sink accumulates named JPEG payloads during a run and produces one
//! deflate-compressed ZIP when finalized. It is exclusively owned by the
//! batch orchestrator for the duration of a run and consumed by
//! [`ArchiveSink::finalize`].

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{BrandError, Result};

/// Suffix appended to the source stem for archive entry names.
const BRANDED_SUFFIX: &str = "-branded";

/// Extension of every archive entry; output is always JPEG.
const BRANDED_EXTENSION: &str = "jpg";

/// Accumulates encoded results and packages them into a single ZIP.
pub struct ArchiveSink {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
}

impl ArchiveSink {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
        }
    }

    /// Append one named payload. Entry names must be unique within a run;
    /// a duplicate is rejected rather than silently overwritten.
    pub fn append(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(BrandError::Archive(format!(
                "Duplicate archive entry name: {name}"
            )));
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer
            .start_file(name, options)
            .map_err(|e| BrandError::Archive(format!("Failed to start entry {name}: {e}")))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| BrandError::Archive(format!("Failed to write entry {name}: {e}")))?;

        debug!(entry = name, bytes = bytes.len(), "Appended archive entry");
        Ok(())
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Produce the compressed archive, consuming the sink.
    pub fn finalize(self) -> Result<Vec<u8>> {
        let entries = self.names.len();
        let cursor = self
            .writer
            .finish()
            .map_err(|e| BrandError::Archive(format!("Failed to finalize archive: {e}")))?;
        let bytes = cursor.into_inner();
        debug!(entries, bytes = bytes.len(), "Archive finalized");
        Ok(bytes)
    }
}

impl Default for ArchiveSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic archive entry name for a source file name:
/// stem + `-branded` + `.jpg`.
pub fn branded_name(source_name: &str) -> String {
    format!(
        "{}{BRANDED_SUFFIX}.{BRANDED_EXTENSION}",
        source_stem(source_name)
    )
}

/// Entry name with a numeric disambiguator, for colliding source stems.
pub fn branded_name_numbered(source_name: &str, n: u32) -> String {
    format!(
        "{}{BRANDED_SUFFIX}-{n}.{BRANDED_EXTENSION}",
        source_stem(source_name)
    )
}

fn source_stem(source_name: &str) -> &str {
    Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::ZipArchive;

    #[test]
    fn test_branded_name() {
        assert_eq!(branded_name("photo.png"), "photo-branded.jpg");
        assert_eq!(branded_name("IMG_0042.JPG"), "IMG_0042-branded.jpg");
        assert_eq!(branded_name("noext"), "noext-branded.jpg");
        assert_eq!(branded_name(""), "image-branded.jpg");
        assert_eq!(branded_name_numbered("photo.png", 2), "photo-branded-2.jpg");
    }

    #[test]
    fn test_roundtrip() {
        let mut sink = ArchiveSink::new();
        sink.append("a-branded.jpg", b"payload-a").unwrap();
        sink.append("b-branded.jpg", b"payload-b").unwrap();
        assert_eq!(sink.len(), 2);

        let bytes = sink.finalize().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["a-branded.jpg", "b-branded.jpg"]);

        let mut entry = archive.by_name("a-branded.jpg").unwrap();
        let mut content = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut content).unwrap();
        assert_eq!(content, b"payload-a");
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut sink = ArchiveSink::new();
        sink.append("x-branded.jpg", b"first").unwrap();
        let result = sink.append("x-branded.jpg", b"second");
        assert!(matches!(result, Err(BrandError::Archive(_))));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_empty_archive_finalizes() {
        let sink = ArchiveSink::new();
        let bytes = sink.finalize().unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
