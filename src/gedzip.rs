//! The `.gdz` container format (§4.8, ambient — grounded in the `zip` dependency carried for
//! this purpose), available under the `gedzip` feature.
//!
//! A `.gdz` file is a ZIP archive holding exactly one top-level `.ged` entry plus whatever
//! multimedia files its `OBJE.FILE` structures reference.

use std::io::{Read, Seek};

use zip::read::ZipArchive;

use crate::encoding::detect_and_decode;
use crate::GedcomError;

/// A `.gdz` archive: one GEDCOM text entry plus zero or more media files.
pub struct GedcomZip<R: Read + Seek> {
    archive: ZipArchive<R>,
    ged_name: String,
}

impl<R: Read + Seek> GedcomZip<R> {
    /// Opens `reader` as a `.gdz` archive.
    ///
    /// # Errors
    ///
    /// Returns an error if `reader` is not a valid ZIP archive, or if it contains zero or more
    /// than one top-level `.ged` entry.
    pub fn open(reader: R) -> Result<GedcomZip<R>, GedcomError> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| GedcomError::InvalidFormat(format!("not a valid .gdz archive: {e}")))?;

        let mut ged_entries: Vec<String> = archive
            .file_names()
            .filter(|name| !name.contains('/') && name.ends_with(".ged"))
            .map(String::from)
            .collect();
        ged_entries.sort();

        let ged_name = match ged_entries.len() {
            1 => ged_entries.remove(0),
            0 => {
                return Err(GedcomError::InvalidFormat(
                    ".gdz archive has no top-level .ged entry".to_string(),
                ))
            }
            n => {
                return Err(GedcomError::InvalidFormat(format!(
                    ".gdz archive has {n} top-level .ged entries, expected exactly one"
                )))
            }
        };

        Ok(GedcomZip { archive, ged_name })
    }

    /// Decodes and returns the archive's GEDCOM text entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be read from the archive, or if its bytes cannot be
    /// decoded (see [`detect_and_decode`]).
    pub fn text(&mut self) -> Result<String, GedcomError> {
        let mut bytes = Vec::new();
        self.archive
            .by_name(&self.ged_name)
            .map_err(|e| GedcomError::InvalidFormat(format!("reading {}: {e}", self.ged_name)))?
            .read_to_end(&mut bytes)
            .map_err(GedcomError::from)?;
        let (text, _encoding) = detect_and_decode(&bytes)?;
        Ok(text)
    }

    /// Reads a multimedia file from the archive by its path, as referenced by an `OBJE.FILE`
    /// structure.
    ///
    /// # Errors
    ///
    /// Returns an error if no entry with this name exists in the archive.
    pub fn media_entry(&mut self, name: &str) -> Result<Vec<u8>, GedcomError> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| GedcomError::InvalidFormat(format!("media file not found: {name}")))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(GedcomError::from)?;
        Ok(bytes)
    }

    /// Every entry name in the archive, including the GEDCOM text entry itself.
    #[must_use]
    pub fn file_names(&self) -> Vec<&str> {
        self.archive.file_names().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_gedcom_text_and_media() {
        let source = b"0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n";
        let photo = &[0xFFu8, 0xD8, 0xFF];
        let archive = build_archive(&[("family.ged", source), ("photos/a.jpg", photo)]);

        let mut gdz = GedcomZip::open(Cursor::new(archive)).unwrap();
        assert_eq!(gdz.text().unwrap(), String::from_utf8_lossy(source));
        assert_eq!(gdz.media_entry("photos/a.jpg").unwrap(), photo);
    }

    #[test]
    fn rejects_archive_with_no_ged_entry() {
        let archive = build_archive(&[("readme.txt", b"hi")]);
        assert!(GedcomZip::open(Cursor::new(archive)).is_err());
    }

    #[test]
    fn rejects_archive_with_multiple_top_level_ged_entries() {
        let archive = build_archive(&[("a.ged", b"0 HEAD\n0 TRLR\n"), ("b.ged", b"0 HEAD\n0 TRLR\n")]);
        assert!(GedcomZip::open(Cursor::new(archive)).is_err());
    }

    #[test]
    fn missing_media_file_is_an_error() {
        let source = b"0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n";
        let archive = build_archive(&[("family.ged", source)]);
        let mut gdz = GedcomZip::open(Cursor::new(archive)).unwrap();
        assert!(gdz.media_entry("nope.jpg").is_err());
    }
}
