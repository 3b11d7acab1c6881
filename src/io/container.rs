//! Read/write the engine's archive container.
//!
//! A `.target` archive is a gzip-compressed tar holding a single XML
//! document named `contents.xml`. Two details are load-bearing for
//! interop:
//!
//! - writing stages the XML through a scoped temporary file that is
//!   removed on *every* exit path (success or error); `NamedTempFile`
//!   gives this guarantee through its `Drop`
//! - reading decodes the XML as UTF-8 first and falls back to UTF-16
//!   little-endian, because some engine builds emit the latter

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};

use crate::error::{Error, Result};

/// Name of the single entry inside the archive.
pub const CONTENTS_NAME: &str = "contents.xml";

/// Write `xml` into a gzip-tar archive at `path`.
pub fn write_container(path: &Path, xml: &str) -> Result<()> {
    let mut staged = tempfile::NamedTempFile::new()?;
    staged.write_all(xml.as_bytes())?;
    staged.flush()?;

    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.append_path_with_name(staged.path(), CONTENTS_NAME)?;
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Extract and decode the XML document from the archive at `path`.
pub fn read_container(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_contents = {
            let name = entry.path()?;
            name.as_os_str() == CONTENTS_NAME
                || name.extension().is_some_and(|e| e == "xml")
        };
        if is_contents {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            return decode_text(&bytes);
        }
    }
    Err(Error::Format(format!(
        "no {CONTENTS_NAME} entry in '{}'",
        path.display()
    )))
}

/// Decode archive text as UTF-8, falling back to UTF-16LE.
fn decode_text(bytes: &[u8]) -> Result<String> {
    // A UTF-16LE-encoded ASCII document is also valid UTF-8 (interleaved
    // NULs), so a successful UTF-8 decode containing NULs is treated as
    // UTF-16 anyway.
    if let Ok(text) = std::str::from_utf8(bytes) {
        if !text.contains('\u{0}') {
            return Ok(text.to_string());
        }
    }
    decode_utf16_le(bytes)
}

fn decode_utf16_le(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::Format(
            "container text is neither UTF-8 nor UTF-16LE (odd byte count)".into(),
        ));
    }
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    if units.first() == Some(&0xFEFF) {
        units.remove(0);
    }
    String::from_utf16(&units)
        .map_err(|e| Error::Format(format!("container text is not valid UTF-16LE: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_round_trips_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.target");
        let xml = "<Dinver>\n  <TargetList/>\n</Dinver>\n";

        write_container(&path, xml).unwrap();
        assert_eq!(read_container(&path).unwrap(), xml);
    }

    #[test]
    fn reader_decodes_utf16_le_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.target");
        let xml = "<Dinver><TargetList/></Dinver>";

        // Build an archive whose contents.xml is UTF-16LE with a BOM.
        let mut wide = vec![0xFF, 0xFE];
        for unit in xml.encode_utf16() {
            wide.extend_from_slice(&unit.to_le_bytes());
        }
        let staged_dir = tempfile::tempdir().unwrap();
        let staged = staged_dir.path().join(CONTENTS_NAME);
        std::fs::write(&staged, &wide).unwrap();

        let file = File::create(&path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(encoder);
        builder.append_path_with_name(&staged, CONTENTS_NAME).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        assert_eq!(read_container(&path).unwrap(), xml);
    }

    #[test]
    fn missing_contents_entry_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.target");

        let file = File::create(&path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let builder = Builder::new(encoder);
        builder.into_inner().unwrap().finish().unwrap();

        assert!(matches!(read_container(&path), Err(Error::Format(_))));
    }
}
