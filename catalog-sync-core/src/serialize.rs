//! Newline-delimited JSON encoding of fetched records, and staging of the result.
//!
//! Each record becomes one line: a single-line JSON text followed by `\n`. The
//! whole artifact is therefore *not* one JSON document, which is what the
//! downstream bulk loader expects. Separators are `": "` and `", "` so the
//! bytes match the fixtures that loader was built against. Non-ASCII text is
//! written as raw UTF-8 rather than `\uXXXX` escapes; both decode to the same
//! strings.
//!
//! ```
//! use catalog_sync_core::serialize::serialize;
//! let records: Vec<serde_json::Map<_, _>> = vec![
//!     serde_json::from_str(r#"{"a":1}"#).unwrap(),
//!     serde_json::from_str(r#"{"b":2}"#).unwrap(),
//! ];
//! assert_eq!(serialize(&records).unwrap(), b"{\"a\": 1}\n{\"b\": 2}\n");
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};

use serde::Serialize;
use serde_json::ser::Formatter;
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::config::Staging;
use crate::contract::ItemRecord;
use crate::error::SerializationError;

/// Single-line formatter with a space after every `:` and `,`.
#[derive(Debug, Clone, Copy, Default)]
struct LineFormatter;

impl Formatter for LineFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Write `records` as newline-delimited JSON, returning the number of lines written.
pub fn write_records<W: Write>(
    mut writer: W,
    records: &[ItemRecord],
) -> Result<usize, SerializationError> {
    for record in records {
        {
            let mut ser = serde_json::Serializer::with_formatter(&mut writer, LineFormatter);
            record.serialize(&mut ser)?;
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Encode `records` in memory.
pub fn serialize(records: &[ItemRecord]) -> Result<Vec<u8>, SerializationError> {
    let mut buf = Vec::new();
    write_records(&mut buf, records)?;
    Ok(buf)
}

/// A serialized artifact waiting to be uploaded.
///
/// The `File` variant owns a temporary file that is deleted when the artifact
/// is dropped, whether or not the upload went through. Publishers take the
/// artifact by value, so the file lives exactly as long as the upload.
#[derive(Debug)]
pub enum StagedArtifact {
    Memory(Vec<u8>),
    File { file: NamedTempFile, len: u64 },
}

impl StagedArtifact {
    pub fn len(&self) -> u64 {
        match self {
            StagedArtifact::Memory(bytes) => bytes.len() as u64,
            StagedArtifact::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for StagedArtifact {
    fn from(bytes: Vec<u8>) -> Self {
        StagedArtifact::Memory(bytes)
    }
}

/// Serialize `records` into the staging area selected by `staging`.
pub fn stage(
    records: &[ItemRecord],
    staging: &Staging,
) -> Result<StagedArtifact, SerializationError> {
    match staging {
        Staging::Memory => {
            let bytes = serialize(records)?;
            info!(
                records = records.len(),
                bytes = bytes.len(),
                "[SYNC][SERIALIZE] Serialized records in memory"
            );
            Ok(StagedArtifact::Memory(bytes))
        }
        Staging::TempFile { dir } => {
            let file = match dir {
                Some(dir) => NamedTempFile::new_in(dir),
                None => NamedTempFile::new(),
            }
            .map_err(|e| {
                error!(error = ?e, dir = ?dir, "[SYNC][SERIALIZE][ERROR] Failed to create staging file");
                e
            })?;
            debug!(path = %file.path().display(), "[SYNC][SERIALIZE] Staging artifact to temporary file");

            let handle: &File = file.as_file();
            write_records(BufWriter::new(handle), records)?;
            let len = handle.metadata()?.len();

            info!(
                records = records.len(),
                bytes = len,
                path = %file.path().display(),
                "[SYNC][SERIALIZE] Serialized records to temporary file"
            );
            Ok(StagedArtifact::File { file, len })
        }
    }
}
