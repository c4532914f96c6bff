//! In-memory ZIP traversal
//!
//! Entries are classified by suffix. Nested archives are opened one level
//! deep by the callers; anything deeper is ignored.

use crate::errors::ProcessorError;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

/// Upper bound on the preallocation for one entry, whatever its header says
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Entry classification by file suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Csv,
    Xml,
    Zip,
    Other,
}

impl EntryKind {
    pub fn of(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            EntryKind::Csv
        } else if lower.ends_with(".xml") {
            EntryKind::Xml
        } else if lower.ends_with(".zip") {
            EntryKind::Zip
        } else {
            EntryKind::Other
        }
    }
}

/// Non-directory entry names partitioned by kind, in archive order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryIndex {
    pub csv: Vec<String>,
    pub xml: Vec<String>,
    pub nested: Vec<String>,
    pub other: Vec<String>,
}

impl EntryIndex {
    /// CSV then XML entries
    pub fn flat(&self) -> impl Iterator<Item = &String> {
        self.csv.iter().chain(self.xml.iter())
    }

    pub fn flat_len(&self) -> usize {
        self.csv.len() + self.xml.len()
    }
}

/// Open a ZIP held in memory
pub fn open<'a>(bytes: &'a [u8], name: &str) -> Result<ZipArchive<Cursor<&'a [u8]>>, ProcessorError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| ProcessorError::archive(name, e))
}

/// Partition every non-directory entry of an archive
pub fn index_entries<R: Read + Seek>(archive: &ZipArchive<R>) -> EntryIndex {
    let mut index = EntryIndex::default();

    for name in (0..archive.len()).filter_map(|i| archive.name_for_index(i)) {
        if name.ends_with('/') {
            continue;
        }
        let bucket = match EntryKind::of(name) {
            EntryKind::Csv => &mut index.csv,
            EntryKind::Xml => &mut index.xml,
            EntryKind::Zip => &mut index.nested,
            EntryKind::Other => &mut index.other,
        };
        bucket.push(name.to_string());
    }

    index
}

/// Read one entry fully into memory
pub fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, ProcessorError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ProcessorError::archive(name, e))?;

    let mut buf = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
    file.read_to_end(&mut buf)
        .map_err(|e| ProcessorError::archive(name, e))?;
    Ok(buf)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Build a ZIP from `(name, bytes)` pairs
    pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, bytes) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(bytes).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    /// Nested ZIP holding one metering CSV for `pod`
    pub fn nested_with_pod(pod: &str) -> Vec<u8> {
        let csv = format!("POD;DATA;KWH\n{};2024-11-01;1,0\n", pod);
        zip_of(&[("letture.csv", csv.as_bytes())])
    }

    /// Outer ZIP with `count` nested archives, the i-th carrying POD `IT001E{i:08}`
    pub fn outer_with_nested(count: usize) -> Vec<u8> {
        let nested: Vec<(String, Vec<u8>)> = (0..count)
            .map(|i| (format!("inner_{:04}.zip", i), nested_with_pod(&format!("IT001E{:08}", i))))
            .collect();
        let entries: Vec<(&str, &[u8])> = nested
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
            .collect();
        zip_of(&entries)
    }
}
