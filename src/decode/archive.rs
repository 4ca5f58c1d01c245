//! Zip archive extraction

use crate::error::{Error, Result};
use std::io::{Cursor, Read};
use std::path::Path;

/// A file pulled out of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    /// File name without directories or extension
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Read every `.csv` entry of a zip archive, in archive order
pub fn csv_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(Error::archive)?;

    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(Error::archive)?;
        if file.is_dir() || !file.name().to_ascii_lowercase().ends_with(".csv") {
            continue;
        }

        let name = file.name().to_string();
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        entries.push(ArchiveEntry { name, data });
    }

    Ok(entries)
}
