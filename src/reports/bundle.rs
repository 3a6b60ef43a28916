use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::Path;
use tempfile::TempDir;
use zip::ZipArchive;

use crate::error::Result;

/// A report bundle unpacked into a private temporary directory.
///
/// The directory and everything in it is removed when the value is dropped.
pub struct ExtractedBundle {
    dir: TempDir,
    entries: usize,
}

impl ExtractedBundle {
    /// Unpacks a zip archive held in memory.
    ///
    /// An empty body yields an empty bundle. Entries that cannot be written,
    /// or whose path would escape the extraction directory, are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created or the
    /// bytes are not a zip archive.
    pub fn extract(bytes: &[u8]) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("pipeforge-").tempdir()?;

        if bytes.is_empty() {
            debug!("Artifact bundle is empty");
            return Ok(Self { dir, entries: 0 });
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = 0;

        for index in 0..archive.len() {
            match extract_entry(&mut archive, index, dir.path()) {
                Ok(true) => entries += 1,
                Ok(false) => {}
                Err(e) => warn!("Skipping bundle entry {index}: {e}"),
            }
        }

        debug!(
            "Extracted {entries} of {} bundle entries into {}",
            archive.len(),
            dir.path().display()
        );

        Ok(Self { dir, entries })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of files written.
    pub fn entries(&self) -> usize {
        self.entries
    }
}

fn extract_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    index: usize,
    target: &Path,
) -> Result<bool> {
    let mut file = archive.by_index(index)?;

    let Some(relative) = file.enclosed_name().map(Path::to_path_buf) else {
        warn!("Skipping bundle entry with unsafe path: {}", file.name());
        return Ok(false);
    };
    let destination = target.join(relative);

    if file.is_dir() {
        fs::create_dir_all(&destination)?;
        return Ok(false);
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(&destination)?;
    io::copy(&mut file, &mut out)?;
    Ok(true)
}
