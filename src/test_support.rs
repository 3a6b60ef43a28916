use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Builds an in-memory zip archive from `(path, content)` pairs.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
