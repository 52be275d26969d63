//! File type detection

use std::path::Path;

use crate::types::FileType;

/// Classify a path by extension.
///
/// Missing paths, directories and other non-regular files are `NotAFile`.
/// Regular files whose extension has no extractor are `Unknown`. Content is
/// never inspected.
pub fn classify(path: &Path) -> FileType {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {}
        _ => return FileType::NotAFile,
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .map(FileType::from_extension)
        .unwrap_or(FileType::Unknown)
}
