//! Source file discovery

use super::exclusions::Exclusions;
use crate::error::{CistepError, CistepResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Find source files below `workspace` with one of `extensions`.
///
/// Returns workspace-relative paths in sorted order. Excluded directories
/// are not descended into.
pub fn discover_sources(
    workspace: &Path,
    extensions: &[String],
    exclusions: &Exclusions,
) -> CistepResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(workspace)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match entry.path().strip_prefix(workspace) {
            Ok(relative) if relative.as_os_str().is_empty() => true,
            Ok(relative) => !exclusions.is_excluded(relative),
            Err(_) => false,
        });

    for entry in walker {
        let entry = entry.map_err(|e| CistepError::Internal(format!("walking sources: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches_extension = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if !matches_extension {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(workspace) {
            files.push(relative.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}
