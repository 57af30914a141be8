//! File discovery for finding Rust files that declare structs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Discovered source file with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Path relative to project root
    pub relative_path: String,
}

/// Walk the given directories and collect `.rs` files that declare at least one struct.
///
/// Missing directories are skipped; hidden files and directories are ignored.
pub fn discover_sources(project_root: &Path, dirs: &[PathBuf]) -> Result<Vec<DiscoveredFile>> {
    let mut discovered = Vec::new();

    for dir in dirs {
        if !dir.exists() {
            log::debug!("source directory {} does not exist, skipping", dir.display());
            continue;
        }

        for entry in WalkDir::new(dir).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();

            if path.extension().is_none_or(|ext| ext != "rs") {
                continue;
            }

            let relative = path.strip_prefix(project_root).unwrap_or(path);
            if relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
            {
                continue;
            }

            if declares_struct(path)? {
                discovered.push(DiscoveredFile {
                    path: path.to_path_buf(),
                    relative_path: relative.to_string_lossy().to_string(),
                });
            }
        }
    }

    discovered.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    discovered.dedup_by(|a, b| a.path == b.path);

    Ok(discovered)
}

/// Text check before the full syn parse.
fn declares_struct(path: &Path) -> Result<bool> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(content.contains("struct "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovers_struct_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("model")).unwrap();
        std::fs::create_dir_all(src.join(".cache")).unwrap();
        std::fs::write(src.join("model/person.rs"), "pub struct Person { name: String }").unwrap();
        std::fs::write(src.join("lib.rs"), "pub mod model;").unwrap();
        std::fs::write(src.join(".cache/stale.rs"), "struct Stale { a: u8 }").unwrap();
        std::fs::write(src.join("notes.txt"), "struct Text {}").unwrap();

        let found = discover_sources(dir.path(), &[src.clone(), dir.path().join("missing")]).unwrap();
        let relative: Vec<_> = found.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(relative, ["src/model/person.rs"]);
    }
}
