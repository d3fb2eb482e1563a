use anyhow::Result;
use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Recursively collects the `.rs` files under a source directory.
///
/// Skips `target/` and hidden directories. Entries that cannot be read are
/// reported as warnings and scanning continues.
pub struct SourceScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Paths to all discovered `.rs` files
    pub rust_files: Vec<PathBuf>,
    /// Warnings for entries that could not be read
    pub warnings: Vec<String>,
}

impl SourceScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Walks the directory tree and collects all `.rs` files.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.root_path).into_iter();
        for entry in walker.filter_entry(|e| !Self::is_ignored(e)) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let message = format!("Failed to read directory entry: {}", e);
                    warn!("{}", message);
                    warnings.push(message);
                    continue;
                }
            };

            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "rs")
            {
                rust_files.push(entry.path().to_path_buf());
            }
        }

        rust_files.sort();
        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }

    /// Whether a directory entry should be skipped entirely
    fn is_ignored(entry: &walkdir::DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        entry.file_type().is_dir() && (name == "target" || name.starts_with('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_rust_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();

        let result = SourceScanner::new(dir.path().to_path_buf()).scan().unwrap();

        assert_eq!(result.rust_files.len(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_target_and_hidden_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/generated.rs"), "fn gen() {}").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/hook.rs"), "fn hook() {}").unwrap();
        fs::write(dir.path().join("kept.rs"), "fn kept() {}").unwrap();

        let result = SourceScanner::new(dir.path().to_path_buf()).scan().unwrap();

        assert_eq!(result.rust_files.len(), 1);
        assert!(result.rust_files[0].ends_with("kept.rs"));
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().unwrap();
        let result = SourceScanner::new(dir.path().to_path_buf()).scan().unwrap();
        assert!(result.rust_files.is_empty());
    }

    #[test]
    fn test_scan_results_are_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.rs"), "").unwrap();
        fs::write(dir.path().join("a.rs"), "").unwrap();
        fs::write(dir.path().join("c.rs"), "").unwrap();

        let result = SourceScanner::new(dir.path().to_path_buf()).scan().unwrap();
        let names: Vec<_> = result
            .rust_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.rs", "b.rs", "c.rs"]);
    }
}
