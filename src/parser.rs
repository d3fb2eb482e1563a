use anyhow::{Context, Result};
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// AST (Abstract Syntax Tree) parser for Rust source files.
///
/// Uses the `syn` crate to parse source code into a syntax tree, which the
/// analyzers then walk to resolve handler bodies, model declarations, and
/// thrown error types.
pub struct AstParser;

/// A successfully parsed source file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Parses a single source file into an AST.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid syntax.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let syntax_tree = syn::parse_file(&content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses source text directly, without touching the filesystem.
    ///
    /// Used by tests and by callers that already hold the handler source.
    pub fn parse_source(source: &str) -> Result<ParsedFile> {
        let syntax_tree =
            syn::parse_file(source).context("Failed to parse Rust syntax in source text")?;
        Ok(ParsedFile {
            path: PathBuf::from("<inline>"),
            syntax_tree,
        })
    }
}

/// Per-run cache of parsed files.
///
/// A source file that contributes handlers to many routes is parsed at most
/// once per document-generation run.
#[derive(Debug, Default)]
pub struct SourceCache {
    parsed: Mutex<HashMap<PathBuf, Arc<ParsedFile>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path`, returning the cached tree if this run already parsed it.
    pub fn parse(&self, path: &Path) -> Result<Arc<ParsedFile>> {
        {
            let parsed = self.parsed.lock().expect("source cache poisoned");
            if let Some(cached) = parsed.get(path) {
                debug!("Source cache hit: {}", path.display());
                return Ok(Arc::clone(cached));
            }
        }

        let file = Arc::new(AstParser::parse_file(path)?);
        self.parsed
            .lock()
            .expect("source cache poisoned")
            .insert(path.to_path_buf(), Arc::clone(&file));
        Ok(file)
    }

    /// Parses every path, continuing past individual failures.
    ///
    /// File contents are read in parallel; parsing itself stays on the
    /// calling thread because the syntax trees are not `Send`. Files that
    /// fail to read or parse are logged and skipped so a single broken
    /// source file cannot abort the run.
    pub fn parse_all(&self, paths: &[PathBuf]) -> Vec<Arc<ParsedFile>> {
        let contents: Vec<(&PathBuf, std::io::Result<String>)> = paths
            .par_iter()
            .map(|path| (path, fs::read_to_string(path)))
            .collect();

        let mut files = Vec::with_capacity(paths.len());
        for (path, content) in contents {
            let parsed = match content {
                Ok(source) => syn::parse_file(&source)
                    .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display())),
                Err(e) => Err(anyhow::Error::from(e)
                    .context(format!("Failed to read file: {}", path.display()))),
            };

            match parsed {
                Ok(syntax_tree) => {
                    let file = Arc::new(ParsedFile {
                        path: path.clone(),
                        syntax_tree,
                    });
                    self.parsed
                        .lock()
                        .expect("source cache poisoned")
                        .insert(path.clone(), Arc::clone(&file));
                    files.push(file);
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        debug!("Parsed {} of {} files", files.len(), paths.len());
        files
    }

    /// Number of distinct files parsed so far
    pub fn len(&self) -> usize {
        self.parsed.lock().expect("source cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_valid_rust_file() {
        let temp_dir = TempDir::new().unwrap();
        let valid_code = r#"
            pub struct User {
                pub id: u32,
                pub name: String,
            }

            pub fn get_user(id: u32) -> Option<User> {
                None
            }
        "#;

        let file_path = create_temp_file(&temp_dir, "valid.rs", valid_code);
        let result = AstParser::parse_file(&file_path);

        assert!(result.is_ok());
        let parsed = result.unwrap();
        assert_eq!(parsed.path, file_path);
        assert!(!parsed.syntax_tree.items.is_empty());
    }

    #[test]
    fn test_parse_invalid_rust_file() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_code = "fn broken( { let x = ; }";

        let file_path = create_temp_file(&temp_dir, "invalid.rs", invalid_code);
        let result = AstParser::parse_file(&file_path);

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to parse Rust syntax"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = AstParser::parse_file(Path::new("/nonexistent/file.rs"));

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to read file"));
    }

    #[test]
    fn test_parse_source_text() {
        let parsed = AstParser::parse_source("pub fn handler() {}").unwrap();
        assert_eq!(parsed.syntax_tree.items.len(), 1);
    }

    #[test]
    fn test_source_cache_parses_each_file_once() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "shared.rs", "pub fn a() {}\npub fn b() {}");

        let cache = SourceCache::new();
        let first = cache.parse(&file_path).unwrap();
        let second = cache.parse(&file_path).unwrap();

        // Same parse result handed to both callers
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_parse_all_skips_broken_files() {
        let temp_dir = TempDir::new().unwrap();
        let good = create_temp_file(&temp_dir, "good.rs", "pub fn ok() {}");
        let bad = create_temp_file(&temp_dir, "bad.rs", "pub fn broken( {");

        let cache = SourceCache::new();
        let files = cache.parse_all(&[good.clone(), bad]);

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, good);
    }

    #[test]
    fn test_parse_all_empty_list() {
        let cache = SourceCache::new();
        assert!(cache.parse_all(&[]).is_empty());
        assert!(cache.is_empty());
    }
}
