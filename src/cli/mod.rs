//! Command-line interface module
//!
//! This module contains the implementations for the CLI subcommands.

use crate::error::Result;
use crate::options::{ConvertOptions, DriverFlavor};
use std::path::Path;

pub mod batch;
pub mod convert;
pub mod partition;

/// Options from an optional JSON file, with explicit flags taking precedence
pub fn load_options(config: Option<&Path>, flavor: Option<DriverFlavor>) -> Result<ConvertOptions> {
    let mut options = match config {
        Some(path) => ConvertOptions::from_json_file(path)?,
        None => ConvertOptions::default(),
    };
    if let Some(flavor) = flavor {
        options.flavor = flavor;
    }
    log::debug!("Using options {:?}", options);
    Ok(options)
}

/// Common CLI utilities
pub mod utils {
    use crate::error::{Error, Result};
    use std::path::{Path, PathBuf};
    use walkdir::WalkDir;

    pub fn read_source(path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    /// Write output to file or stdout
    pub fn write_output(content: &str, output_path: Option<&Path>) -> Result<()> {
        match output_path {
            Some(path) => std::fs::write(path, content)
                .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e))),
            None => {
                print!("{}", content);
                Ok(())
            }
        }
    }

    /// Every file under `root` whose name ends in `suffix`, sorted.
    /// Symlinked directories are not followed.
    pub fn find_sources(root: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry
                .map_err(|e| Error::Io(format!("Failed to list {}: {}", root.display(), e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if path.to_str().map_or(false, |p| p.ends_with(suffix)) {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }
}
