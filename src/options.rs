//! Conversion options

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which factory convention a unit follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverFlavor {
    /// Dependency array or inline function; flags and decorator imports
    #[default]
    Angular,
    /// Dependency array only
    Blink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    pub flavor: DriverFlavor,
    /// Registration function and annotation name
    pub register_fn: String,
    /// Dependency lookup function used for injected locals
    pub require_fn: String,
    /// Module the two functions above are imported from
    pub decorators_module: String,
    pub source_suffix: String,
    pub target_suffix: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            flavor: DriverFlavor::Angular,
            register_fn: "Provide".to_string(),
            require_fn: "ngRequire".to_string(),
            decorators_module: "src/base/decorators".to_string(),
            source_suffix: ".js".to_string(),
            target_suffix: ".ts".to_string(),
        }
    }
}

impl ConvertOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config {
            message: e.to_string(),
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| Error::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.to_str()
            .map_or(false, |p| p.ends_with(self.source_suffix.as_str()))
    }

    /// `dir/name.js` -> `dir/name.ts`
    pub fn target_path(&self, source: &Path) -> Result<PathBuf> {
        let text = source.to_str().ok_or_else(|| Error::InvalidInput {
            message: format!("{} is not valid UTF-8", source.display()),
        })?;
        let base = text
            .strip_suffix(self.source_suffix.as_str())
            .ok_or_else(|| Error::InvalidInput {
                message: format!(
                    "{} does not end in '{}'",
                    source.display(),
                    self.source_suffix
                ),
            })?;
        Ok(PathBuf::from(format!("{}{}", base, self.target_suffix)))
    }
}
