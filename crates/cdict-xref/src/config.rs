//! Analysis run configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, XrefError};

/// Suffix of the per-file cross-reference document name
pub const XREF_FILE_SUFFIX: &str = "_gxrefs.xml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefConfig {
    /// The run covers one translation unit; global ids equal local ids
    pub single_file: bool,
    /// Directory holding the analysis results of the project
    pub target_path: PathBuf,
    pub project_name: String,
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            single_file: false,
            target_path: PathBuf::from("."),
            project_name: "project".to_string(),
        }
    }
}

impl XrefConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| XrefError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            XrefError::Config(format!(
                "Failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// `<target_path>/<project_name>.cch/a`
    pub fn analysis_dir(&self) -> PathBuf {
        self.target_path
            .join(format!("{}.cch", self.project_name))
            .join("a")
    }

    /// Location of the cross-reference document of one source file
    pub fn xref_path(&self, file_path: Option<&str>, file_name: &str) -> PathBuf {
        let mut dir = self.analysis_dir();
        if let Some(file_path) = file_path.filter(|p| !p.is_empty()) {
            dir.push(file_path);
        }
        dir.join(format!("{}{}", file_name, XREF_FILE_SUFFIX))
    }
}
