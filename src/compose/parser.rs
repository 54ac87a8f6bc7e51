//! Docker Compose file parser

use super::config::ComposeDocument;
use crate::error::{EnvmeError, Result};
use std::path::Path;

/// Compose file parser
pub struct ComposeParser;

impl ComposeParser {
    /// Parse and validate a compose file from path
    pub fn parse_file(path: &Path) -> Result<ComposeDocument> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EnvmeError::ComposeParse(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse_str(&content)
    }

    /// Parse and validate a compose document from string
    pub fn parse_str(content: &str) -> Result<ComposeDocument> {
        let document: ComposeDocument = serde_yaml::from_str(content)
            .map_err(|e| EnvmeError::ComposeParse(format!("Failed to parse YAML: {}", e)))?;
        document.validate()?;
        Ok(document)
    }
}
