//! User settings (`~/.envme/config.yaml`)

use super::layout::StateDir;
use crate::error::{EnvmeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the shared network name
pub const NETWORK_ENV: &str = "ENVME_NETWORK";

/// Settings read from the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Shared external network every service joins
    pub network: String,
    /// Dockerfile name inside a dev environment's directory
    pub dockerfile: String,
    /// Build stage used for dev environments
    pub target: String,
    /// Tunnel name written to the ingress file
    pub tunnel: String,
    /// Tunnel credentials file; defaults to `<state>/credentials.json`
    #[serde(rename = "credentials-file", skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
    /// Deadline for ordinary Engine calls
    pub engine_timeout_secs: u64,
    /// Deadline for image pulls and builds
    pub build_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: "envme".to_string(),
            dockerfile: "Dockerfile".to_string(),
            target: "development".to_string(),
            tunnel: "envme".to_string(),
            credentials_file: None,
            engine_timeout_secs: 60,
            build_timeout_secs: 1800,
        }
    }
}

impl Settings {
    /// Load settings for a state directory, creating an empty file if needed,
    /// then apply environment overrides
    pub fn load(state: &StateDir) -> Result<Self> {
        let file = state.ensure_config_file()?;
        let mut settings = Self::from_file(&file)?;
        if let Ok(network) = std::env::var(NETWORK_ENV) {
            if !network.is_empty() {
                settings.network = network;
            }
        }
        Ok(settings)
    }

    /// Parse a settings file; an empty file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
            .map_err(|e| EnvmeError::Yaml(format!("{}: {}", path.display(), e)))
    }

    /// Parse settings from a YAML string
    pub fn parse_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Credentials file, falling back to one inside the state directory
    pub fn credentials_file(&self, state: &StateDir) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(|| state.root().join("credentials.json"))
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(Settings::parse_str("").unwrap(), Settings::default());
        assert_eq!(Settings::parse_str("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse_str("network: lab\nengine_timeout_secs: 5\n").unwrap();
        assert_eq!(settings.network, "lab");
        assert_eq!(settings.engine_timeout(), Duration::from_secs(5));
        assert_eq!(settings.target, "development");
        assert_eq!(settings.dockerfile, "Dockerfile");
    }

    #[test]
    fn test_malformed_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("config.yaml");
        std::fs::write(&file, "network: [unclosed").unwrap();

        let err = Settings::from_file(&file).unwrap_err();
        assert!(matches!(err, EnvmeError::Yaml(_)));
    }

    #[test]
    fn test_credentials_default_inside_state() {
        let state = StateDir::new("/tmp/state");
        let settings = Settings::default();
        assert_eq!(
            settings.credentials_file(&state),
            PathBuf::from("/tmp/state/credentials.json")
        );

        let settings = Settings::parse_str("credentials-file: /etc/tunnel.json").unwrap();
        assert_eq!(
            settings.credentials_file(&state),
            PathBuf::from("/etc/tunnel.json")
        );
    }
}
