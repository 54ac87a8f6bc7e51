//! State directory layout

use crate::error::{EnvmeError, Result};
use std::path::{Component, Path, PathBuf};

/// Name of the hidden directory under the user's home
pub const STATE_DIR_NAME: &str = ".envme";

/// Environment variable overriding the state directory location
pub const STATE_DIR_ENV: &str = "ENVME_HOME";

/// Compose file name inside each service directory
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yaml";

/// Dockerfile name inside a dev environment's service directory
pub const DOCKERFILE_NAME: &str = "Dockerfile";

const CONFIG_FILE_NAME: &str = "config.yaml";
const INGRESS_FILE_NAME: &str = "ingress.yaml";

/// Per-user application state directory
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    /// Use an explicit root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the default root: `$ENVME_HOME`, else `~/.envme`
    pub fn from_env() -> Result<Self> {
        if let Some(root) = std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(root));
        }

        let home = ::dirs::home_dir()
            .ok_or_else(|| EnvmeError::Path("could not determine home directory".to_string()))?;
        Ok(Self::new(home.join(STATE_DIR_NAME)))
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if absent
    pub fn ensure(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.root)?;
        Ok(&self.root)
    }

    /// Directory holding one service's generated artifacts
    pub fn service_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Service directory, refusing names that would leave the root
    fn checked_service_dir(&self, name: &str) -> Result<PathBuf> {
        if !is_single_component(name) {
            return Err(EnvmeError::usage(format!(
                "Invalid service name '{}': must be a single directory name",
                name
            )));
        }
        Ok(self.service_dir(name))
    }

    /// Create a service directory if absent
    pub fn ensure_service_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.checked_service_dir(name)?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Compose file of a service
    pub fn compose_file(&self, name: &str) -> PathBuf {
        self.service_dir(name).join(COMPOSE_FILE_NAME)
    }

    /// Whether a compose file was ever written for this service
    pub fn has_service(&self, name: &str) -> bool {
        is_single_component(name) && self.compose_file(name).is_file()
    }

    /// Settings file path
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Create the settings file empty if absent and return its path
    pub fn ensure_config_file(&self) -> Result<PathBuf> {
        self.ensure()?;
        let file = self.config_file();
        if !file.exists() {
            std::fs::write(&file, "")?;
        }
        Ok(file)
    }

    /// Ingress rules file path
    pub fn ingress_file(&self) -> PathBuf {
        self.root.join(INGRESS_FILE_NAME)
    }

    /// Names of all services with a compose file, sorted
    pub fn services(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if self.has_service(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        Ok(names)
    }

    /// Delete a service directory and everything in it
    pub fn remove_service(&self, name: &str) -> Result<bool> {
        let dir = self.checked_service_dir(name)?;
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(dir)?;
        Ok(true)
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_services_only_lists_dirs_with_compose_file() {
        let temp = tempdir().unwrap();
        let state = StateDir::new(temp.path());

        state.ensure_service_dir("web").unwrap();
        std::fs::write(state.compose_file("web"), "services: {}").unwrap();
        state.ensure_service_dir("api").unwrap();
        std::fs::write(state.compose_file("api"), "services: {}").unwrap();
        state.ensure_service_dir("half-made").unwrap();
        state.ensure_config_file().unwrap();

        assert_eq!(state.services().unwrap(), vec!["api", "web"]);
    }

    #[test]
    fn test_services_on_missing_root() {
        let temp = tempdir().unwrap();
        let state = StateDir::new(temp.path().join("nope"));
        assert!(state.services().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_config_file_keeps_existing_content() {
        let temp = tempdir().unwrap();
        let state = StateDir::new(temp.path());

        let file = state.ensure_config_file().unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "");

        std::fs::write(&file, "network: lab\n").unwrap();
        state.ensure_config_file().unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "network: lab\n");
    }

    #[test]
    fn test_remove_service() {
        let temp = tempdir().unwrap();
        let state = StateDir::new(temp.path());
        state.ensure_service_dir("api").unwrap();

        assert!(state.remove_service("api").unwrap());
        assert!(!state.remove_service("api").unwrap());
    }

    #[test]
    fn test_names_outside_root_are_refused() {
        let temp = tempdir().unwrap();
        let state = StateDir::new(temp.path().join(".envme"));
        state.ensure().unwrap();

        let outside = temp.path().join("myproj");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join(COMPOSE_FILE_NAME), "services: {}").unwrap();

        for name in ["../myproj", "a/b", "..", "/tmp", ""] {
            assert!(!state.has_service(name), "{}", name);
            assert!(matches!(
                state.remove_service(name),
                Err(EnvmeError::Usage(_))
            ));
            assert!(matches!(
                state.ensure_service_dir(name),
                Err(EnvmeError::Usage(_))
            ));
        }
        assert!(outside.join(COMPOSE_FILE_NAME).exists());
    }
}
