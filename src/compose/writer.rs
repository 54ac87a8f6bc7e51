//! Compose file writer

use super::config::ComposeDocument;
use super::template::DockerfileTemplate;
use crate::error::Result;
use crate::state::layout::{StateDir, COMPOSE_FILE_NAME, DOCKERFILE_NAME};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persists generated artifacts under the state directory
pub struct ComposeWriter<'a> {
    state: &'a StateDir,
}

impl<'a> ComposeWriter<'a> {
    pub fn new(state: &'a StateDir) -> Self {
        Self { state }
    }

    /// Serialize a document and replace the service's compose file with it
    pub fn write(&self, name: &str, document: &ComposeDocument) -> Result<PathBuf> {
        let dir = self.state.ensure_service_dir(name)?;
        let content = serde_yaml::to_string(document)?;
        let path = dir.join(COMPOSE_FILE_NAME);

        write_atomic(&dir, &path, content.as_bytes())?;
        tracing::info!("Wrote compose file {}", path.display());

        Ok(path)
    }

    /// Write a Dockerfile template into the service directory
    pub fn write_dockerfile(&self, name: &str, template: DockerfileTemplate) -> Result<PathBuf> {
        let dir = self.state.ensure_service_dir(name)?;
        let path = dir.join(DOCKERFILE_NAME);

        write_atomic(&dir, &path, template.contents().as_bytes())?;
        tracing::info!("Wrote {} Dockerfile template to {}", template, path.display());

        Ok(path)
    }
}

/// Mode of every generated file
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Write to a temporary file in `dir` and rename it over `path`, so readers
/// never see a partially written file
pub(crate) fn write_atomic(dir: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    // temp files start out 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
