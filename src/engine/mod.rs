//! Container engine access
//!
//! The rest of the crate talks to the container engine only through the
//! [`Engine`] trait, so document building and orchestration can be tested
//! without a daemon. [`DockerEngine`] is the Docker Engine API implementation.

pub mod context;
pub mod docker;

pub use docker::DockerEngine;

use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

/// Label carrying the compose project name
pub const PROJECT_LABEL: &str = "com.docker.compose.project";
/// Label carrying the compose service name
pub const SERVICE_LABEL: &str = "com.docker.compose.service";
/// Label carrying the compose version
pub const VERSION_LABEL: &str = "com.docker.compose.version";
/// Label carrying the project working directory
pub const WORKING_DIR_LABEL: &str = "com.docker.compose.project.working_dir";
/// Label carrying the project's compose files
pub const CONFIG_FILES_LABEL: &str = "com.docker.compose.project.config_files";
/// Label marking one-off containers
pub const ONEOFF_LABEL: &str = "com.docker.compose.oneoff";

/// Everything needed to create one container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// `KEY=VALUE` environment
    pub env: Vec<String>,
    /// Labels
    pub labels: BTreeMap<String, String>,
    /// Network the container joins
    pub network: Option<String>,
    /// Extra `/etc/hosts` entries
    pub extra_hosts: Vec<String>,
    /// Restart policy name
    pub restart: Option<String>,
    /// Bind mounts / volumes
    pub binds: Vec<String>,
}

/// Image build request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Build context directory
    pub context: PathBuf,
    /// Dockerfile, relative to the context or absolute
    pub dockerfile: String,
    /// Target stage
    pub target: Option<String>,
    /// Resulting image tag
    pub tag: String,
}

/// Container as reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
    /// Creation time, seconds since the epoch
    pub created: i64,
    pub labels: BTreeMap<String, String>,
}

impl ContainerSummary {
    /// Compose project this container belongs to
    pub fn project(&self) -> Option<&str> {
        self.labels.get(PROJECT_LABEL).map(String::as_str)
    }
}

/// Narrow container engine interface
#[allow(async_fn_in_trait)]
pub trait Engine {
    /// Check the engine is reachable
    async fn ping(&self) -> Result<()>;

    /// Create the network unless one with exactly this name exists
    async fn ensure_network(&self, name: &str) -> Result<()>;

    /// Pull an image
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Build an image from a local context
    async fn build_image(&self, request: &BuildRequest) -> Result<()>;

    /// Create a container, returning its ID
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Start a container by ID or name
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Stop a container; returns false if it does not exist
    async fn stop_container(&self, name: &str) -> Result<bool>;

    /// Force-remove a container; returns false if it does not exist
    async fn remove_container(&self, name: &str) -> Result<bool>;

    /// List containers, optionally only those of one compose project
    async fn list_containers(&self, project: Option<&str>) -> Result<Vec<ContainerSummary>>;

    /// Copy a container's logs to `out`
    async fn logs(&self, name: &str, follow: bool, out: &mut (dyn Write + Send)) -> Result<()>;
}
