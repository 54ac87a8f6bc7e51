//! Docker Compose orchestrator

use super::config::{ComposeDocument, ServiceSource, ServiceSpec};
use super::parser::ComposeParser;
use crate::engine::{
    BuildRequest, ContainerSpec, Engine, CONFIG_FILES_LABEL, ONEOFF_LABEL, PROJECT_LABEL,
    SERVICE_LABEL, VERSION_LABEL, WORKING_DIR_LABEL,
};
use crate::error::{EnvmeError, Result};
use crate::state::StateDir;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Value written to the compose version label
pub const COMPOSE_LABEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compose orchestrator for one project (one service directory)
#[derive(Debug, Clone)]
pub struct ComposeOrchestrator {
    /// Project name
    project_name: String,
    /// Compose document
    document: ComposeDocument,
    /// Project working directory
    working_dir: PathBuf,
    /// Files the document was loaded from
    config_files: Vec<PathBuf>,
}

impl ComposeOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        project_name: &str,
        document: ComposeDocument,
        working_dir: PathBuf,
        config_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            project_name: project_name.to_string(),
            document,
            working_dir,
            config_files,
        }
    }

    /// Load the project written for a service
    pub fn load(state: &StateDir, name: &str) -> Result<Self> {
        let file = state.compose_file(name);
        let document = ComposeParser::parse_file(&file)?;
        Ok(Self::new(name, document, state.service_dir(name), vec![file]))
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn document(&self) -> &ComposeDocument {
        &self.document
    }

    /// Create and start every service, aborting on the first failure
    pub async fn up<E: Engine>(&self, engine: &E) -> Result<()> {
        tracing::info!("Starting compose project: {}", self.project_name);

        for (service_name, service) in &self.document.services {
            for network in &service.networks {
                engine.ensure_network(network).await?;
            }

            let image = self.image_for(service_name, service);
            match service.source() {
                Some(ServiceSource::Image(image)) => engine.pull_image(image).await?,
                Some(ServiceSource::Build(build)) => {
                    let request = BuildRequest {
                        context: self.resolve_context(&build.context),
                        dockerfile: build.dockerfile.clone(),
                        target: Some(build.target.clone()).filter(|t| !t.is_empty()),
                        tag: image.clone(),
                    };
                    engine.build_image(&request).await?;
                }
                None => {
                    return Err(EnvmeError::ComposeParse(format!(
                        "Service '{}' must have exactly one of 'image' or 'build' specified",
                        service_name
                    )))
                }
            }

            let spec = self.container_spec(service_name, service, &image);
            if engine.remove_container(&spec.name).await? {
                tracing::info!("Replaced existing container {}", spec.name);
            }
            let id = engine.create_container(&spec).await?;
            engine.start_container(&id).await?;
            tracing::info!("Started service {} as container {}", service_name, spec.name);
        }

        Ok(())
    }

    /// Stop every service's container
    pub async fn stop<E: Engine>(&self, engine: &E) -> Result<()> {
        for (service_name, service) in &self.document.services {
            let name = self.container_name(service_name, service);
            if !engine.stop_container(&name).await? {
                tracing::warn!("Container {} does not exist", name);
            }
        }
        Ok(())
    }

    /// Stop and remove every service's container
    pub async fn down<E: Engine>(&self, engine: &E) -> Result<()> {
        tracing::info!("Stopping compose project: {}", self.project_name);

        for (service_name, service) in &self.document.services {
            let name = self.container_name(service_name, service);
            if !engine.remove_container(&name).await? {
                tracing::warn!("Container {} does not exist", name);
            }
        }
        Ok(())
    }

    /// Container name of a service
    pub fn container_name(&self, service_name: &str, service: &ServiceSpec) -> String {
        if service.container_name.is_empty() {
            format!("{}-{}-1", self.project_name, service_name)
        } else {
            service.container_name.clone()
        }
    }

    /// Image a service runs: its own, or the tag its build produces
    pub fn image_for(&self, service_name: &str, service: &ServiceSpec) -> String {
        match &service.image {
            Some(image) => image.clone(),
            None => format!("envme-{}-{}:latest", self.project_name, service_name),
        }
    }

    /// Labels compose expects on the containers of a project
    pub fn labels(&self, service_name: &str) -> BTreeMap<String, String> {
        let config_files = self
            .config_files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",");

        BTreeMap::from([
            (PROJECT_LABEL.to_string(), self.project_name.clone()),
            (SERVICE_LABEL.to_string(), service_name.to_string()),
            (VERSION_LABEL.to_string(), COMPOSE_LABEL_VERSION.to_string()),
            (
                WORKING_DIR_LABEL.to_string(),
                self.working_dir.to_string_lossy().into_owned(),
            ),
            (CONFIG_FILES_LABEL.to_string(), config_files),
            (ONEOFF_LABEL.to_string(), "False".to_string()),
        ])
    }

    /// Convert a service into a container spec
    fn container_spec(&self, service_name: &str, service: &ServiceSpec, image: &str) -> ContainerSpec {
        ContainerSpec {
            name: self.container_name(service_name, service),
            image: image.to_string(),
            env: service.environment.clone(),
            labels: self.labels(service_name),
            network: service.networks.first().cloned(),
            extra_hosts: service.extra_hosts.clone(),
            restart: Some(service.restart.clone()).filter(|r| !r.is_empty()),
            binds: service.volumes.clone(),
        }
    }

    fn resolve_context(&self, context: &str) -> PathBuf {
        let path = Path::new(context);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}
