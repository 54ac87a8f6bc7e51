//! Command execution
//!
//! Every create runs builder → writer → orchestrator in sequence and stops
//! at the first failure. A compose file that was written before a failing
//! `up` stays in place; the next create of the same name overwrites it.

use super::request::{DevRequest, ExposeRequest, ServiceRequest};
use crate::compose::builder::validate_name;
use crate::compose::{
    build_dev_document, build_service_document, ComposeDocument, ComposeOrchestrator,
    ComposeParser, ComposeWriter, ServiceSource,
};
use crate::engine::Engine;
use crate::error::{EnvmeError, Result};
use crate::ingress::{Exposure, IngressConfig};
use crate::state::layout::DOCKERFILE_NAME;
use crate::state::{Settings, StateDir};
use chrono::DateTime;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// State shown for services without a container
pub const NOT_CREATED: &str = "not created";

/// One line of `list service`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRow {
    pub name: String,
    /// Image, or build context for dev environments
    pub source: String,
    pub state: String,
    pub status: String,
    /// Container creation time, empty when not created
    pub created: String,
    pub exposures: Vec<String>,
}

/// Record exposures for a service in the ingress file
pub fn record_exposures(
    state: &StateDir,
    settings: &Settings,
    name: &str,
    exposures: &[Exposure],
) -> Result<()> {
    if exposures.is_empty() {
        return Ok(());
    }

    let mut ingress = IngressConfig::load(settings, state)?;
    for exposure in exposures {
        ingress.upsert(name, exposure);
        tracing::info!(
            "Exposing {} port {} at {}",
            name,
            exposure.port,
            exposure.hostname
        );
    }
    ingress.save(state)
}

/// `expose`: persist an ingress rule for an existing service
pub fn expose(state: &StateDir, settings: &Settings, request: &ExposeRequest) -> Result<()> {
    if !state.has_service(&request.name) {
        return Err(EnvmeError::ServiceNotFound(request.name.clone()));
    }
    record_exposures(
        state,
        settings,
        &request.name,
        std::slice::from_ref(&request.exposure),
    )
}

/// Write plain-text service rows
pub fn write_rows(rows: &[ServiceRow], out: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<20} {:<40} {:<12} {:<20} {:<17} {}",
        "NAME", "SOURCE", "STATE", "STATUS", "CREATED", "EXPOSED"
    )?;
    for r in rows {
        writeln!(
            out,
            "{:<20} {:<40} {:<12} {:<20} {:<17} {}",
            r.name,
            r.source,
            r.state,
            r.status,
            r.created,
            r.exposures.join(", ")
        )?;
    }
    Ok(())
}

/// Executes validated requests against the state directory and an engine
pub struct Dispatcher<E> {
    state: StateDir,
    settings: Settings,
    engine: E,
}

impl<E: Engine> Dispatcher<E> {
    pub fn new(state: StateDir, settings: Settings, engine: E) -> Self {
        Self {
            state,
            settings,
            engine,
        }
    }

    pub fn state(&self) -> &StateDir {
        &self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// `create service`
    pub async fn create_service(&self, request: &ServiceRequest) -> Result<PathBuf> {
        tracing::info!(
            "Creating service {} from image {}",
            request.name,
            request.image
        );

        let document = build_service_document(
            &request.name,
            &request.image,
            &self.settings.network,
            &request.env,
        )?;
        self.deploy(&request.name, &document, &request.exposures)
            .await
    }

    /// `create development`
    pub async fn create_development(&self, request: &DevRequest) -> Result<PathBuf> {
        tracing::info!(
            "Creating development environment {} from {}",
            request.name,
            request.dir.display()
        );

        let dockerfile = if request.template.is_none() {
            request.dockerfile.clone()
        } else {
            self.state
                .service_dir(&request.name)
                .join(DOCKERFILE_NAME)
                .to_string_lossy()
                .into_owned()
        };

        let document = build_dev_document(
            &request.name,
            &request.dir,
            &dockerfile,
            &request.target,
            &self.settings.network,
            &request.env,
        )?;

        if !request.template.is_none() {
            ComposeWriter::new(&self.state).write_dockerfile(&request.name, request.template)?;
        }

        self.deploy(&request.name, &document, &request.exposures)
            .await
    }

    async fn deploy(
        &self,
        name: &str,
        document: &ComposeDocument,
        exposures: &[Exposure],
    ) -> Result<PathBuf> {
        let path = ComposeWriter::new(&self.state).write(name, document)?;

        let orchestrator = ComposeOrchestrator::load(&self.state, name)?;
        orchestrator.up(&self.engine).await?;

        record_exposures(&self.state, &self.settings, name, exposures)?;
        Ok(path)
    }

    /// `list service`
    pub async fn list_services(&self) -> Result<Vec<ServiceRow>> {
        let ingress = IngressConfig::load(&self.settings, &self.state)?;

        let mut rows = Vec::new();
        for name in self.state.services()? {
            let source = match ComposeParser::parse_file(&self.state.compose_file(&name)) {
                Ok(document) => describe_source(&document),
                Err(e) => {
                    tracing::warn!("Could not read compose file of {}: {}", name, e);
                    "(invalid compose file)".to_string()
                }
            };

            let containers = self.engine.list_containers(Some(&name)).await?;
            let (state, status, created) = match containers.first() {
                Some(c) => (c.state.clone(), c.status.clone(), format_created(c.created)),
                None => (NOT_CREATED.to_string(), String::new(), String::new()),
            };

            let exposures = ingress
                .exposures(&name)
                .iter()
                .map(|e| format!("{} -> {}", e.hostname, e.port))
                .collect();

            rows.push(ServiceRow {
                name,
                source,
                state,
                status,
                created,
                exposures,
            });
        }

        Ok(rows)
    }

    /// `stop`
    pub async fn stop(&self, name: &str) -> Result<()> {
        let orchestrator = self.load(name)?;
        orchestrator.stop(&self.engine).await?;
        tracing::info!("Stopped {}", name);
        Ok(())
    }

    /// `remove`: drop the containers, and with `purge` the service's files
    /// and ingress rules too
    pub async fn remove(&self, name: &str, purge: bool) -> Result<()> {
        let orchestrator = self.load(name)?;
        orchestrator.down(&self.engine).await?;
        tracing::info!("Removed containers of {}", name);

        if purge {
            let mut ingress = IngressConfig::load(&self.settings, &self.state)?;
            if ingress.remove_service(name) > 0 {
                ingress.save(&self.state)?;
            }
            self.state.remove_service(name)?;
            tracing::info!("Purged {}", self.state.service_dir(name).display());
        }
        Ok(())
    }

    /// `logs`: copy the logs of every container of a service to `out`
    pub async fn logs(&self, name: &str, follow: bool, out: &mut (dyn Write + Send)) -> Result<()> {
        let orchestrator = self.load(name)?;
        for (service_name, service) in &orchestrator.document().services {
            let container = orchestrator.container_name(service_name, service);
            self.engine.logs(&container, follow, out).await?;
        }
        Ok(())
    }

    fn load(&self, name: &str) -> Result<ComposeOrchestrator> {
        validate_name(name)?;
        if !self.state.has_service(name) {
            return Err(EnvmeError::ServiceNotFound(name.to_string()));
        }
        ComposeOrchestrator::load(&self.state, name)
    }
}

fn format_created(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn describe_source(document: &ComposeDocument) -> String {
    document
        .services
        .values()
        .filter_map(|s| match s.source()? {
            ServiceSource::Image(image) => Some(image.to_string()),
            ServiceSource::Build(build) => Some(format!("build {}", build.context)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::orchestrator::tests::RecordingEngine;
    use crate::compose::DockerfileTemplate;
    use crate::env::EnvAssignments;
    use tempfile::{tempdir, TempDir};

    fn dispatcher(engine: RecordingEngine) -> (TempDir, Dispatcher<RecordingEngine>) {
        let temp = tempdir().unwrap();
        let state = StateDir::new(temp.path());
        (temp, Dispatcher::new(state, Settings::default(), engine))
    }

    fn service(name: &str, image: &str, env: &[&str]) -> ServiceRequest {
        ServiceRequest::new(name, image, EnvAssignments::from_raw(env), Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn test_create_service_writes_and_starts() {
        let (_temp, d) = dispatcher(RecordingEngine::default());

        let path = d
            .create_service(&service("api", "backend:latest", &["PORT=8080"]))
            .await
            .unwrap();
        assert_eq!(path, d.state().compose_file("api"));

        let doc = ComposeParser::parse_file(&path).unwrap();
        assert_eq!(doc.services["api"].image.as_deref(), Some("backend:latest"));
        assert!(d
            .engine()
            .calls
            .borrow()
            .contains(&"start id-api".to_string()));
    }

    #[tokio::test]
    async fn test_second_create_overwrites_without_merging() {
        let (_temp, d) = dispatcher(RecordingEngine::default());

        d.create_service(&service("api", "backend:1", &["PORT=8080", "DEBUG=1"]))
            .await
            .unwrap();
        d.create_service(&service("api", "backend:2", &[]))
            .await
            .unwrap();

        let doc = ComposeParser::parse_file(&d.state().compose_file("api")).unwrap();
        let svc = &doc.services["api"];
        assert_eq!(svc.image.as_deref(), Some("backend:2"));
        assert!(svc.environment.is_empty());
        assert_eq!(d.engine().created.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_up_leaves_file_and_skips_exposures() {
        let engine = RecordingEngine {
            fail_on: Some("create"),
            ..Default::default()
        };
        let (_temp, d) = dispatcher(engine);

        let mut request = service("api", "backend:latest", &[]);
        request.exposures = vec![Exposure::parse("8080:api.envme.bid").unwrap()];

        assert!(d.create_service(&request).await.is_err());
        assert!(d.state().has_service("api"));
        assert!(!d.state().ingress_file().exists());
    }

    #[tokio::test]
    async fn test_create_service_records_exposures() {
        let (_temp, d) = dispatcher(RecordingEngine::default());

        let mut request = service("api", "backend:latest", &[]);
        request.exposures = vec![Exposure::parse("8080:api.envme.bid").unwrap()];
        d.create_service(&request).await.unwrap();

        let ingress = IngressConfig::load(&Settings::default(), d.state()).unwrap();
        assert_eq!(ingress.exposures("api"), request.exposures);
    }

    #[tokio::test]
    async fn test_create_development_with_template() {
        let (_temp, d) = dispatcher(RecordingEngine::default());
        let project = tempdir().unwrap();

        let request = DevRequest::new(
            "web",
            &project.path().to_string_lossy(),
            "Dockerfile",
            "development",
            DockerfileTemplate::Laravel,
            EnvAssignments::new(),
            Vec::new(),
        )
        .unwrap();
        d.create_development(&request).await.unwrap();

        let dockerfile = d.state().service_dir("web").join("Dockerfile");
        let contents = std::fs::read_to_string(&dockerfile).unwrap();
        assert!(contents.contains("AS development"));

        let doc = ComposeParser::parse_file(&d.state().compose_file("web")).unwrap();
        let build = doc.services["web"].build.as_ref().unwrap();
        assert_eq!(build.dockerfile, dockerfile.to_string_lossy());
        assert_eq!(build.context, project.path().to_string_lossy());

        let builds = d.engine().builds.borrow();
        assert_eq!(builds[0].dockerfile, dockerfile.to_string_lossy());
        assert_eq!(builds[0].tag, "envme-web-web:latest");
    }

    #[tokio::test]
    async fn test_create_development_without_template_keeps_dockerfile_name() {
        let (_temp, d) = dispatcher(RecordingEngine::default());
        let project = tempdir().unwrap();

        let request = DevRequest::new(
            "web",
            &project.path().to_string_lossy(),
            "Dockerfile.dev",
            "dev",
            DockerfileTemplate::None,
            EnvAssignments::new(),
            Vec::new(),
        )
        .unwrap();
        d.create_development(&request).await.unwrap();

        assert!(!d.state().service_dir("web").join("Dockerfile").exists());
        let doc = ComposeParser::parse_file(&d.state().compose_file("web")).unwrap();
        let build = doc.services["web"].build.as_ref().unwrap();
        assert_eq!(build.dockerfile, "Dockerfile.dev");
        assert_eq!(build.target, "dev");
    }

    #[tokio::test]
    async fn test_expose_requires_existing_service() {
        let (_temp, d) = dispatcher(RecordingEngine::default());
        let request = ExposeRequest::new("api", "8080", "api.envme.bid").unwrap();

        let err = expose(d.state(), &Settings::default(), &request).unwrap_err();
        assert!(matches!(err, EnvmeError::ServiceNotFound(_)));

        d.create_service(&service("api", "backend:latest", &[]))
            .await
            .unwrap();
        expose(d.state(), &Settings::default(), &request).unwrap();

        let content = std::fs::read_to_string(d.state().ingress_file()).unwrap();
        assert!(content.contains("service: http://api:8080"));
    }

    #[tokio::test]
    async fn test_list_services() {
        let (_temp, d) = dispatcher(RecordingEngine::default());
        d.create_service(&service("api", "backend:latest", &[]))
            .await
            .unwrap();
        ComposeWriter::new(d.state())
            .write(
                "idle",
                &build_service_document("idle", "redis:7", "envme", &EnvAssignments::new())
                    .unwrap(),
            )
            .unwrap();
        expose(
            d.state(),
            &Settings::default(),
            &ExposeRequest::new("api", "8080", "api.envme.bid").unwrap(),
        )
        .unwrap();

        let rows = d.list_services().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "api");
        assert_eq!(rows[0].source, "backend:latest");
        assert_eq!(rows[0].state, "running");
        assert_eq!(rows[0].exposures, vec!["api.envme.bid -> 8080"]);
        assert_eq!(rows[1].name, "idle");
        assert_eq!(rows[1].state, NOT_CREATED);

        assert_eq!(rows[0].created, "1970-01-01 00:00");
        assert!(rows[1].created.is_empty());

        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["name"], "api");

        let mut out = Vec::new();
        write_rows(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("NAME"));
        assert!(text.contains("redis:7"));
    }

    #[tokio::test]
    async fn test_remove_with_purge() {
        let (_temp, d) = dispatcher(RecordingEngine::default());
        let mut request = service("api", "backend:latest", &[]);
        request.exposures = vec![Exposure::parse("8080:api.envme.bid").unwrap()];
        d.create_service(&request).await.unwrap();

        d.remove("api", false).await.unwrap();
        assert!(d.state().has_service("api"));
        assert!(d.engine().existing.borrow().is_empty());

        d.remove("api", true).await.unwrap();
        assert!(!d.state().has_service("api"));
        let ingress = IngressConfig::load(&Settings::default(), d.state()).unwrap();
        assert!(ingress.exposures("api").is_empty());
    }

    #[tokio::test]
    async fn test_stop_and_logs() {
        let (_temp, d) = dispatcher(RecordingEngine::default());
        assert!(matches!(
            d.stop("api").await,
            Err(EnvmeError::ServiceNotFound(_))
        ));

        d.create_service(&service("api", "backend:latest", &[]))
            .await
            .unwrap();
        d.stop("api").await.unwrap();
        assert!(d.engine().calls.borrow().contains(&"stop api".to_string()));

        let mut out = Vec::new();
        d.logs("api", false, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hello from api\n");
    }

    #[tokio::test]
    async fn test_remove_refuses_names_outside_state_dir() {
        let temp = tempdir().unwrap();
        let state = StateDir::new(temp.path().join(".envme"));
        state.ensure().unwrap();
        let d = Dispatcher::new(state, Settings::default(), RecordingEngine::default());

        let project = temp.path().join("myproj");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(
            project.join("docker-compose.yaml"),
            "version: '3.8'\nservices:\n  db:\n    image: postgres:16\n",
        )
        .unwrap();
        std::fs::write(project.join("important.txt"), "keep me").unwrap();

        for name in ["../myproj", ".."] {
            assert!(matches!(
                d.remove(name, true).await,
                Err(EnvmeError::Usage(_))
            ));
            assert!(matches!(d.stop(name).await, Err(EnvmeError::Usage(_))));
            assert!(matches!(
                d.logs(name, false, &mut Vec::<u8>::new()).await,
                Err(EnvmeError::Usage(_))
            ));
        }

        assert!(project.join("important.txt").exists());
        assert!(d.engine().calls.borrow().is_empty());
    }
}
