//! Docker Engine API adapter

use super::context::pack_context;
use super::{BuildRequest, ContainerSpec, ContainerSummary, Engine, PROJECT_LABEL};
use crate::error::{EnvmeError, Result};
use crate::state::Settings;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{BuildImageOptions, CreateImageOptions};
use bollard::models::{HostConfig, RestartPolicy, RestartPolicyNameEnum};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::Docker;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::time::Duration;

/// Seconds a container gets to exit before it is killed on stop
const STOP_GRACE_SECS: i64 = 10;

/// Engine backed by the local Docker daemon
pub struct DockerEngine {
    docker: Docker,
    timeout: Duration,
    build_timeout: Duration,
}

impl DockerEngine {
    /// Connect using the local defaults (`DOCKER_HOST` or the default socket)
    /// and negotiate the API version
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let timeout = settings.engine_timeout();
        let docker = Docker::connect_with_local_defaults()?;
        let docker = deadline("connect to Docker", timeout, async {
            Ok(docker.negotiate_version().await?)
        })
        .await?;

        tracing::debug!("Connected to Docker");

        Ok(Self {
            docker,
            timeout,
            build_timeout: settings.build_timeout(),
        })
    }
}

impl Engine for DockerEngine {
    async fn ping(&self) -> Result<()> {
        deadline("ping", self.timeout, async {
            self.docker.ping().await?;
            Ok(())
        })
        .await
    }

    async fn ensure_network(&self, name: &str) -> Result<()> {
        deadline("ensure network", self.timeout, async {
            let filters = HashMap::from([("name".to_string(), vec![name.to_string()])]);
            let networks = self
                .docker
                .list_networks(Some(ListNetworksOptions { filters }))
                .await?;

            // the name filter matches substrings
            if networks.iter().any(|n| n.name.as_deref() == Some(name)) {
                tracing::debug!("Network {} already exists", name);
                return Ok(());
            }

            let options = CreateNetworkOptions {
                name: name.to_string(),
                driver: "bridge".to_string(),
                ..Default::default()
            };
            self.docker.create_network(options).await?;
            tracing::info!("Created network {}", name);
            Ok(())
        })
        .await
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        deadline("image pull", self.build_timeout, async {
            let (from_image, tag) = split_reference(image);
            let options = CreateImageOptions {
                from_image: from_image.to_string(),
                tag: tag.to_string(),
                ..Default::default()
            };

            tracing::info!("Pulling image {}", image);
            let mut stream = self.docker.create_image(Some(options), None, None);
            while let Some(info) = stream.next().await {
                let info = info?;
                if let Some(status) = info.status {
                    match info.progress {
                        Some(progress) => tracing::debug!("{} {}", status, progress),
                        None => tracing::debug!("{}", status),
                    }
                }
            }
            Ok(())
        })
        .await
    }

    async fn build_image(&self, request: &BuildRequest) -> Result<()> {
        deadline("image build", self.build_timeout, async {
            let packed = pack_context(&request.context, &request.dockerfile)?;
            let options = BuildImageOptions {
                dockerfile: packed.dockerfile,
                t: request.tag.clone(),
                target: request.target.clone().unwrap_or_default(),
                rm: true,
                ..Default::default()
            };

            tracing::info!(
                "Building image {} from {}",
                request.tag,
                request.context.display()
            );
            let mut stream = self
                .docker
                .build_image(options, None, Some(packed.archive.into()));
            while let Some(info) = stream.next().await {
                let info = info?;
                if let Some(error) = info.error {
                    return Err(EnvmeError::Engine(format!(
                        "build of {} failed: {}",
                        request.tag, error
                    )));
                }
                if let Some(line) = info.stream {
                    let line = line.trim_end();
                    if !line.is_empty() {
                        tracing::info!("{}", line);
                    }
                }
            }
            Ok(())
        })
        .await
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        deadline("container create", self.timeout, async {
            let host_config = HostConfig {
                extra_hosts: non_empty(&spec.extra_hosts),
                network_mode: spec.network.clone(),
                restart_policy: spec.restart.as_deref().map(|name| RestartPolicy {
                    name: Some(restart_policy_name(name)),
                    maximum_retry_count: None,
                }),
                binds: non_empty(&spec.binds),
                ..Default::default()
            };

            let config = Config {
                image: Some(spec.image.clone()),
                env: non_empty(&spec.env),
                labels: Some(
                    spec.labels
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<HashMap<_, _>>(),
                ),
                host_config: Some(host_config),
                ..Default::default()
            };

            let options = CreateContainerOptions {
                name: spec.name.clone(),
                platform: None,
            };

            let response = self.docker.create_container(Some(options), config).await?;
            for warning in &response.warnings {
                tracing::warn!("{}: {}", spec.name, warning);
            }
            tracing::debug!("Created container {} ({})", spec.name, response.id);

            Ok(response.id)
        })
        .await
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        deadline("container start", self.timeout, async {
            self.docker
                .start_container(id, None::<StartContainerOptions<String>>)
                .await?;
            Ok(())
        })
        .await
    }

    async fn stop_container(&self, name: &str) -> Result<bool> {
        deadline("container stop", self.timeout, async {
            let options = StopContainerOptions { t: STOP_GRACE_SECS };
            match self.docker.stop_container(name, Some(options)).await {
                Ok(()) => Ok(true),
                // already stopped
                Err(BollardError::DockerResponseServerError {
                    status_code: 304, ..
                }) => Ok(true),
                Err(e) if is_not_found(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn remove_container(&self, name: &str) -> Result<bool> {
        deadline("container remove", self.timeout, async {
            let options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            match self.docker.remove_container(name, Some(options)).await {
                Ok(()) => Ok(true),
                Err(e) if is_not_found(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn list_containers(&self, project: Option<&str>) -> Result<Vec<ContainerSummary>> {
        deadline("container list", self.timeout, async {
            let mut filters = HashMap::new();
            if let Some(project) = project {
                filters.insert(
                    "label".to_string(),
                    vec![format!("{}={}", PROJECT_LABEL, project)],
                );
            }

            let options = ListContainersOptions {
                all: true,
                filters,
                ..Default::default()
            };

            let containers = self.docker.list_containers(Some(options)).await?;
            Ok(containers
                .into_iter()
                .map(|c| ContainerSummary {
                    id: c.id.unwrap_or_default(),
                    name: c
                        .names
                        .and_then(|names| names.into_iter().next())
                        .map(|n| n.trim_start_matches('/').to_string())
                        .unwrap_or_default(),
                    image: c.image.unwrap_or_default(),
                    state: c.state.unwrap_or_default(),
                    status: c.status.unwrap_or_default(),
                    created: c.created.unwrap_or_default(),
                    labels: c.labels.unwrap_or_default().into_iter().collect(),
                })
                .collect())
        })
        .await
    }

    async fn logs(&self, name: &str, follow: bool, out: &mut (dyn Write + Send)) -> Result<()> {
        let options = LogsOptions::<String> {
            follow,
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };

        let copy = async {
            let mut stream = self.docker.logs(name, Some(options));
            while let Some(output) = stream.next().await {
                let output = match output {
                    Ok(output) => output,
                    Err(e) if is_not_found(&e) => {
                        return Err(EnvmeError::ServiceNotFound(name.to_string()))
                    }
                    Err(e) => return Err(e.into()),
                };
                out.write_all(&output.into_bytes())?;
            }
            out.flush()?;
            Ok(())
        };

        if follow {
            copy.await
        } else {
            deadline("container logs", self.timeout, copy).await
        }
    }
}

/// Run `fut`, failing with a timeout error after `limit`
async fn deadline<T, F>(what: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        EnvmeError::Timeout(format!("{} did not finish within {}s", what, limit.as_secs()))
    })?
}

fn is_not_found(err: &BollardError) -> bool {
    matches!(
        err,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

fn restart_policy_name(name: &str) -> RestartPolicyNameEnum {
    match name {
        "no" => RestartPolicyNameEnum::NO,
        "always" => RestartPolicyNameEnum::ALWAYS,
        "unless-stopped" => RestartPolicyNameEnum::UNLESS_STOPPED,
        "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
        _ => RestartPolicyNameEnum::EMPTY,
    }
}

/// Split an image reference into repository and tag, defaulting to `latest`.
///
/// Digest references are passed through whole with an empty tag.
fn split_reference(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }
    match image.rfind(':') {
        Some(i) if !image[i + 1..].contains('/') => (&image[..i], &image[i + 1..]),
        _ => (image, "latest"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference("nginx"), ("nginx", "latest"));
        assert_eq!(split_reference("backend:1.2"), ("backend", "1.2"));
        assert_eq!(
            split_reference("localhost:5000/team/api"),
            ("localhost:5000/team/api", "latest")
        );
        assert_eq!(
            split_reference("localhost:5000/team/api:dev"),
            ("localhost:5000/team/api", "dev")
        );
        assert_eq!(
            split_reference("nginx@sha256:abcd"),
            ("nginx@sha256:abcd", "")
        );
    }

    #[test]
    fn test_restart_policy_name() {
        assert_eq!(
            restart_policy_name("unless-stopped"),
            RestartPolicyNameEnum::UNLESS_STOPPED
        );
        assert_eq!(restart_policy_name("bogus"), RestartPolicyNameEnum::EMPTY);
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let result: Result<()> = deadline("sleep", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(EnvmeError::Timeout(_))));
    }
}
