//! Compose document builder
//!
//! Pure functions mapping a service or dev-environment request onto a
//! [`ComposeDocument`]. Serialization and writing live in the writer.

use super::config::{BuildSpec, ComposeDocument, NetworkSpec, ServiceSpec};
use crate::env::EnvAssignments;
use crate::error::{EnvmeError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Restart policy applied to every generated service
pub const RESTART_POLICY: &str = "unless-stopped";

/// Extra host entry letting containers reach the host
pub const HOST_GATEWAY: &str = "host.docker.internal:host-gateway";

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid regex"))
}

/// Check a service name is usable as both a container name and a directory
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EnvmeError::usage("Service name is required"));
    }
    if !name_pattern().is_match(name) {
        return Err(EnvmeError::usage(format!(
            "Invalid service name '{}': use letters, digits, '_', '.' or '-', starting with a letter or digit",
            name
        )));
    }
    Ok(())
}

fn validate_network(network: &str) -> Result<()> {
    if network.is_empty() {
        return Err(EnvmeError::usage("Network name is required"));
    }
    Ok(())
}

/// Document for a service running a pre-built image
pub fn build_service_document(
    name: &str,
    image: &str,
    network: &str,
    env: &EnvAssignments,
) -> Result<ComposeDocument> {
    validate_name(name)?;
    validate_network(network)?;

    let service = ServiceSpec {
        image: Some(image.to_string()),
        ..base_service(name, network, env)
    };

    Ok(single_service_document(name, service, network))
}

/// Document for a dev environment built from a local directory
pub fn build_dev_document(
    name: &str,
    dir: &Path,
    dockerfile: &str,
    target: &str,
    network: &str,
    env: &EnvAssignments,
) -> Result<ComposeDocument> {
    validate_name(name)?;
    validate_network(network)?;

    let service = ServiceSpec {
        build: Some(BuildSpec {
            context: dir.to_string_lossy().into_owned(),
            dockerfile: dockerfile.to_string(),
            target: target.to_string(),
        }),
        ..base_service(name, network, env)
    };

    Ok(single_service_document(name, service, network))
}

fn base_service(name: &str, network: &str, env: &EnvAssignments) -> ServiceSpec {
    ServiceSpec {
        container_name: name.to_string(),
        image: None,
        build: None,
        restart: RESTART_POLICY.to_string(),
        volumes: Vec::new(),
        environment: env.to_strings(),
        networks: vec![network.to_string()],
        extra_hosts: vec![HOST_GATEWAY.to_string()],
    }
}

fn single_service_document(name: &str, service: ServiceSpec, network: &str) -> ComposeDocument {
    let mut doc = ComposeDocument::default();
    doc.services.insert(name.to_string(), service);
    doc.networks
        .insert(network.to_string(), NetworkSpec::external());
    doc
}
