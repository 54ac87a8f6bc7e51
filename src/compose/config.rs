//! Docker Compose document types

use crate::error::{EnvmeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compose file version written into every document
pub const COMPOSE_VERSION: &str = "3.8";

/// Docker Compose document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDocument {
    /// Compose file version
    #[serde(default)]
    pub version: String,
    /// Services
    #[serde(default)]
    pub services: BTreeMap<String, ServiceSpec>,
    /// Networks
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, NetworkSpec>,
    /// Volumes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, VolumeSpec>,
}

impl Default for ComposeDocument {
    fn default() -> Self {
        Self {
            version: COMPOSE_VERSION.to_string(),
            services: BTreeMap::new(),
            networks: BTreeMap::new(),
            volumes: BTreeMap::new(),
        }
    }
}

/// Service definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Container name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_name: String,
    /// Image name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    /// Restart policy
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub restart: String,
    /// Volume mounts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Environment variables as `KEY=VALUE`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    /// Networks to connect to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    /// Extra hosts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,
}

/// Where a service's image comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceSource<'a> {
    /// Pre-built image
    Image(&'a str),
    /// Built from a local directory
    Build(&'a BuildSpec),
}

impl ServiceSpec {
    /// The image-vs-build discriminator, if exactly one is set
    pub fn source(&self) -> Option<ServiceSource<'_>> {
        match (&self.image, &self.build) {
            (Some(image), None) => Some(ServiceSource::Image(image)),
            (None, Some(build)) => Some(ServiceSource::Build(build)),
            _ => None,
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Build context (absolute path)
    pub context: String,
    /// Dockerfile, relative to the context or absolute
    pub dockerfile: String,
    /// Target stage
    pub target: String,
}

/// Network configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// External network
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
    /// Name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NetworkSpec {
    /// A pre-existing network referenced by name
    pub fn external() -> Self {
        Self {
            external: true,
            ..Default::default()
        }
    }
}

/// Volume configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// External volume
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
    /// Name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ComposeDocument {
    /// Check the document invariants: at least one service, each service has
    /// exactly one of image or build, and every network a service joins is
    /// declared
    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(EnvmeError::ComposeParse(
                "document has no services".to_string(),
            ));
        }

        for (name, service) in &self.services {
            if service.source().is_none() {
                return Err(EnvmeError::ComposeParse(format!(
                    "Service '{}' must have exactly one of 'image' or 'build' specified",
                    name
                )));
            }

            for net in &service.networks {
                if !self.networks.contains_key(net) {
                    return Err(EnvmeError::ComposeParse(format!(
                        "Service '{}' references undefined network '{}'",
                        name, net
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(image: Option<&str>, build: Option<BuildSpec>) -> ServiceSpec {
        ServiceSpec {
            container_name: "api".to_string(),
            image: image.map(str::to_string),
            build,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let mut doc = ComposeDocument::default();
        doc.services
            .insert("api".to_string(), service(Some("nginx"), None));

        let yaml = serde_yaml::to_string(&doc).unwrap();
        assert!(yaml.contains("image: nginx"));
        for key in ["build", "restart", "environment", "extra_hosts", "networks", "volumes"] {
            assert!(!yaml.contains(key), "{} should be omitted:\n{}", key, yaml);
        }
    }

    #[test]
    fn test_external_false_is_omitted() {
        let yaml = serde_yaml::to_string(&NetworkSpec::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");

        let yaml = serde_yaml::to_string(&NetworkSpec::external()).unwrap();
        assert_eq!(yaml.trim(), "external: true");
    }

    #[test]
    fn test_validate_requires_exactly_one_source() {
        let mut doc = ComposeDocument::default();
        doc.services.insert("api".to_string(), service(None, None));
        assert!(doc.validate().is_err());

        doc.services.insert(
            "api".to_string(),
            service(Some("nginx"), Some(BuildSpec::default())),
        );
        assert!(doc.validate().is_err());

        doc.services
            .insert("api".to_string(), service(Some("nginx"), None));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_validate_undeclared_network() {
        let mut doc = ComposeDocument::default();
        let mut svc = service(Some("nginx"), None);
        svc.networks = vec!["envme".to_string()];
        doc.services.insert("api".to_string(), svc);
        assert!(doc.validate().is_err());

        doc.networks
            .insert("envme".to_string(), NetworkSpec::external());
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_validate_no_services() {
        assert!(ComposeDocument::default().validate().is_err());
    }
}
