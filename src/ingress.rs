//! Ingress rules for exposing services through a tunnel
//!
//! `expose` records which public hostname routes to which service port. The
//! rules are kept in a tunnel configuration file (`~/.envme/ingress.yaml`)
//! ending with a catch-all rule; envme does not run the tunnel itself.

use crate::compose::writer::write_atomic;
use crate::error::{EnvmeError, Result};
use crate::state::{Settings, StateDir};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Service of the rule matching every other request
pub const CATCH_ALL_SERVICE: &str = "http_status:404";

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)*[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("valid regex")
    })
}

/// A port of a service made reachable under a hostname
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exposure {
    pub port: u16,
    pub hostname: String,
}

impl Exposure {
    /// Validate a port and hostname pair
    pub fn new(port: &str, hostname: &str) -> Result<Self> {
        let port = port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| EnvmeError::usage(format!("Invalid port '{}'", port.trim())))?;

        let hostname = hostname.trim();
        if hostname.is_empty() || hostname.len() > 253 || !hostname_pattern().is_match(hostname) {
            return Err(EnvmeError::usage(format!("Invalid hostname '{}'", hostname)));
        }

        Ok(Self {
            port,
            hostname: hostname.to_string(),
        })
    }

    /// Parse the `PORT:HOSTNAME` flag syntax
    pub fn parse(raw: &str) -> Result<Self> {
        let (port, hostname) = raw.split_once(':').ok_or_else(|| {
            EnvmeError::usage(format!("Invalid expose '{}': expected PORT:HOSTNAME", raw))
        })?;
        Self::new(port, hostname)
    }

    /// Parse multi-line text, one `PORT:HOSTNAME` per non-empty line
    pub fn parse_lines(text: &str) -> Result<Vec<Self>> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// URL the tunnel forwards to, on the shared network
    pub fn service_url(&self, service: &str) -> String {
        format!("http://{}:{}", service, self.port)
    }
}

/// One ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub service: String,
}

impl IngressRule {
    fn catch_all() -> Self {
        Self {
            hostname: None,
            service: CATCH_ALL_SERVICE.to_string(),
        }
    }

    /// Service name and port this rule targets, if it points at a service
    pub fn target(&self) -> Option<(&str, u16)> {
        let rest = self.service.strip_prefix("http://")?;
        let (name, port) = rest.rsplit_once(':')?;
        Some((name, port.parse().ok()?))
    }
}

/// Tunnel configuration with its ingress rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressConfig {
    pub tunnel: String,
    #[serde(rename = "credentials-file")]
    pub credentials_file: String,
    #[serde(default)]
    pub ingress: Vec<IngressRule>,
}

impl IngressConfig {
    /// Empty configuration for the configured tunnel
    pub fn new(settings: &Settings, state: &StateDir) -> Self {
        Self {
            tunnel: settings.tunnel.clone(),
            credentials_file: settings
                .credentials_file(state)
                .to_string_lossy()
                .into_owned(),
            ingress: vec![IngressRule::catch_all()],
        }
    }

    /// Load the ingress file, or start an empty configuration
    pub fn load(settings: &Settings, state: &StateDir) -> Result<Self> {
        let path = state.ingress_file();
        if !path.exists() {
            return Ok(Self::new(settings, state));
        }

        let content = std::fs::read_to_string(&path)?;
        let mut config: Self = serde_yaml::from_str(&content)
            .map_err(|e| EnvmeError::Yaml(format!("{}: {}", path.display(), e)))?;
        config.normalize();
        Ok(config)
    }

    /// Write the ingress file, replacing it atomically
    pub fn save(&self, state: &StateDir) -> Result<()> {
        let root = state.ensure()?;
        let content = serde_yaml::to_string(self)?;
        write_atomic(root, &state.ingress_file(), content.as_bytes())
    }

    /// Route `hostname` to a service port, replacing any rule for that hostname
    pub fn upsert(&mut self, service: &str, exposure: &Exposure) {
        let rule = IngressRule {
            hostname: Some(exposure.hostname.clone()),
            service: exposure.service_url(service),
        };

        match self
            .ingress
            .iter_mut()
            .find(|r| r.hostname.as_deref() == Some(exposure.hostname.as_str()))
        {
            Some(existing) => *existing = rule,
            None => self.ingress.push(rule),
        }
        self.normalize();
    }

    /// Drop every rule targeting a service; returns how many were removed
    pub fn remove_service(&mut self, service: &str) -> usize {
        let before = self.ingress.len();
        self.ingress
            .retain(|r| r.target().map_or(true, |(name, _)| name != service));
        before - self.ingress.len()
    }

    /// Exposures of one service, in rule order
    pub fn exposures(&self, service: &str) -> Vec<Exposure> {
        self.ingress
            .iter()
            .filter_map(|r| {
                let (name, port) = r.target()?;
                let hostname = r.hostname.clone()?;
                (name == service).then_some(Exposure { port, hostname })
            })
            .collect()
    }

    /// Keep exactly one catch-all rule, last
    fn normalize(&mut self) {
        self.ingress.retain(|r| r.hostname.is_some());
        self.ingress.push(IngressRule::catch_all());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_exposure() {
        let e = Exposure::parse("8080:api.envme.bid").unwrap();
        assert_eq!(e.port, 8080);
        assert_eq!(e.hostname, "api.envme.bid");
        assert_eq!(e.service_url("api"), "http://api:8080");

        assert!(Exposure::parse("8080").is_err());
        assert!(Exposure::parse("http:api.envme.bid").is_err());
        assert!(Exposure::parse("0:api.envme.bid").is_err());
        assert!(Exposure::parse("70000:api.envme.bid").is_err());
        assert!(Exposure::parse("8080:").is_err());
        assert!(Exposure::parse("8080:bad host").is_err());
    }

    #[test]
    fn test_parse_lines() {
        let exposures = Exposure::parse_lines("8080:api.envme.bid\n\n3000:envme.bid\n").unwrap();
        assert_eq!(exposures.len(), 2);
        assert!(Exposure::parse_lines("8080:api.envme.bid\nnope").is_err());
    }

    #[test]
    fn test_upsert_keeps_catch_all_last() {
        let state = StateDir::new("/tmp/envme-test");
        let mut config = IngressConfig::new(&Settings::default(), &state);

        config.upsert("api", &Exposure::parse("8080:api.envme.bid").unwrap());
        config.upsert("web", &Exposure::parse("3000:envme.bid").unwrap());
        config.upsert("api2", &Exposure::parse("9090:api.envme.bid").unwrap());

        assert_eq!(config.ingress.len(), 3);
        assert_eq!(config.ingress[0].service, "http://api2:9090");
        assert_eq!(config.ingress[1].service, "http://web:3000");
        assert_eq!(config.ingress[2], IngressRule::catch_all());
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let state = StateDir::new(temp.path());
        let settings = Settings::default();

        let mut config = IngressConfig::load(&settings, &state).unwrap();
        config.upsert("api", &Exposure::parse("8080:api.envme.bid").unwrap());
        config.save(&state).unwrap();

        let content = std::fs::read_to_string(state.ingress_file()).unwrap();
        assert!(content.contains("tunnel: envme"));
        assert!(content.contains("credentials-file:"));
        assert!(content.contains("hostname: api.envme.bid"));
        assert!(content.contains("service: http_status:404"));

        let loaded = IngressConfig::load(&settings, &state).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.exposures("api"),
            vec![Exposure {
                port: 8080,
                hostname: "api.envme.bid".to_string()
            }]
        );
        assert!(loaded.exposures("web").is_empty());
    }

    #[test]
    fn test_remove_service() {
        let state = StateDir::new("/tmp/envme-test");
        let mut config = IngressConfig::new(&Settings::default(), &state);
        config.upsert("api", &Exposure::parse("8080:a.envme.bid").unwrap());
        config.upsert("api", &Exposure::parse("8081:b.envme.bid").unwrap());
        config.upsert("web", &Exposure::parse("3000:envme.bid").unwrap());

        assert_eq!(config.remove_service("api"), 2);
        assert_eq!(config.ingress.len(), 2);
        assert!(config.exposures("api").is_empty());
    }
}
