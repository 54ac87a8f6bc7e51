//! Command inputs and validated requests
//!
//! Each command starts from an `*Input` holding whatever the command line
//! supplied. Missing positionals are collected with a form when interactive
//! mode is on, otherwise they are a usage error. The result is a validated
//! `*Request` that is passed explicitly to the dispatcher.

use crate::compose::builder::validate_name;
use crate::compose::DockerfileTemplate;
use crate::env::{read_env_file, EnvAssignments};
use crate::error::{EnvmeError, Result};
use crate::ingress::Exposure;
use crate::state::{resolve_absolute_path, Settings, StateDir};
use crate::tui::forms;
use std::path::PathBuf;

/// Flags shared by the create subcommands
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// `-e KEY=VALUE` assignments
    pub env: Vec<String>,
    /// `--env-file`; replaces `env` when given
    pub env_file: Option<String>,
    /// `-p PORT:HOSTNAME` exposures
    pub expose: Vec<String>,
}

impl CreateOptions {
    /// Environment from the env file if one was given, else from `-e`
    pub fn environment(&self) -> Result<EnvAssignments> {
        match read_env_file(self.env_file.as_deref().unwrap_or(""))? {
            Some(env) => Ok(env),
            None => Ok(EnvAssignments::from_raw(&self.env)),
        }
    }

    pub fn exposures(&self) -> Result<Vec<Exposure>> {
        self.expose.iter().map(|e| Exposure::parse(e)).collect()
    }
}

/// Decide whether missing arguments are collected interactively
pub fn needs_prompt(missing: &[&str], interactive: bool) -> Result<bool> {
    if missing.is_empty() {
        return Ok(false);
    }
    if interactive {
        return Ok(true);
    }

    let names = missing
        .iter()
        .map(|m| format!("<{}>", m))
        .collect::<Vec<_>>()
        .join(", ");
    Err(EnvmeError::usage(format!(
        "Missing required arguments: {} (pass them, or use -i to fill in a form)",
        names
    )))
}

fn missing(args: &[(&'static str, &Option<String>)]) -> Vec<&'static str> {
    args.iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect()
}

fn required(value: Option<String>, what: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EnvmeError::usage(format!("Missing required argument <{}>", what)))
}

/// A service running a pre-built image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub name: String,
    pub image: String,
    pub env: EnvAssignments,
    pub exposures: Vec<Exposure>,
}

impl ServiceRequest {
    pub fn new(
        name: &str,
        image: &str,
        env: EnvAssignments,
        exposures: Vec<Exposure>,
    ) -> Result<Self> {
        validate_name(name)?;
        if image.trim().is_empty() {
            return Err(EnvmeError::usage("Image name is required"));
        }

        Ok(Self {
            name: name.to_string(),
            image: image.trim().to_string(),
            env,
            exposures,
        })
    }
}

/// `create service` arguments
#[derive(Debug, Clone, Default)]
pub struct ServiceInput {
    pub name: Option<String>,
    pub image: Option<String>,
    pub options: CreateOptions,
}

impl ServiceInput {
    pub fn missing(&self) -> Vec<&'static str> {
        missing(&[("name", &self.name), ("image", &self.image)])
    }

    /// Build the request, prompting for missing arguments when interactive
    pub fn collect(self, interactive: bool, settings: &Settings) -> Result<ServiceRequest> {
        if needs_prompt(&self.missing(), interactive)? {
            return forms::prompt_service(&self, settings);
        }
        self.into_request()
    }

    pub fn into_request(self) -> Result<ServiceRequest> {
        let env = self.options.environment()?;
        let exposures = self.options.exposures()?;
        ServiceRequest::new(
            &required(self.name, "name")?,
            &required(self.image, "image")?,
            env,
            exposures,
        )
    }
}

/// A dev environment built from a local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevRequest {
    pub name: String,
    /// Absolute build context
    pub dir: PathBuf,
    pub dockerfile: String,
    pub target: String,
    pub template: DockerfileTemplate,
    pub env: EnvAssignments,
    pub exposures: Vec<Exposure>,
}

impl DevRequest {
    /// Validate a dev request; `dir` goes through path resolution first
    pub fn new(
        name: &str,
        dir: &str,
        dockerfile: &str,
        target: &str,
        template: DockerfileTemplate,
        env: EnvAssignments,
        exposures: Vec<Exposure>,
    ) -> Result<Self> {
        validate_name(name)?;

        let dir = resolve_absolute_path(dir.trim())?;
        if !dir.is_dir() {
            return Err(EnvmeError::Path(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        if dockerfile.trim().is_empty() {
            return Err(EnvmeError::usage("Dockerfile name is required"));
        }

        Ok(Self {
            name: name.to_string(),
            dir,
            dockerfile: dockerfile.trim().to_string(),
            target: target.trim().to_string(),
            template,
            env,
            exposures,
        })
    }
}

/// `create development` arguments
#[derive(Debug, Clone, Default)]
pub struct DevInput {
    pub name: Option<String>,
    pub dir: Option<String>,
    pub dockerfile: Option<String>,
    pub target: Option<String>,
    pub template: Option<DockerfileTemplate>,
    pub options: CreateOptions,
}

impl DevInput {
    pub fn missing(&self) -> Vec<&'static str> {
        missing(&[("name", &self.name), ("dir", &self.dir)])
    }

    pub fn collect(
        self,
        interactive: bool,
        settings: &Settings,
        state: &StateDir,
    ) -> Result<DevRequest> {
        if needs_prompt(&self.missing(), interactive)? {
            return forms::prompt_development(&self, settings, state);
        }
        self.into_request(settings)
    }

    /// A generated template replaces the Dockerfile, so an explicit
    /// `--dockerfile` cannot be combined with one
    pub fn check_template(&self, template: DockerfileTemplate) -> Result<()> {
        match &self.dockerfile {
            Some(dockerfile) if !template.is_none() => Err(EnvmeError::usage(format!(
                "--dockerfile {} conflicts with --template {}: the template generates its own Dockerfile",
                dockerfile, template
            ))),
            _ => Ok(()),
        }
    }

    /// Build the request; unset flags fall back to the settings
    pub fn into_request(self, settings: &Settings) -> Result<DevRequest> {
        let template = self.template.unwrap_or_default();
        self.check_template(template)?;

        let env = self.options.environment()?;
        let exposures = self.options.exposures()?;
        DevRequest::new(
            &required(self.name, "name")?,
            &required(self.dir, "dir")?,
            self.dockerfile.as_deref().unwrap_or(&settings.dockerfile),
            self.target.as_deref().unwrap_or(&settings.target),
            template,
            env,
            exposures,
        )
    }
}

/// Route a hostname to a service port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposeRequest {
    pub name: String,
    pub exposure: Exposure,
}

impl ExposeRequest {
    pub fn new(name: &str, port: &str, hostname: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            exposure: Exposure::new(port, hostname)?,
        })
    }
}

/// `expose` arguments
#[derive(Debug, Clone, Default)]
pub struct ExposeInput {
    pub name: Option<String>,
    pub port: Option<String>,
    pub hostname: Option<String>,
}

impl ExposeInput {
    pub fn missing(&self) -> Vec<&'static str> {
        missing(&[
            ("name", &self.name),
            ("port", &self.port),
            ("hostname", &self.hostname),
        ])
    }

    pub fn collect(
        self,
        interactive: bool,
        settings: &Settings,
        state: &StateDir,
    ) -> Result<ExposeRequest> {
        if needs_prompt(&self.missing(), interactive)? {
            return forms::prompt_expose(&self, settings, state);
        }
        self.into_request()
    }

    pub fn into_request(self) -> Result<ExposeRequest> {
        ExposeRequest::new(
            &required(self.name, "name")?,
            &required(self.port, "port")?,
            &required(self.hostname, "hostname")?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_without_interactive_is_usage_error() {
        let input = ServiceInput {
            name: Some("api".to_string()),
            ..Default::default()
        };
        assert_eq!(input.missing(), vec!["image"]);

        let err = input.collect(false, &Settings::default()).unwrap_err();
        match err {
            EnvmeError::Usage(message) => assert!(message.contains("<image>")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_needs_prompt() {
        assert!(!needs_prompt(&[], false).unwrap());
        assert!(!needs_prompt(&[], true).unwrap());
        assert!(needs_prompt(&["name"], true).unwrap());
        assert!(needs_prompt(&["name"], false).is_err());
    }

    #[test]
    fn test_complete_input_skips_form_even_when_interactive() {
        let input = ServiceInput {
            name: Some("api".to_string()),
            image: Some("backend:latest".to_string()),
            options: CreateOptions {
                env: vec!["PORT=8080".to_string(), "PORT=9090".to_string()],
                expose: vec!["8080:api.envme.bid".to_string()],
                ..Default::default()
            },
        };

        let request = input.collect(true, &Settings::default()).unwrap();
        assert_eq!(request.name, "api");
        assert_eq!(request.image, "backend:latest");
        assert_eq!(request.env.to_strings(), vec!["PORT=9090"]);
        assert_eq!(request.exposures[0].port, 8080);
    }

    #[test]
    fn test_env_file_replaces_env_flags() {
        let temp = tempdir().unwrap();
        let file = temp.path().join(".env");
        std::fs::write(&file, "PORT=8080\nHOST=localhost\n").unwrap();

        let options = CreateOptions {
            env: vec!["DEBUG=1".to_string()],
            env_file: Some(file.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert_eq!(
            options.environment().unwrap().to_strings(),
            vec!["PORT=8080", "HOST=localhost"]
        );

        let options = CreateOptions {
            env_file: Some(temp.path().join("missing.env").to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(matches!(
            options.environment(),
            Err(EnvmeError::Read { .. })
        ));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let input = ServiceInput {
            name: Some("../etc".to_string()),
            image: Some("nginx".to_string()),
            ..Default::default()
        };
        assert!(matches!(input.into_request(), Err(EnvmeError::Usage(_))));
    }

    #[test]
    fn test_dev_input_falls_back_to_settings() {
        let temp = tempdir().unwrap();
        let input = DevInput {
            name: Some("web".to_string()),
            dir: Some(temp.path().to_string_lossy().into_owned()),
            ..Default::default()
        };

        let request = input.into_request(&Settings::default()).unwrap();
        assert_eq!(request.dir, temp.path());
        assert_eq!(request.dockerfile, "Dockerfile");
        assert_eq!(request.target, "development");
        assert!(request.template.is_none());
    }

    #[test]
    fn test_dev_input_rejects_dockerfile_with_template() {
        let temp = tempdir().unwrap();
        let dir = temp.path().to_string_lossy().into_owned();

        let input = DevInput {
            name: Some("web".to_string()),
            dir: Some(dir.clone()),
            dockerfile: Some("Dockerfile.dev".to_string()),
            template: Some(DockerfileTemplate::NextJs),
            ..Default::default()
        };
        assert!(matches!(
            input.into_request(&Settings::default()),
            Err(EnvmeError::Usage(_))
        ));

        let input = DevInput {
            name: Some("web".to_string()),
            dir: Some(dir),
            dockerfile: Some("Dockerfile.dev".to_string()),
            template: Some(DockerfileTemplate::None),
            ..Default::default()
        };
        let request = input.into_request(&Settings::default()).unwrap();
        assert_eq!(request.dockerfile, "Dockerfile.dev");
    }

    #[test]
    fn test_dev_input_requires_existing_dir() {
        let temp = tempdir().unwrap();
        let input = DevInput {
            name: Some("web".to_string()),
            dir: Some(temp.path().join("nope").to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(matches!(
            input.into_request(&Settings::default()),
            Err(EnvmeError::Path(_))
        ));
    }

    #[test]
    fn test_expose_input() {
        let input = ExposeInput {
            name: Some("api".to_string()),
            port: Some("8080".to_string()),
            hostname: None,
        };
        assert_eq!(input.missing(), vec!["hostname"]);

        let request = ExposeRequest::new("api", "8080", "api.envme.bid").unwrap();
        assert_eq!(request.exposure.service_url(&request.name), "http://api:8080");
        assert!(ExposeRequest::new("api", "port", "api.envme.bid").is_err());
    }
}
