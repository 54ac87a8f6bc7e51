//! Service, development and expose forms
//!
//! Each form is prefilled from whatever the command line already supplied
//! and previews the file the command will write.

use super::form::{Field, Form};
use crate::commands::{DevInput, DevRequest, ExposeInput, ExposeRequest, ServiceInput, ServiceRequest};
use crate::compose::{build_dev_document, build_service_document, ComposeDocument, DockerfileTemplate};
use crate::env::EnvAssignments;
use crate::error::{EnvmeError, Result};
use crate::ingress::{Exposure, IngressConfig};
use crate::state::layout::{COMPOSE_FILE_NAME, DOCKERFILE_NAME};
use crate::state::{resolve_absolute_path, Settings, StateDir};

const NAME: &str = "container_name";
const IMAGE: &str = "image";
const DIR: &str = "dir";
const ENV: &str = "env";
const EXPOSE: &str = "expose";
const TEMPLATE: &str = "template";
const PORT: &str = "port";
const HOSTNAME: &str = "hostname";
const DONE: &str = "done";

/// Collect a service request interactively
pub fn prompt_service(input: &ServiceInput, settings: &Settings) -> Result<ServiceRequest> {
    let env = input.options.environment()?;
    let network = settings.network.as_str();
    let form = service_form(input, &env).run(|form| service_preview(form, network))?;
    service_request(&form)
}

/// Collect a dev environment request interactively
pub fn prompt_development(
    input: &DevInput,
    settings: &Settings,
    state: &StateDir,
) -> Result<DevRequest> {
    let env = input.options.environment()?;
    let form = dev_form(input, &env).run(|form| dev_preview(form, input, settings, state))?;
    dev_request(&form, input, settings)
}

/// Collect an expose request interactively
pub fn prompt_expose(
    input: &ExposeInput,
    settings: &Settings,
    state: &StateDir,
) -> Result<ExposeRequest> {
    let services = state.services()?;
    if services.is_empty() {
        return Err(EnvmeError::usage(
            "No services to expose yet; create one with `envme create service`",
        ));
    }

    let ingress = IngressConfig::load(settings, state)?;
    let form = expose_form(input, &services).run(|form| expose_preview(form, &ingress))?;
    expose_request(&form)
}

fn prefill(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn env_field(env: &EnvAssignments) -> Field {
    Field::text(ENV, "Environment")
        .placeholder("PORT=8080")
        .value(env.to_strings().join("\n"))
}

fn expose_field(expose: &[String]) -> Field {
    Field::text(EXPOSE, "Expose")
        .placeholder("8080:api.envme.bid")
        .value(expose.join("\n"))
}

fn done_field() -> Field {
    Field::confirm(DONE, "All done?")
}

fn preview_title(name: &str, file: &str) -> String {
    if name.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", name, file)
    }
}

fn render_document(document: Result<ComposeDocument>) -> String {
    let yaml = document.and_then(|doc| Ok(serde_yaml::to_string(&doc)?));
    match yaml {
        Ok(yaml) => yaml,
        Err(EnvmeError::Usage(message)) => message,
        Err(e) => e.to_string(),
    }
}

fn service_form(input: &ServiceInput, env: &EnvAssignments) -> Form {
    Form::new(
        "Create Service",
        vec![
            Field::input(NAME, "Service name")
                .placeholder("api")
                .value(prefill(&input.name))
                .required("Service name is required"),
            Field::input(IMAGE, "Image name")
                .placeholder("backend:latest")
                .value(prefill(&input.image))
                .required("Image name is required"),
            env_field(env),
            expose_field(&input.options.expose),
            done_field(),
        ],
    )
}

fn service_preview(form: &Form, network: &str) -> (String, String) {
    let name = form.get(NAME).trim();
    let env = EnvAssignments::from_text(form.get(ENV));
    let document = build_service_document(name, form.get(IMAGE).trim(), network, &env);
    (
        preview_title(name, COMPOSE_FILE_NAME),
        render_document(document),
    )
}

fn service_request(form: &Form) -> Result<ServiceRequest> {
    ServiceRequest::new(
        form.get(NAME).trim(),
        form.get(IMAGE),
        EnvAssignments::from_text(form.get(ENV)),
        Exposure::parse_lines(form.get(EXPOSE))?,
    )
}

fn dev_form(input: &DevInput, env: &EnvAssignments) -> Form {
    let template = input.template.unwrap_or_default();
    Form::new(
        "Create Development Environment",
        vec![
            Field::input(NAME, "Dev name")
                .placeholder("api")
                .value(prefill(&input.name))
                .required("Dev name is required"),
            Field::input(DIR, "Directory (Dockerfile)")
                .placeholder("/path/to/api")
                .value(prefill(&input.dir))
                .required("Directory is required"),
            env_field(env),
            expose_field(&input.options.expose),
            Field::select(
                TEMPLATE,
                "Template (Dockerfile)",
                DockerfileTemplate::ALL.iter().map(|t| t.label()),
            )
            .description("Select (none) if you already have a Dockerfile")
            .value(template.label()),
            done_field(),
        ],
    )
}

fn selected_template(form: &Form) -> DockerfileTemplate {
    DockerfileTemplate::from_label(form.get(TEMPLATE)).unwrap_or_default()
}

fn dev_preview(
    form: &Form,
    input: &DevInput,
    settings: &Settings,
    state: &StateDir,
) -> (String, String) {
    let name = form.get(NAME).trim();
    let dir = resolve_absolute_path(form.get(DIR).trim())
        .unwrap_or_else(|_| form.get(DIR).trim().into());
    let dockerfile = if selected_template(form).is_none() {
        input
            .dockerfile
            .clone()
            .unwrap_or_else(|| settings.dockerfile.clone())
    } else {
        state
            .service_dir(name)
            .join(DOCKERFILE_NAME)
            .to_string_lossy()
            .into_owned()
    };
    let target = input.target.as_deref().unwrap_or(&settings.target);
    let env = EnvAssignments::from_text(form.get(ENV));

    let document = build_dev_document(name, &dir, &dockerfile, target, &settings.network, &env);
    (
        preview_title(name, COMPOSE_FILE_NAME),
        render_document(document),
    )
}

fn dev_request(form: &Form, input: &DevInput, settings: &Settings) -> Result<DevRequest> {
    let template = selected_template(form);
    input.check_template(template)?;

    DevRequest::new(
        form.get(NAME).trim(),
        form.get(DIR),
        input.dockerfile.as_deref().unwrap_or(&settings.dockerfile),
        input.target.as_deref().unwrap_or(&settings.target),
        template,
        EnvAssignments::from_text(form.get(ENV)),
        Exposure::parse_lines(form.get(EXPOSE))?,
    )
}

fn expose_form(input: &ExposeInput, services: &[String]) -> Form {
    Form::new(
        "Expose Service",
        vec![
            Field::select(NAME, "Service name", services.iter().cloned())
                .value(prefill(&input.name)),
            Field::input(PORT, "Port to expose")
                .placeholder("8080")
                .value(prefill(&input.port))
                .required("Port is required"),
            Field::input(HOSTNAME, "Access from")
                .placeholder("api-local.envme.bid")
                .value(prefill(&input.hostname))
                .required("Hostname is required"),
            done_field(),
        ],
    )
}

fn expose_preview(form: &Form, ingress: &IngressConfig) -> (String, String) {
    let title = "ingress.yaml".to_string();
    let mut ingress = ingress.clone();
    let body = Exposure::new(form.get(PORT), form.get(HOSTNAME))
        .and_then(|exposure| {
            ingress.upsert(form.get(NAME), &exposure);
            Ok(serde_yaml::to_string(&ingress)?)
        });
    match body {
        Ok(yaml) => (title, yaml),
        Err(EnvmeError::Usage(message)) => (title, message),
        Err(e) => (title, e.to_string()),
    }
}

fn expose_request(form: &Form) -> Result<ExposeRequest> {
    ExposeRequest::new(form.get(NAME), form.get(PORT), form.get(HOSTNAME))
}
