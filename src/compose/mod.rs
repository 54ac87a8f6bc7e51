//! Docker Compose document generation and orchestration
//!
//! A document is built fresh from a request on every `create`, written to the
//! service's state directory, then loaded back and brought up against the
//! Engine.

pub mod builder;
pub mod config;
pub mod orchestrator;
pub mod parser;
pub mod template;
pub mod writer;

pub use builder::{build_dev_document, build_service_document};
pub use config::{BuildSpec, ComposeDocument, NetworkSpec, ServiceSource, ServiceSpec, VolumeSpec};
pub use orchestrator::ComposeOrchestrator;
pub use parser::ComposeParser;
pub use template::DockerfileTemplate;
pub use writer::ComposeWriter;
