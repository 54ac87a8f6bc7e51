//! envme - Docker services and dev environments on a shared local network
//!
//! envme turns a name plus an image (or a local directory) into a
//! docker-compose project under `~/.envme`, brings it up through the
//! Docker Engine API, and keeps track of:
//!
//! - Services running pre-built images
//! - Development environments built from a local Dockerfile or template
//! - Ingress rules exposing services under public hostnames
//! - Interactive forms for anything not given on the command line

pub mod commands;
pub mod compose;
pub mod engine;
pub mod env;
pub mod error;
pub mod ingress;
pub mod state;
pub mod tui;

pub use error::{EnvmeError, Result};
