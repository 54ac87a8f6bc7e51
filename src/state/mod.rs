//! Application state on disk
//!
//! Everything envme persists lives under a per-user hidden directory
//! (`~/.envme` by default): one subdirectory per service holding its
//! `docker-compose.yaml`, plus the settings and ingress files.

pub mod layout;
pub mod paths;
pub mod settings;

pub use layout::StateDir;
pub use paths::resolve_absolute_path;
pub use settings::Settings;
