//! Resolution of user-supplied directories

use crate::error::{EnvmeError, Result};
use std::path::{Path, PathBuf};

/// Resolve a directory argument against the current directory and home.
///
/// Rules apply in order: `..`-prefixed input is joined onto the current
/// directory, a leading `.` is replaced by the current directory, a leading
/// `~` is replaced by the home directory, anything else is returned as is.
pub fn resolve_absolute_path(input: &str) -> Result<PathBuf> {
    let needs_cwd = input.starts_with('.');
    let needs_home = input.starts_with('~');

    let cwd = if needs_cwd {
        Some(std::env::current_dir().map_err(|e| {
            EnvmeError::Path(format!("could not determine current directory: {}", e))
        })?)
    } else {
        None
    };
    let home = if needs_home {
        Some(::dirs::home_dir().ok_or_else(|| {
            EnvmeError::Path("could not determine home directory".to_string())
        })?)
    } else {
        None
    };

    Ok(resolve_with(input, cwd.as_deref(), home.as_deref()))
}

/// Same rules with explicit current and home directories
pub fn resolve_with(input: &str, cwd: Option<&Path>, home: Option<&Path>) -> PathBuf {
    // `..` also starts with `.`, so it has to be matched first
    if input.starts_with("..") {
        if let Some(cwd) = cwd {
            return cwd.join(input);
        }
    } else if let Some(rest) = input.strip_prefix('.') {
        if let Some(cwd) = cwd {
            return match rest.strip_prefix('/') {
                Some(rest) => cwd.join(rest),
                None if rest.is_empty() => cwd.to_path_buf(),
                // hidden names like `.config` are relative to the current directory
                None => cwd.join(input),
            };
        }
    } else if let Some(rest) = input.strip_prefix('~') {
        if let Some(home) = home {
            let rest = rest.trim_start_matches('/');
            return if rest.is_empty() {
                home.to_path_buf()
            } else {
                home.join(rest)
            };
        }
    }

    PathBuf::from(input)
}
