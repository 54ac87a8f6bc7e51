//! Environment assignments and `.env` file reading

use crate::error::{EnvmeError, Result};
use std::fmt;
use std::path::Path;

/// A single `KEY=VALUE` (or pass-through `KEY`) assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: String,
    pub value: Option<String>,
}

impl Assignment {
    /// Parse `KEY=VALUE` or a bare `KEY`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some(Self {
                    key: key.to_string(),
                    value: Some(value.to_string()),
                })
            }
            None => Some(Self {
                key: raw.to_string(),
                value: None,
            }),
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => write!(f, "{}", self.key),
        }
    }
}

/// Ordered environment assignments keyed by variable name.
///
/// Setting a key that is already present replaces its value in place, so the
/// first position is kept and the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvAssignments {
    entries: Vec<Assignment>,
}

impl EnvAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `KEY=VALUE` strings, skipping blank or keyless ones
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut env = Self::new();
        for item in raw {
            if let Some(assignment) = Assignment::parse(item.as_ref()) {
                env.push(assignment);
            }
        }
        env
    }

    /// Parse multi-line text, one assignment per non-empty line
    pub fn from_text(text: &str) -> Self {
        Self::from_raw(text.lines())
    }

    /// Add or replace an assignment
    pub fn push(&mut self, assignment: Assignment) {
        match self.entries.iter_mut().find(|e| e.key == assignment.key) {
            Some(existing) => existing.value = assignment.value,
            None => self.entries.push(assignment),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.push(Assignment {
            key: key.to_string(),
            value: Some(value.to_string()),
        });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .and_then(|e| e.value.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.entries.iter()
    }

    /// Render as `KEY=VALUE` strings in order
    pub fn to_strings(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.to_string()).collect()
    }
}

/// Read a `.env`-style file into assignments, in file order.
///
/// An empty path is a no-op and yields `None`.
///
/// Values follow `.env` conventions: `$VAR` and `${VAR}` in unquoted or
/// double-quoted values expand from the process environment, then from
/// earlier keys of the file. Single-quoted values are taken literally.
pub fn read_env_file(path: &str) -> Result<Option<EnvAssignments>> {
    if path.is_empty() {
        return Ok(None);
    }

    let read_err = |message: String| EnvmeError::Read {
        path: Path::new(path).to_path_buf(),
        message,
    };

    let iter = dotenvy::from_path_iter(path).map_err(|e| read_err(e.to_string()))?;

    let mut env = EnvAssignments::new();
    for item in iter {
        let (key, value) = item.map_err(|e| read_err(e.to_string()))?;
        env.set(&key, &value);
    }

    tracing::debug!("Read {} variables from {}", env.len(), path);
    Ok(Some(env))
}
