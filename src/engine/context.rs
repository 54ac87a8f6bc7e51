//! Build context archiving

use crate::error::{EnvmeError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::Path;
use walkdir::WalkDir;

/// Archive name given to a Dockerfile that lives outside the context
pub const EMBEDDED_DOCKERFILE: &str = ".envme.Dockerfile";

/// Directories never sent to the engine
const SKIPPED_DIRS: &[&str] = &[".git"];

/// A gzipped tar of a build context
#[derive(Debug)]
pub struct PackedContext {
    /// Archive bytes
    pub archive: Vec<u8>,
    /// Dockerfile path inside the archive
    pub dockerfile: String,
}

/// Pack a context directory, embedding the Dockerfile if it lives elsewhere
pub fn pack_context(context: &Path, dockerfile: &str) -> Result<PackedContext> {
    if !context.is_dir() {
        return Err(EnvmeError::Path(format!(
            "build context {} is not a directory",
            context.display()
        )));
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    let walker = WalkDir::new(context)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            let skipped = e
                .file_name()
                .to_str()
                .is_some_and(|name| SKIPPED_DIRS.contains(&name));
            !(e.file_type().is_dir() && skipped)
        });

    for entry in walker {
        let entry = entry.map_err(|e| EnvmeError::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(context)
            .map_err(|e| EnvmeError::Path(e.to_string()))?;

        if entry.file_type().is_dir() {
            builder.append_dir(rel, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), rel)?;
        }
    }

    let dockerfile = match Path::new(dockerfile) {
        path if path.is_absolute() => match path.strip_prefix(context) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => {
                let contents = std::fs::read(path).map_err(|e| EnvmeError::Read {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                let mut header = tar::Header::new_gnu();
                header.set_size(contents.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, EMBEDDED_DOCKERFILE, contents.as_slice())?;
                EMBEDDED_DOCKERFILE.to_string()
            }
        },
        _ => dockerfile.to_string(),
    };

    let encoder = builder.into_inner()?;
    let archive = encoder.finish()?;

    tracing::debug!(
        "Packed build context {} ({} bytes)",
        context.display(),
        archive.len()
    );

    Ok(PackedContext {
        archive,
        dockerfile,
    })
}
