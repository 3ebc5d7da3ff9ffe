//! Worker target resolution.
//!
//! Normalization is lexical: redundant separators and `.` segments collapse,
//! `..` pops a previously pushed segment and is dropped once it would climb
//! above the root. Symlinks inside the root are not resolved, so this is not a
//! sandbox boundary.

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Join `target` (plus optional `extension`) onto `root`, normalizing the target part.
pub fn resolve_target(root: &Path, target: &str, extension: Option<&str>) -> PathBuf {
    let target = match extension {
        Some(ext) if !ext.is_empty() => format!("{target}.{}", ext.trim_start_matches('.')),
        _ => target.to_string(),
    };

    let mut segments: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(&target).components() {
        match component {
            Component::Normal(segment) => segments.push(segment),
            Component::ParentDir => {
                segments.pop();
            }
            // absolute targets stay under the root
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    segments
        .into_iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// True if `path` is an existing regular file, and executable when `require_executable`.
pub fn check_target(path: &Path, require_executable: bool) -> bool {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => !require_executable || is_executable(&metadata),
        _ => false,
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    true
}
