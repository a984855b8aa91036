use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zigkeep_core::NamingConvention;

/// What the active link currently says. Only `Linked` names an active version;
/// every other state means "no active version known" without failing the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivePointer {
    Missing,
    Linked {
        target: PathBuf,
        version: String,
    },
    Dangling {
        target: PathBuf,
        version: Option<String>,
    },
    Unrecognized {
        target: PathBuf,
    },
    Unreadable {
        detail: String,
    },
}

impl ActivePointer {
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Linked { version, .. } => Some(version),
            _ => None,
        }
    }

    /// Installation directory the link points into, when it has one.
    pub fn install_dir(&self) -> Option<&Path> {
        match self {
            Self::Linked { target, .. } => target.parent(),
            _ => None,
        }
    }
}

pub fn resolve_active(link_path: &Path, naming: &NamingConvention) -> ActivePointer {
    match fs::symlink_metadata(link_path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {}
        Ok(_) => {
            warn!(link = %link_path.display(), "active link path is not a symbolic link");
            return ActivePointer::Unreadable {
                detail: format!("{} is not a symbolic link", link_path.display()),
            };
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(link = %link_path.display(), "no active link");
            return ActivePointer::Missing;
        }
        Err(err) => return unreadable(link_path, &err),
    }

    let raw_target = match fs::read_link(link_path) {
        Ok(target) => target,
        Err(err) => return unreadable(link_path, &err),
    };
    let target = if raw_target.is_absolute() {
        raw_target
    } else {
        link_path
            .parent()
            .map(|dir| dir.join(&raw_target))
            .unwrap_or(raw_target)
    };

    let version = target.parent().and_then(|dir| naming.decode_path(dir));
    match fs::metadata(&target) {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(target = %target.display(), "active link is dangling");
            return ActivePointer::Dangling { target, version };
        }
        Err(err) => return unreadable(link_path, &err),
    }

    match version {
        Some(version) => ActivePointer::Linked { target, version },
        None => {
            debug!(target = %target.display(), "active link target is not a version directory");
            ActivePointer::Unrecognized { target }
        }
    }
}

fn unreadable(link_path: &Path, err: &io::Error) -> ActivePointer {
    warn!(link = %link_path.display(), error = %err, "failed to read active link");
    ActivePointer::Unreadable {
        detail: format!("failed to read {}: {err}", link_path.display()),
    }
}
