use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to access {}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("version {version} is not installed in {}", install_root.display())]
    NotInstalled {
        version: String,
        install_root: PathBuf,
    },

    #[error("installation of {version} has no executable at {}", binary.display())]
    ArtifactMissing { version: String, binary: PathBuf },

    #[error(
        "failed to remove active link {}; the active pointer may be in an indeterminate state",
        link.display()
    )]
    ActiveLinkRemove {
        link: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "failed to create active link {} -> {}; the previous link was already removed, recreate it manually",
        link.display(),
        target.display()
    )]
    ActiveLinkCreate {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "active link {} was already switched, but verification could not run: {detail}",
        link.display()
    )]
    VerificationCommand { link: PathBuf, detail: String },

    #[error(
        "active link {} was already switched, but the linked binary reports '{reported}' instead of '{expected}'",
        link.display()
    )]
    VerificationFailed {
        link: PathBuf,
        expected: String,
        reported: String,
    },

    #[error("refusing to remove active version {version} at {}", path.display())]
    ActiveVersionProtected { version: String, path: PathBuf },

    #[error(
        "failed to remove {} (already removed in this run: {})",
        path.display(),
        format_removed(removed)
    )]
    Removal {
        path: PathBuf,
        removed: Vec<String>,
        #[source]
        source: io::Error,
    },
}

impl LifecycleError {
    pub(crate) fn filesystem(path: &Path, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attaches the versions a batch already deleted. Errors that carry an
    /// `io::Error` become `Removal` once anything is gone.
    pub(crate) fn with_removed(self, removed: Vec<String>) -> Self {
        match self {
            Self::Removal { path, source, .. } => Self::Removal {
                path,
                removed,
                source,
            },
            Self::Filesystem { path, source } if !removed.is_empty() => Self::Removal {
                path,
                removed,
                source,
            },
            other => other,
        }
    }

    /// True when the active link or the install root was already mutated before
    /// the error surfaced.
    pub fn mutation_applied(&self) -> bool {
        matches!(
            self,
            Self::ActiveLinkCreate { .. }
                | Self::VerificationCommand { .. }
                | Self::VerificationFailed { .. }
                | Self::Removal { .. }
        )
    }
}

fn format_removed(removed: &[String]) -> String {
    if removed.is_empty() {
        return "none".to_string();
    }
    removed.join(", ")
}
