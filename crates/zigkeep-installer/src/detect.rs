use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zigkeep_core::HostPlatform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionEvidence {
    Directory,
    Symlink { link: PathBuf, target: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInstallation {
    pub path: PathBuf,
    pub evidence: DetectionEvidence,
}

/// Looks for a system-wide installation left behind by a manual or packaged setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInstallDetector {
    legacy_dirs: Vec<PathBuf>,
    legacy_links: Vec<PathBuf>,
    legacy_prefixes: Vec<PathBuf>,
}

impl SystemInstallDetector {
    pub fn new(
        legacy_dirs: Vec<PathBuf>,
        legacy_links: Vec<PathBuf>,
        legacy_prefixes: Vec<PathBuf>,
    ) -> Self {
        Self {
            legacy_dirs,
            legacy_links,
            legacy_prefixes,
        }
    }

    pub fn for_host(platform: &HostPlatform) -> Self {
        let legacy_dirs = match platform.os.as_str() {
            "macos" => vec!["/usr/local/zig", "/opt/zig"],
            "windows" => Vec::new(),
            _ => vec!["/opt/zig", "/usr/local/zig"],
        };
        let (legacy_links, legacy_prefixes) = if platform.is_windows() {
            (Vec::new(), Vec::new())
        } else {
            (
                vec!["/usr/local/bin/zig", "/usr/local/bin/zls"],
                vec!["/opt/", "/usr/local/"],
            )
        };

        Self::new(
            legacy_dirs.into_iter().map(PathBuf::from).collect(),
            legacy_links.into_iter().map(PathBuf::from).collect(),
            legacy_prefixes.into_iter().map(PathBuf::from).collect(),
        )
    }

    pub fn legacy_links(&self) -> &[PathBuf] {
        &self.legacy_links
    }

    /// Non-empty legacy directories are checked first, then legacy links whose
    /// target sits under a legacy prefix. The target does not have to exist.
    pub fn detect(&self) -> Option<SystemInstallation> {
        for dir in &self.legacy_dirs {
            if is_non_empty_dir(dir) {
                debug!(path = %dir.display(), "found legacy installation directory");
                return Some(SystemInstallation {
                    path: dir.clone(),
                    evidence: DetectionEvidence::Directory,
                });
            }
        }

        for link in &self.legacy_links {
            let Ok(raw_target) = fs::read_link(link) else {
                continue;
            };
            let target = if raw_target.is_absolute() {
                normalize_lexically(&raw_target)
            } else {
                let joined = link
                    .parent()
                    .map(|dir| dir.join(&raw_target))
                    .unwrap_or(raw_target);
                normalize_lexically(&joined)
            };
            if !self.is_legacy_target(&target) {
                continue;
            }

            let path = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| target.clone());
            debug!(
                link = %link.display(),
                target = %target.display(),
                "found legacy link into a system prefix"
            );
            return Some(SystemInstallation {
                path,
                evidence: DetectionEvidence::Symlink {
                    link: link.clone(),
                    target,
                },
            });
        }

        None
    }

    fn is_legacy_target(&self, target: &Path) -> bool {
        self.legacy_prefixes
            .iter()
            .any(|prefix| target.starts_with(prefix))
    }
}

fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
