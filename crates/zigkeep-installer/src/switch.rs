use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zigkeep_core::{NamingConvention, VersionRecord};

use crate::active::resolve_active;
use crate::error::{LifecycleError, LifecycleResult};
use crate::fs_utils::create_symlink;
use crate::process::query_reported_version;
use crate::InstallLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchStatus {
    Switched,
    /// The link already named this version and was recreated.
    Relinked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOutcome {
    pub version: String,
    pub link: PathBuf,
    pub binary: PathBuf,
    pub previous_version: Option<String>,
    pub reported_version: String,
    pub status: SwitchStatus,
}

pub fn switch_active_version(
    layout: &InstallLayout,
    naming: &NamingConvention,
    record: &VersionRecord,
    version_arg: &str,
) -> LifecycleResult<SwitchOutcome> {
    switch_active_version_with_probe(layout, naming, record, |link| {
        query_reported_version(link, version_arg)
    })
}

/// Replaces the active link with one pointing at `record`'s binary, then asks the
/// linked binary for its version.
///
/// The remove/create pair is not atomic. Errors after the old link is gone say so
/// and carry both paths.
pub fn switch_active_version_with_probe<Probe>(
    layout: &InstallLayout,
    naming: &NamingConvention,
    record: &VersionRecord,
    probe: Probe,
) -> LifecycleResult<SwitchOutcome>
where
    Probe: FnOnce(&Path) -> Result<String, String>,
{
    let binary = locate_binary(layout, record)?;
    let link = layout.active_link_path();
    let previous_version = resolve_active(&link, naming)
        .version()
        .map(str::to_string);

    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent).map_err(|source| LifecycleError::filesystem(parent, source))?;
    }

    match fs::symlink_metadata(&link) {
        Ok(_) => {
            fs::remove_file(&link).map_err(|source| LifecycleError::ActiveLinkRemove {
                link: link.clone(),
                source,
            })?;
            debug!(link = %link.display(), "removed previous active link");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(LifecycleError::ActiveLinkRemove {
                link: link.clone(),
                source,
            })
        }
    }

    create_symlink(&binary, &link).map_err(|source| LifecycleError::ActiveLinkCreate {
        link: link.clone(),
        target: binary.clone(),
        source,
    })?;
    info!(
        version = %record.version,
        link = %link.display(),
        target = %binary.display(),
        "updated active link"
    );

    let reported_version = probe(&link).map_err(|detail| LifecycleError::VerificationCommand {
        link: link.clone(),
        detail,
    })?;
    if !reported_version.contains(&record.version) {
        return Err(LifecycleError::VerificationFailed {
            link,
            expected: record.version.clone(),
            reported: reported_version,
        });
    }

    let status = if previous_version.as_deref() == Some(record.version.as_str()) {
        SwitchStatus::Relinked
    } else {
        SwitchStatus::Switched
    };
    Ok(SwitchOutcome {
        version: record.version.clone(),
        link,
        binary,
        previous_version,
        reported_version,
        status,
    })
}

fn locate_binary(layout: &InstallLayout, record: &VersionRecord) -> LifecycleResult<PathBuf> {
    let binary = layout.installation_binary(&record.install_path);
    let is_file = fs::metadata(&binary)
        .map(|metadata| metadata.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(LifecycleError::ArtifactMissing {
            version: record.version.clone(),
            binary,
        });
    }
    std::path::absolute(&binary).map_err(|source| LifecycleError::filesystem(&binary, source))
}
