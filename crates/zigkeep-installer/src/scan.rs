use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};
use zigkeep_core::{NamingConvention, VersionRecord};

use crate::active::{resolve_active, ActivePointer};
use crate::error::{LifecycleError, LifecycleResult};

/// Lists recognizable installations under `install_root`, newest first.
///
/// Unrecognized entries are skipped. A candidate whose metadata cannot be read is
/// skipped too, but any error while measuring sizes aborts the scan so disk
/// usage is never under-reported.
pub fn scan_installed_versions(
    install_root: &Path,
    active_link: &Path,
    naming: &NamingConvention,
) -> LifecycleResult<Vec<VersionRecord>> {
    scan_installed_versions_with_sizer(install_root, active_link, naming, directory_size)
}

pub(crate) fn scan_installed_versions_with_sizer<Sizer>(
    install_root: &Path,
    active_link: &Path,
    naming: &NamingConvention,
    mut size_of: Sizer,
) -> LifecycleResult<Vec<VersionRecord>>
where
    Sizer: FnMut(&Path) -> LifecycleResult<u64>,
{
    let entries = match fs::read_dir(install_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(root = %install_root.display(), "install root does not exist");
            return Ok(Vec::new());
        }
        Err(source) => return Err(LifecycleError::filesystem(install_root, source)),
    };

    let mut records = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LifecycleError::filesystem(install_root, source))?;
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !naming.matches_prefix(&name) {
            continue;
        }
        let Some(version) = naming.decode(&name) else {
            continue;
        };

        let installed_at = match entry.metadata().and_then(|metadata| metadata.modified()) {
            Ok(installed_at) => installed_at,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping installation without readable metadata");
                continue;
            }
        };
        let size_bytes = size_of(&path)?;

        records.push(VersionRecord {
            version,
            install_path: path,
            size_bytes,
            installed_at,
            is_active: false,
        });
    }

    records.sort_by(|a, b| b.installed_at.cmp(&a.installed_at));

    let active = resolve_active(active_link, naming);
    if let Some(index) = active_record_index(&records, &active) {
        records[index].is_active = true;
    }

    debug!(root = %install_root.display(), count = records.len(), "scanned installations");
    Ok(records)
}

/// Picks the single record the pointer names: an exact directory match wins,
/// otherwise the newest record carrying the active version string.
fn active_record_index(records: &[VersionRecord], active: &ActivePointer) -> Option<usize> {
    let version = active.version()?;
    if let Some(install_dir) = active.install_dir() {
        if let Some(index) = records
            .iter()
            .position(|record| record.install_path == install_dir)
        {
            return Some(index);
        }
    }
    records.iter().position(|record| record.version == version)
}

pub fn directory_size(path: &Path) -> LifecycleResult<u64> {
    let mut total = 0_u64;
    let entries = fs::read_dir(path).map_err(|source| LifecycleError::filesystem(path, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| LifecycleError::filesystem(path, source))?;
        let entry_path = entry.path();
        let metadata = fs::symlink_metadata(&entry_path)
            .map_err(|source| LifecycleError::filesystem(&entry_path, source))?;
        if metadata.is_dir() {
            total = total.saturating_add(directory_size(&entry_path)?);
        } else {
            total = total.saturating_add(metadata.len());
        }
    }
    Ok(total)
}

pub fn find_installed<'a>(
    records: &'a [VersionRecord],
    version: &str,
    install_root: &Path,
) -> LifecycleResult<&'a VersionRecord> {
    records
        .iter()
        .find(|record| record.version == version)
        .ok_or_else(|| LifecycleError::NotInstalled {
            version: version.to_string(),
            install_root: install_root.to_path_buf(),
        })
}
