use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use zigkeep_core::{NamingConvention, VersionRecord};

use crate::active::{resolve_active, ActivePointer};
use crate::error::{LifecycleError, LifecycleResult};
use crate::scan::directory_size;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStatus {
    Removed,
    AlreadyAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub version: String,
    pub path: PathBuf,
    pub freed_bytes: u64,
    pub status: RemovalStatus,
}

pub fn remove_installation(
    active_link: &Path,
    naming: &NamingConvention,
    record: &VersionRecord,
) -> LifecycleResult<RemovalOutcome> {
    let live = resolve_active(active_link, naming);
    ensure_not_active(record, &live)?;
    delete_installation(record)
}

/// Removes `records` in order. Every record is checked against the live active
/// link before anything is deleted; a failure midway reports what was already gone.
pub fn remove_installations<OnProgress>(
    active_link: &Path,
    naming: &NamingConvention,
    records: &[VersionRecord],
    mut on_progress: OnProgress,
) -> LifecycleResult<Vec<RemovalOutcome>>
where
    OnProgress: FnMut(usize, &RemovalOutcome),
{
    let live = resolve_active(active_link, naming);
    for record in records {
        ensure_not_active(record, &live)?;
    }

    let mut outcomes = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let outcome = delete_installation(record)
            .map_err(|err| err.with_removed(removed_versions(&outcomes)))?;
        on_progress(index, &outcome);
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Maps selected version strings to every record carrying them. Unknown versions
/// are returned separately, in request order.
pub fn records_for_versions(
    records: &[VersionRecord],
    versions: &[String],
) -> (Vec<VersionRecord>, Vec<String>) {
    let mut selected = Vec::new();
    let mut unknown = Vec::new();
    let mut seen = Vec::<&str>::new();
    for version in versions {
        if seen.contains(&version.as_str()) {
            continue;
        }
        seen.push(version);

        let matching = records
            .iter()
            .filter(|record| &record.version == version)
            .cloned()
            .collect::<Vec<_>>();
        if matching.is_empty() {
            unknown.push(version.clone());
        } else {
            selected.extend(matching);
        }
    }
    (selected, unknown)
}

fn ensure_not_active(record: &VersionRecord, live: &ActivePointer) -> LifecycleResult<()> {
    let live_match = live.version() == Some(record.version.as_str())
        || live.install_dir() == Some(record.install_path.as_path());
    if record.is_active || live_match {
        return Err(LifecycleError::ActiveVersionProtected {
            version: record.version.clone(),
            path: record.install_path.clone(),
        });
    }
    Ok(())
}

fn delete_installation(record: &VersionRecord) -> LifecycleResult<RemovalOutcome> {
    let path = &record.install_path;
    match fs::symlink_metadata(path) {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(RemovalOutcome {
                version: record.version.clone(),
                path: path.clone(),
                freed_bytes: 0,
                status: RemovalStatus::AlreadyAbsent,
            });
        }
        Err(source) => return Err(LifecycleError::filesystem(path, source)),
    }

    let freed_bytes = directory_size(path)?;
    fs::remove_dir_all(path).map_err(|source| LifecycleError::Removal {
        path: path.clone(),
        removed: Vec::new(),
        source,
    })?;
    info!(version = %record.version, path = %path.display(), freed_bytes, "removed installation");

    Ok(RemovalOutcome {
        version: record.version.clone(),
        path: path.clone(),
        freed_bytes,
        status: RemovalStatus::Removed,
    })
}

fn removed_versions(outcomes: &[RemovalOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter(|outcome| outcome.status == RemovalStatus::Removed)
        .map(|outcome| outcome.version.clone())
        .collect()
}
