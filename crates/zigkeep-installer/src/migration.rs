use std::io;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::detect::{SystemInstallDetector, SystemInstallation};
use crate::fs_utils::path_exists_no_follow;
use crate::process::run_command;

/// Everything a migration deletes, in deletion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub installation: SystemInstallation,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub removed: Vec<PathBuf>,
    pub remaining: Vec<PathBuf>,
    pub runner_error: Option<String>,
}

impl MigrationOutcome {
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }
}

pub fn default_companion_dirs() -> Vec<PathBuf> {
    if cfg!(windows) {
        return Vec::new();
    }
    vec![PathBuf::from("/opt/zls"), PathBuf::from("/usr/local/zls")]
}

pub fn plan_migration(
    installation: &SystemInstallation,
    detector: &SystemInstallDetector,
    companion_dirs: &[PathBuf],
) -> MigrationPlan {
    let mut paths = vec![installation.path.clone()];
    let extra = companion_dirs
        .iter()
        .filter(|dir| dir.is_dir())
        .chain(
            detector
                .legacy_links()
                .iter()
                .filter(|link| path_exists_no_follow(link)),
        );
    for path in extra {
        if !paths.contains(path) {
            paths.push(path.clone());
        }
    }

    MigrationPlan {
        installation: installation.clone(),
        paths,
    }
}

pub fn build_privileged_removal_command(paths: &[PathBuf]) -> Command {
    let mut command = Command::new("sudo");
    command.arg("rm").arg("-rf").args(paths);
    command
}

pub fn manual_removal_command(paths: &[PathBuf]) -> String {
    let mut rendered = String::from("sudo rm -rf");
    for path in paths {
        rendered.push(' ');
        rendered.push_str(&path.display().to_string());
    }
    rendered
}

pub fn execute_migration(plan: &MigrationPlan) -> MigrationOutcome {
    execute_migration_with_runner(plan, run_command)
}

/// Runs one privileged removal over every planned path, then checks which paths
/// are still present. A failing runner is recorded, not returned, so the caller
/// always learns what is left behind.
pub fn execute_migration_with_runner<RunCommand>(
    plan: &MigrationPlan,
    mut run: RunCommand,
) -> MigrationOutcome
where
    RunCommand: FnMut(&mut Command, &str) -> Result<()>,
{
    if plan.paths.is_empty() {
        return MigrationOutcome::default();
    }

    let mut command = build_privileged_removal_command(&plan.paths);
    let runner_error = run(&mut command, "failed to remove system installation")
        .map_err(|err| {
            if error_chain_has_not_found(&err) {
                return anyhow!("required tool 'sudo' was not found on PATH: {err}");
            }
            err
        })
        .err()
        .map(|err| format!("{err:#}"));
    if let Some(detail) = &runner_error {
        warn!(detail = %detail, "privileged removal reported an error");
    }

    let (remaining, removed): (Vec<PathBuf>, Vec<PathBuf>) = plan
        .paths
        .iter()
        .cloned()
        .partition(|path| path_exists_no_follow(path));
    info!(
        removed = removed.len(),
        remaining = remaining.len(),
        "system installation migration finished"
    );

    MigrationOutcome {
        removed,
        remaining,
        runner_error,
    }
}

pub fn describe_remaining(outcome: &MigrationOutcome) -> Option<String> {
    if outcome.is_complete() {
        return None;
    }
    let listed = outcome
        .remaining
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "some paths could not be removed: {listed}; remove them manually with: {}",
        manual_removal_command(&outcome.remaining)
    ))
}

fn error_chain_has_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
    })
}
