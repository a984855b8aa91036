mod active;
mod detect;
mod error;
mod fs_utils;
mod layout;
mod migration;
mod process;
mod removal;
mod retention;
mod scan;
mod switch;

pub use active::{resolve_active, ActivePointer};
pub use detect::{DetectionEvidence, SystemInstallDetector, SystemInstallation};
pub use error::{LifecycleError, LifecycleResult};
pub use fs_utils::path_exists_no_follow;
pub use layout::{default_user_layout, InstallLayout};
pub use migration::{
    build_privileged_removal_command, default_companion_dirs, describe_remaining,
    execute_migration, execute_migration_with_runner, manual_removal_command, plan_migration,
    MigrationOutcome, MigrationPlan,
};
pub use process::query_reported_version;
pub use removal::{
    records_for_versions, remove_installation, remove_installations, RemovalOutcome,
    RemovalStatus,
};
pub use retention::{plan_removals, RetentionPlan};
pub use scan::{directory_size, find_installed, scan_installed_versions};
pub use switch::{
    switch_active_version, switch_active_version_with_probe, SwitchOutcome, SwitchStatus,
};
