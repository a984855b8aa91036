use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::debug;
use zigkeep_core::{
    format_bytes, total_size_bytes, HostPlatform, NamingConvention, VersionRecord,
};
use zigkeep_installer::{
    default_companion_dirs, describe_remaining, execute_migration, find_installed, plan_migration,
    records_for_versions, remove_installations, resolve_active, scan_installed_versions,
    switch_active_version, InstallLayout, RemovalStatus, RetentionPlan, SwitchStatus,
    LifecycleError, SystemInstallDetector,
};

use crate::completion::write_completions_script;
use crate::config::{
    config_file_path, load_config, render_config_template, write_config_template, ConfigLayer,
    ManagerConfig,
};
use crate::prompt::{confirm, select_many, select_one};
use crate::render::{
    current_output_style, describe_active_pointer, describe_system_installation,
    format_retention_plan, format_version_choices, format_version_table, render_status_line,
    version_entries, Status, TerminalRenderer,
};
use crate::telemetry;
use crate::{Cli, Commands, ConfigCommands};

struct CommandContext {
    config: ManagerConfig,
    config_path: Option<PathBuf>,
    layout: InstallLayout,
    naming: NamingConvention,
    renderer: TerminalRenderer,
}

impl CommandContext {
    fn new(config: ManagerConfig, config_path: Option<PathBuf>) -> Self {
        let renderer = TerminalRenderer::from_style(current_output_style(config.no_color));
        Self {
            layout: config.layout(),
            naming: config.naming(),
            config,
            config_path,
            renderer,
        }
    }

    fn scan(&self) -> Result<Vec<VersionRecord>> {
        let records = scan_installed_versions(
            self.layout.install_root(),
            &self.layout.active_link_path(),
            &self.naming,
        )?;
        Ok(records)
    }

    fn warn_on_system_installation(&self) {
        let detector = SystemInstallDetector::for_host(&HostPlatform::current());
        if let Some(installation) = detector.detect() {
            eprintln!(
                "{}",
                render_status_line(
                    self.renderer.style(),
                    Status::Warn,
                    &format!(
                        "{}; run `zigkeep migrate` to remove it",
                        describe_system_installation(&installation)
                    ),
                )
            );
        }
    }
}

/// Extra line for errors raised after the active link or install root changed.
pub(crate) fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    let applied = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<LifecycleError>())
        .any(LifecycleError::mutation_applied);
    applied.then_some(
        "some changes were already applied; run `zigkeep current` and `zigkeep list` to inspect them",
    )
}

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Completions { shell } => {
            return write_completions_script(*shell, &mut io::stdout().lock());
        }
        Commands::Version => {
            println!("zigkeep {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let flags = ConfigLayer {
        install_root: cli.install_root.clone(),
        bin_dir: cli.bin_dir.clone(),
        no_color: cli.no_color.then_some(true),
        log_file: cli.log_file.clone(),
        ..ConfigLayer::default()
    };
    let config = load_config(cli.config.as_deref(), flags)?;
    telemetry::init(cli.verbose, config.log_file.as_deref())?;
    debug!(
        install_root = %config.install_root.display(),
        bin_dir = %config.bin_dir.display(),
        "resolved configuration"
    );
    let ctx = CommandContext::new(config, cli.config.clone());

    match cli.command {
        Commands::List { json } => run_list(&ctx, json),
        Commands::Current => run_current(&ctx),
        Commands::Switch { version } => run_switch(&ctx, version.as_deref()),
        Commands::Cleanup {
            keep_last,
            dry_run,
            yes,
        } => run_cleanup(&ctx, keep_last, dry_run, yes),
        Commands::Detect => run_detect(&ctx),
        Commands::Migrate { dry_run, yes } => run_migrate(&ctx, dry_run, yes),
        Commands::Config { command } => match command {
            ConfigCommands::Init { force } => run_config_init(&ctx, force),
            ConfigCommands::Show => run_config_show(&ctx),
        },
        Commands::Completions { .. } | Commands::Version => Ok(()),
    }
}

fn run_list(ctx: &CommandContext, json: bool) -> Result<()> {
    let records = ctx.scan()?;
    if json {
        let rendered = serde_json::to_string_pretty(&version_entries(&records))
            .context("failed serializing version list")?;
        println!("{rendered}");
        return Ok(());
    }

    ctx.warn_on_system_installation();
    ctx.renderer.print_lines(&format_version_table(&records));
    Ok(())
}

fn run_current(ctx: &CommandContext) -> Result<()> {
    let pointer = resolve_active(&ctx.layout.active_link_path(), &ctx.naming);
    println!("{}", describe_active_pointer(&pointer));
    Ok(())
}

fn run_switch(ctx: &CommandContext, version: Option<&str>) -> Result<()> {
    ctx.warn_on_system_installation();
    let records = ctx.scan()?;
    if records.is_empty() {
        return Err(anyhow!(
            "no versions installed in {}",
            ctx.layout.install_root().display()
        ));
    }

    let record = match version {
        Some(version) => find_installed(&records, version, ctx.layout.install_root())?,
        None => {
            let choices = format_version_choices(&records);
            let selected = select_one(
                &mut io::stdin().lock(),
                &mut io::stdout(),
                "Installed versions:",
                &choices,
            )?;
            match selected {
                Some(index) => &records[index],
                None => {
                    ctx.renderer.print_status(Status::Warn, "no version selected");
                    return Ok(());
                }
            }
        }
    };

    ctx.layout.ensure_base_dirs()?;
    let outcome = switch_active_version(
        &ctx.layout,
        &ctx.naming,
        record,
        &ctx.config.version_arg,
    )?;
    let message = match (outcome.status, outcome.previous_version.as_deref()) {
        (SwitchStatus::Relinked, _) => format!(
            "relinked {} ({} reports {})",
            outcome.version,
            outcome.link.display(),
            outcome.reported_version
        ),
        (SwitchStatus::Switched, Some(previous)) => {
            format!("switched from {previous} to {}", outcome.version)
        }
        (SwitchStatus::Switched, None) => format!("switched to {}", outcome.version),
    };
    ctx.renderer.print_status(Status::Ok, &message);
    Ok(())
}

fn run_cleanup(
    ctx: &CommandContext,
    keep_last: Option<usize>,
    dry_run: bool,
    yes: bool,
) -> Result<()> {
    ctx.warn_on_system_installation();
    let records = ctx.scan()?;
    if records.is_empty() {
        println!("No versions installed");
        return Ok(());
    }

    let keep_last = keep_last.unwrap_or(ctx.config.keep_last);
    let to_remove = if keep_last > 0 {
        let plan = RetentionPlan::compute(&records, keep_last);
        ctx.renderer.print_section("retention");
        ctx.renderer
            .print_lines(&format_retention_plan(&plan, keep_last));
        if plan.is_noop() {
            ctx.renderer.print_status(Status::Info, "nothing to remove");
            return Ok(());
        }
        plan.remove
    } else {
        let active_versions = records
            .iter()
            .filter(|record| record.is_active)
            .map(|record| record.version.as_str())
            .collect::<Vec<_>>();
        let candidates = records
            .iter()
            .filter(|record| !active_versions.contains(&record.version.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            ctx.renderer
                .print_status(Status::Info, "only the active version is installed");
            return Ok(());
        }
        let selected = select_many(
            &mut io::stdin().lock(),
            &mut io::stdout(),
            "Versions that can be removed:",
            &format_version_choices(&candidates),
        )?;
        let versions = selected
            .into_iter()
            .map(|index| candidates[index].version.clone())
            .collect::<Vec<_>>();
        records_for_versions(&candidates, &versions).0
    };

    if to_remove.is_empty() {
        ctx.renderer.print_status(Status::Info, "nothing to remove");
        return Ok(());
    }

    let versions = to_remove
        .iter()
        .map(|record| record.version.as_str())
        .collect::<Vec<_>>();
    println!(
        "will remove {} ({} reclaimable)",
        versions.join(", "),
        format_bytes(total_size_bytes(&to_remove))
    );
    if dry_run {
        ctx.renderer
            .print_status(Status::Info, "dry run: no installations were removed");
        return Ok(());
    }
    if !yes {
        let mut output = io::stdout();
        let accepted = confirm(
            &mut io::stdin().lock(),
            &mut output,
            &format!("Remove {} installation(s)?", to_remove.len()),
        )?;
        if !accepted {
            ctx.renderer.print_status(Status::Info, "cleanup cancelled");
            return Ok(());
        }
    }

    let mut progress = ctx
        .renderer
        .start_progress("cleanup", to_remove.len() as u64);
    let result = remove_installations(
        &ctx.layout.active_link_path(),
        &ctx.naming,
        &to_remove,
        |index, _| progress.set(index as u64 + 1),
    );
    let outcomes = match result {
        Ok(outcomes) => {
            progress.finish_success();
            outcomes
        }
        Err(err) => {
            progress.finish_abandon();
            return Err(err.into());
        }
    };

    for outcome in &outcomes {
        match outcome.status {
            RemovalStatus::Removed => ctx.renderer.print_status(
                Status::Ok,
                &format!(
                    "removed {} ({})",
                    outcome.version,
                    format_bytes(outcome.freed_bytes)
                ),
            ),
            RemovalStatus::AlreadyAbsent => ctx.renderer.print_status(
                Status::Warn,
                &format!("{} was already gone", outcome.path.display()),
            ),
        }
    }
    let freed = outcomes
        .iter()
        .map(|outcome| outcome.freed_bytes)
        .fold(0_u64, u64::saturating_add);
    println!("freed {}", format_bytes(freed));
    Ok(())
}

fn run_detect(ctx: &CommandContext) -> Result<()> {
    let detector = SystemInstallDetector::for_host(&HostPlatform::current());
    match detector.detect() {
        Some(installation) => ctx
            .renderer
            .print_status(Status::Warn, &describe_system_installation(&installation)),
        None => ctx
            .renderer
            .print_status(Status::Ok, "no system installation found"),
    }
    Ok(())
}

fn run_migrate(ctx: &CommandContext, dry_run: bool, yes: bool) -> Result<()> {
    let detector = SystemInstallDetector::for_host(&HostPlatform::current());
    let Some(installation) = detector.detect() else {
        ctx.renderer
            .print_status(Status::Ok, "no system installation found; nothing to migrate");
        return Ok(());
    };

    let plan = plan_migration(&installation, &detector, &default_companion_dirs());
    println!("{}", describe_system_installation(&installation));
    println!("paths to remove:");
    for path in &plan.paths {
        println!("  {}", path.display());
    }
    if dry_run {
        ctx.renderer
            .print_status(Status::Info, "dry run: nothing was removed");
        return Ok(());
    }
    if !yes {
        let accepted = confirm(
            &mut io::stdin().lock(),
            &mut io::stdout(),
            "Remove these paths with sudo?",
        )?;
        if !accepted {
            ctx.renderer.print_status(Status::Info, "migration cancelled");
            return Ok(());
        }
    }

    let outcome = execute_migration(&plan);
    for path in &outcome.removed {
        ctx.renderer
            .print_status(Status::Ok, &format!("removed {}", path.display()));
    }
    if let Some(message) = describe_remaining(&outcome) {
        return Err(match outcome.runner_error {
            Some(detail) => anyhow!("{message} ({detail})"),
            None => anyhow!(message),
        });
    }
    ctx.renderer
        .print_status(Status::Ok, "system installation removed");
    Ok(())
}

fn target_config_path(ctx: &CommandContext) -> Result<PathBuf> {
    config_file_path(ctx.config_path.as_deref(), |key| std::env::var(key).ok())
        .ok_or_else(|| anyhow!("cannot determine configuration path; pass --config"))
}

fn run_config_init(ctx: &CommandContext, force: bool) -> Result<()> {
    let path = target_config_path(ctx)?;
    write_config_template(&path, &ctx.config, force)?;
    ctx.renderer
        .print_status(Status::Ok, &format!("wrote {}", path.display()));
    Ok(())
}

fn run_config_show(ctx: &CommandContext) -> Result<()> {
    let path = target_config_path(ctx)?;
    let state = if path.exists() { "" } else { " (not present)" };
    println!("# file: {}{state}", path.display());
    let rendered = render_config_template(&ctx.config)?;
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .context("failed writing configuration")?;
    Ok(())
}
