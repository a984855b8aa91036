use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use chrono::{DateTime, Utc};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use serde::Serialize;
use zigkeep_core::{format_bytes, total_size_bytes, VersionRecord};
use zigkeep_installer::{ActivePointer, DetectionEvidence, RetentionPlan, SystemInstallation};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

pub fn resolve_output_style(stdout_is_tty: bool, no_color: bool) -> OutputStyle {
    if stdout_is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub fn current_output_style(no_color: bool) -> OutputStyle {
    resolve_output_style(std::io::stdout().is_terminal(), no_color)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,
    Info,
    Warn,
}

impl Status {
    fn badge(self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Info => "[..]",
            Self::Warn => "[WARN]",
        }
    }
}

pub fn render_status_line(style: OutputStyle, status: Status, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status.badge()),
    }
}

#[derive(Copy, Clone, Debug)]
pub struct TerminalRenderer {
    style: OutputStyle,
}

pub struct TerminalProgress {
    style: OutputStyle,
    label: String,
    total: u64,
    current: u64,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalRenderer {
    pub fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub fn style(self) -> OutputStyle {
        self.style
    }

    pub fn print_status(self, status: Status, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub fn print_section(self, title: &str) {
        if self.style == OutputStyle::Rich {
            println!();
            println!("{}", colorize(section_style(), &format!("== {title} ==")));
        }
    }

    pub fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub fn start_progress(self, label: &str, total: u64) -> TerminalProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(total.max(1));
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {msg:<8} [{bar:20.cyan/blue}] {pos:>3}/{len:3} {elapsed_precise}",
            ) {
                progress_bar.set_style(style.tick_chars("\\|/- ").progress_chars("=>-"));
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        TerminalProgress {
            style: self.style,
            label: label.to_string(),
            total,
            current: 0,
            progress_bar,
            started_at: Instant::now(),
        }
    }
}

impl TerminalProgress {
    pub fn set(&mut self, current: u64) {
        self.current = current.min(self.total);
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(self.current);
        }
    }

    pub fn finish_success(mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };
        progress_bar.finish_and_clear();
        if let Some(line) = render_progress_line(
            self.style,
            &self.label,
            self.current,
            self.total,
            Some(self.started_at.elapsed()),
        ) {
            println!("{line}");
        }
    }

    pub fn finish_abandon(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

pub fn render_progress_line(
    style: OutputStyle,
    label: &str,
    current: u64,
    total: u64,
    elapsed: Option<Duration>,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    let width = 18_usize;
    let safe_total = total.max(1);
    let bounded_current = current.min(safe_total);
    let filled = ((bounded_current as usize) * width) / (safe_total as usize);
    let bar = format!(
        "{}{}",
        "=".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    let percent = (bounded_current * 100) / safe_total;
    let suffix = elapsed
        .map(|value| format!(" complete in {}", format_elapsed(value)))
        .unwrap_or_default();

    Some(format!(
        "{} [{}] {:>3}% {}/{}{}",
        colorize(progress_label_style(), label),
        colorize(progress_bar_style(), &bar),
        percent,
        HumanCount(current),
        HumanCount(total),
        suffix
    ))
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis())
}

pub fn format_install_date(record: &VersionRecord) -> String {
    let secs = i64::try_from(record.installed_at_unix()).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn format_version_table(records: &[VersionRecord]) -> Vec<String> {
    if records.is_empty() {
        return vec!["No versions installed".to_string()];
    }

    let width = records
        .iter()
        .map(|record| record.version.len())
        .max()
        .unwrap_or(0)
        .max("VERSION".len());
    let mut lines = vec![format!(
        "  {:<width$}  {:>8}  {:<10}  CHANNEL",
        "VERSION", "SIZE", "INSTALLED"
    )];
    for record in records {
        let marker = if record.is_active { '*' } else { ' ' };
        lines.push(format!(
            "{marker} {:<width$}  {:>8}  {:<10}  {}",
            record.version,
            format_bytes(record.size_bytes),
            format_install_date(record),
            record.channel().as_str()
        ));
    }
    lines.push(format!(
        "{} installed, {} total",
        records.len(),
        format_bytes(total_size_bytes(records))
    ));
    lines
}

#[derive(Debug, Serialize)]
pub struct VersionEntry<'a> {
    pub version: &'a str,
    pub path: String,
    pub size_bytes: u64,
    pub installed_at_unix: u64,
    pub active: bool,
    pub channel: &'static str,
}

pub fn version_entries(records: &[VersionRecord]) -> Vec<VersionEntry<'_>> {
    records
        .iter()
        .map(|record| VersionEntry {
            version: &record.version,
            path: record.install_path.display().to_string(),
            size_bytes: record.size_bytes,
            installed_at_unix: record.installed_at_unix(),
            active: record.is_active,
            channel: record.channel().as_str(),
        })
        .collect()
}

pub fn describe_active_pointer(pointer: &ActivePointer) -> String {
    match pointer {
        ActivePointer::Missing => "no active version (the active link does not exist)".to_string(),
        ActivePointer::Linked { version, target } => {
            format!("{version} ({})", target.display())
        }
        ActivePointer::Dangling {
            target,
            version: Some(version),
        } => format!(
            "no active version (the link points at removed version {version}: {})",
            target.display()
        ),
        ActivePointer::Dangling {
            target,
            version: None,
        } => format!(
            "no active version (the link target is missing: {})",
            target.display()
        ),
        ActivePointer::Unrecognized { target } => format!(
            "no active version (the link points outside managed installations: {})",
            target.display()
        ),
        ActivePointer::Unreadable { detail } => {
            format!("no active version (the active link is unreadable: {detail})")
        }
    }
}

pub fn format_retention_plan(plan: &RetentionPlan, keep_last: usize) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "keeping {} (keep-last {keep_last}): {}",
        plan.keep.len(),
        join_or_none(&plan.kept_versions())
    ));
    lines.push(format!(
        "removing {}: {}",
        plan.remove.len(),
        join_or_none(&plan.removed_versions())
    ));
    lines.push(format!(
        "reclaimable: {}",
        format_bytes(plan.reclaimable_bytes())
    ));
    lines
}

pub fn format_version_choices(records: &[VersionRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let active = if record.is_active { ", active" } else { "" };
            format!(
                "{} ({}, installed {}{active})",
                record.version,
                format_bytes(record.size_bytes),
                format_install_date(record)
            )
        })
        .collect()
}

pub fn describe_system_installation(installation: &SystemInstallation) -> String {
    match &installation.evidence {
        DetectionEvidence::Directory => format!(
            "system installation found at {}",
            installation.path.display()
        ),
        DetectionEvidence::Symlink { link, target } => format!(
            "system installation found at {} (via {} -> {})",
            installation.path.display(),
            link.display(),
            target.display()
        ),
    }
}

fn join_or_none(versions: &[&str]) -> String {
    if versions.is_empty() {
        return "none".to_string();
    }
    versions.join(", ")
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn progress_bar_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::BrightBlue.into()))
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
