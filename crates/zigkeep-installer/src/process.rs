use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

pub(crate) fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

/// Runs `<binary> <version_arg>` and returns its trimmed stdout.
pub fn query_reported_version(binary: &Path, version_arg: &str) -> Result<String, String> {
    let output = Command::new(binary)
        .arg(version_arg)
        .output()
        .map_err(|err| format!("failed to run '{} {version_arg}': {err}", binary.display()))?;
    if !output.status.success() {
        return Err(format!(
            "'{} {version_arg}' exited with {}: {}",
            binary.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let reported = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if reported.is_empty() {
        return Err(format!(
            "'{} {version_arg}' printed no version",
            binary.display()
        ));
    }
    Ok(reported)
}
