use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber: `RUST_LOG` wins, otherwise `zigkeep=warn`
/// (`zigkeep=debug` when verbose). `ZIGKEEP_LOG_JSON` switches stderr to JSON.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed opening log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);

    if std::env::var_os("ZIGKEEP_LOG_JSON").is_some() {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        subscriber
            .with(json_layer)
            .try_init()
            .context("failed to initialize logging")
    } else {
        let fmt_layer = fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr);
        subscriber
            .with(fmt_layer)
            .try_init()
            .context("failed to initialize logging")
    }
}

pub(crate) fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "zigkeep=debug"
    } else {
        "zigkeep=warn"
    }
}
