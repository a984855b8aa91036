mod completion;
mod config;
mod dispatch;
mod prompt;
mod render;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::completion::CliCompletionShell;

#[derive(Parser, Debug)]
#[command(name = "zigkeep", version)]
#[command(about = "Keeps local Zig toolchain installations in order", long_about = None)]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/zigkeep/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding one subdirectory per installed version
    #[arg(long, global = true)]
    install_root: Option<PathBuf>,
    /// Directory holding the active link
    #[arg(long, global = true)]
    bin_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    no_color: bool,
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Append log events to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List installed versions
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show the active version
    Current,
    /// Point the active link at an installed version
    Switch { version: Option<String> },
    /// Remove old installations
    Cleanup {
        #[arg(long)]
        keep_last: Option<usize>,
        #[arg(long)]
        dry_run: bool,
        #[arg(short, long)]
        yes: bool,
    },
    /// Look for a system-wide installation
    Detect,
    /// Remove a system-wide installation
    Migrate {
        #[arg(long)]
        dry_run: bool,
        #[arg(short, long)]
        yes: bool,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
    Version,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a configuration file with the effective settings
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings
    Show,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch::run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(hint) = dispatch::recovery_hint(&err) {
                eprintln!("note: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
