use super::*;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::error::ErrorKind;
use zigkeep_core::VersionRecord;
use zigkeep_installer::{ActivePointer, InstallLayout, LifecycleError, RetentionPlan};

use crate::completion::write_completions_script;
use crate::dispatch::recovery_hint;
use crate::config::{
    config_file_path, env_layer, parse_config_file, read_config_file, resolve_config,
    write_config_template, ConfigLayer,
};
use crate::prompt::{confirm, parse_selection, select_many, select_one};
use crate::render::{
    describe_active_pointer, format_install_date, format_retention_plan, format_version_table,
    render_progress_line, render_status_line, resolve_output_style, version_entries, OutputStyle,
    Status,
};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "zigkeep-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path
}

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let values = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<_, _>>();
    move |key: &str| values.get(key).cloned()
}

fn fixed_layout() -> Result<InstallLayout, anyhow::Error> {
    Ok(InstallLayout::new("/home/dev/.local/share/zig", "/home/dev/.local/bin"))
}

fn record(version: &str, is_active: bool) -> VersionRecord {
    VersionRecord {
        version: version.to_string(),
        install_path: PathBuf::from(format!("/home/dev/.local/share/zig/zig-linux-x86_64-{version}")),
        size_bytes: 3 * 1024 * 1024,
        installed_at: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        is_active,
    }
}

#[test]
fn cli_parses_list_with_json() {
    let cli = Cli::try_parse_from(["zigkeep", "list", "--json"]).expect("command must parse");
    assert!(matches!(cli.command, Commands::List { json: true }));
}

#[test]
fn cli_parses_switch_with_and_without_version() {
    let cli = Cli::try_parse_from(["zigkeep", "switch", "0.13.0"]).expect("command must parse");
    assert!(matches!(cli.command, Commands::Switch { version: Some(ref v) } if v == "0.13.0"));

    let cli = Cli::try_parse_from(["zigkeep", "switch"]).expect("command must parse");
    assert!(matches!(cli.command, Commands::Switch { version: None }));
}

#[test]
fn cli_parses_cleanup_flags() {
    let cli = Cli::try_parse_from(["zigkeep", "cleanup", "--keep-last", "2", "--dry-run", "-y"])
        .expect("command must parse");
    assert!(matches!(
        cli.command,
        Commands::Cleanup {
            keep_last: Some(2),
            dry_run: true,
            yes: true
        }
    ));
}

#[test]
fn cli_rejects_non_numeric_keep_last() {
    let err = Cli::try_parse_from(["zigkeep", "cleanup", "--keep-last", "many"])
        .expect_err("keep-last must be numeric");
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

#[test]
fn cli_accepts_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "zigkeep",
        "current",
        "--install-root",
        "/tmp/zig",
        "--bin-dir",
        "/tmp/bin",
        "--no-color",
        "-v",
    ])
    .expect("command must parse");
    assert_eq!(cli.install_root, Some(PathBuf::from("/tmp/zig")));
    assert_eq!(cli.bin_dir, Some(PathBuf::from("/tmp/bin")));
    assert!(cli.no_color);
    assert!(cli.verbose);
    assert!(matches!(cli.command, Commands::Current));
}

#[test]
fn cli_parses_config_and_completion_commands() {
    let cli =
        Cli::try_parse_from(["zigkeep", "config", "init", "--force"]).expect("command must parse");
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommands::Init { force: true }
        }
    ));

    let cli = Cli::try_parse_from(["zigkeep", "completions", "zsh"]).expect("command must parse");
    assert!(matches!(
        cli.command,
        Commands::Completions {
            shell: CliCompletionShell::Zsh
        }
    ));

    let err = Cli::try_parse_from(["zigkeep", "completions", "tcsh"])
        .expect_err("unknown shell must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn completions_script_names_the_binary() {
    let mut script = Vec::new();
    write_completions_script(CliCompletionShell::Bash, &mut script)
        .expect("must write completion script");
    let script = String::from_utf8(script).expect("script must be utf-8");
    assert!(script.contains("zigkeep"));
    assert!(script.contains("cleanup"));
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, Status::Ok, "switched to 0.13.0"),
        "switched to 0.13.0"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, Status::Ok, "switched to 0.13.0"),
        "[OK] switched to 0.13.0"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, Status::Warn, "system installation found"),
        "[WARN] system installation found"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, Status::Info, "nothing to remove"),
        "[..] nothing to remove"
    );
}

#[test]
fn resolve_output_style_requires_tty_and_color() {
    assert_eq!(resolve_output_style(true, false), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false), OutputStyle::Plain);
}

#[test]
fn progress_line_is_only_rendered_for_rich_output() {
    assert_eq!(
        render_progress_line(OutputStyle::Plain, "cleanup", 1, 2, None),
        None
    );
    let line = render_progress_line(OutputStyle::Rich, "cleanup", 2, 4, None)
        .expect("rich output must render");
    assert!(line.contains(" 50% 2/4"));
}

#[test]
fn version_table_marks_active_and_totals_size() {
    let lines = format_version_table(&[record("0.14.0-dev.1+abc", false), record("0.13.0", true)]);
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("VERSION"));
    assert!(lines[1].starts_with("  0.14.0-dev.1+abc"));
    assert!(lines[1].contains("dev"));
    assert!(lines[2].starts_with("* 0.13.0"));
    assert!(lines[2].contains("3 MB"));
    assert!(lines[2].contains("2023-11-14"));
    assert!(lines[2].contains("stable"));
    assert_eq!(lines[3], "2 installed, 6 MB total");
}

#[test]
fn version_table_reports_empty_root() {
    assert_eq!(format_version_table(&[]), vec!["No versions installed"]);
}

#[test]
fn version_entries_serialize_for_json_output() {
    let records = vec![record("0.13.0", true)];
    let value = serde_json::to_value(version_entries(&records)).expect("must serialize");
    assert_eq!(value[0]["version"], "0.13.0");
    assert_eq!(value[0]["active"], true);
    assert_eq!(value[0]["installed_at_unix"], 1_700_000_000_u64);
    assert_eq!(value[0]["channel"], "stable");
}

#[test]
fn install_date_uses_utc_calendar_day() {
    assert_eq!(format_install_date(&record("0.13.0", false)), "2023-11-14");
}

#[test]
fn active_pointer_descriptions_explain_each_state() {
    assert_eq!(
        describe_active_pointer(&ActivePointer::Linked {
            target: PathBuf::from("/z/zig-linux-x86_64-0.13.0/zig"),
            version: "0.13.0".to_string(),
        }),
        "0.13.0 (/z/zig-linux-x86_64-0.13.0/zig)"
    );
    assert!(describe_active_pointer(&ActivePointer::Missing).contains("does not exist"));
    assert!(describe_active_pointer(&ActivePointer::Dangling {
        target: PathBuf::from("/z/zig-linux-x86_64-0.12.0/zig"),
        version: Some("0.12.0".to_string()),
    })
    .contains("removed version 0.12.0"));
    assert!(describe_active_pointer(&ActivePointer::Unrecognized {
        target: PathBuf::from("/usr/bin/zig"),
    })
    .contains("outside managed installations"));
}

#[test]
fn retention_plan_lines_list_kept_removed_and_size() {
    let records = vec![record("0.13.0", true), record("0.12.0", false)];
    let plan = RetentionPlan {
        keep: vec![records[0].clone()],
        remove: vec![records[1].clone()],
    };
    assert_eq!(
        format_retention_plan(&plan, 1),
        vec![
            "keeping 1 (keep-last 1): 0.13.0".to_string(),
            "removing 1: 0.12.0".to_string(),
            "reclaimable: 3 MB".to_string(),
        ]
    );
}

#[test]
fn parse_selection_accepts_commas_and_spaces() {
    assert_eq!(parse_selection("1, 3 3", 3).expect("must parse"), vec![0, 2]);
    assert!(parse_selection("", 3).expect("must parse").is_empty());
    assert!(parse_selection("0", 3).is_err());
    assert!(parse_selection("4", 3).is_err());
    assert!(parse_selection("two", 3).is_err());
}

#[test]
fn confirm_defaults_to_yes_and_treats_eof_as_no() {
    let mut output = Vec::new();
    assert!(confirm(&mut Cursor::new("\n"), &mut output, "Remove?").expect("must read"));
    assert!(confirm(&mut Cursor::new("YES\n"), &mut output, "Remove?").expect("must read"));
    assert!(!confirm(&mut Cursor::new("n\n"), &mut output, "Remove?").expect("must read"));
    assert!(!confirm(&mut Cursor::new(""), &mut output, "Remove?").expect("must read"));
    let prompt = String::from_utf8(output).expect("prompt must be utf-8");
    assert!(prompt.starts_with("Remove? [Y/n] "));
}

#[test]
fn select_prompts_number_choices() {
    let items = vec!["0.13.0".to_string(), "0.12.0".to_string()];
    let mut output = Vec::new();
    let selected =
        select_one(&mut Cursor::new("2\n"), &mut output, "Installed:", &items).expect("must select");
    assert_eq!(selected, Some(1));
    let rendered = String::from_utf8(output).expect("prompt must be utf-8");
    assert!(rendered.contains("  1) 0.13.0"));
    assert!(rendered.contains("  2) 0.12.0"));

    let mut output = Vec::new();
    assert_eq!(
        select_one(&mut Cursor::new("\n"), &mut output, "Installed:", &items).expect("must read"),
        None
    );
    assert!(select_one(&mut Cursor::new("1 2\n"), &mut output, "Installed:", &items).is_err());
    assert_eq!(
        select_many(&mut Cursor::new("2,1\n"), &mut output, "Remove:", &items)
            .expect("must select"),
        vec![0, 1]
    );
}

#[test]
fn config_file_parses_known_fields() {
    let layer = parse_config_file(
        "install_root = \"/data/zig\"\nkeep_last = 3\nno_color = true\nfixed_segments = 3\n",
    )
    .expect("must parse");
    assert_eq!(layer.install_root, Some(PathBuf::from("/data/zig")));
    assert_eq!(layer.keep_last, Some(3));
    assert_eq!(layer.no_color, Some(true));
    assert_eq!(layer.bin_dir, None);
}

#[test]
fn config_file_rejects_unknown_and_malformed_content() {
    assert!(parse_config_file("install_dir = \"/data\"\n").is_err());
    assert!(parse_config_file("keep_last = \"three\"\n").is_err());
    assert!(parse_config_file("keep_last = \n").is_err());
    assert!(parse_config_file("fixed_segments = 0\n").is_err());
}

#[test]
fn config_precedence_is_file_then_env_then_flags() {
    let file = parse_config_file(
        "install_root = \"/file/zig\"\nbin_dir = \"/file/bin\"\nkeep_last = 1\nartifact = \"zig\"\n",
    )
    .expect("must parse");
    let env = env_layer(lookup_from(&[
        ("ZIGKEEP_BIN_DIR", "/env/bin"),
        ("ZIGKEEP_KEEP_LAST", "4"),
    ]))
    .expect("env must parse");
    let flags = ConfigLayer {
        keep_last: Some(7),
        ..ConfigLayer::default()
    };

    let config = resolve_config(file.overlay(env).overlay(flags), fixed_layout)
        .expect("must resolve");
    assert_eq!(config.install_root, PathBuf::from("/file/zig"));
    assert_eq!(config.bin_dir, PathBuf::from("/env/bin"));
    assert_eq!(config.keep_last, 7);
    assert_eq!(config.version_arg, "version");
    assert_eq!(config.fixed_segments, 3);
}

#[test]
fn config_defaults_fill_unset_directories() {
    let config = resolve_config(ConfigLayer::default(), fixed_layout).expect("must resolve");
    assert_eq!(
        config.install_root,
        PathBuf::from("/home/dev/.local/share/zig")
    );
    assert_eq!(config.bin_dir, PathBuf::from("/home/dev/.local/bin"));
    assert_eq!(config.keep_last, 0);
    assert!(!config.no_color);
    assert_eq!(
        config.layout().active_link_path(),
        Path::new("/home/dev/.local/bin").join(&config.binary_name)
    );
}

#[test]
fn explicit_directories_do_not_need_default_layout() {
    let layer = ConfigLayer {
        install_root: Some(PathBuf::from("/a")),
        bin_dir: Some(PathBuf::from("/b")),
        ..ConfigLayer::default()
    };
    let config = resolve_config(layer, || Err(anyhow::anyhow!("HOME is not set")))
        .expect("explicit directories must suffice");
    assert_eq!(config.install_root, PathBuf::from("/a"));
}

#[test]
fn env_layer_honors_no_color_conventions() {
    let layer = env_layer(lookup_from(&[("NO_COLOR", "1")])).expect("must parse");
    assert_eq!(layer.no_color, Some(true));

    let layer = env_layer(lookup_from(&[("NO_COLOR", "1"), ("ZIGKEEP_NO_COLOR", "false")]))
        .expect("must parse");
    assert_eq!(layer.no_color, Some(false));

    let layer = env_layer(lookup_from(&[("NO_COLOR", "")])).expect("must parse");
    assert_eq!(layer.no_color, None);

    assert!(env_layer(lookup_from(&[("ZIGKEEP_KEEP_LAST", "-1")])).is_err());
}

#[test]
fn config_path_prefers_explicit_then_xdg_then_home() {
    assert_eq!(
        config_file_path(Some(Path::new("/etc/zigkeep.toml")), lookup_from(&[])),
        Some(PathBuf::from("/etc/zigkeep.toml"))
    );
    assert_eq!(
        config_file_path(
            None,
            lookup_from(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/dev")])
        ),
        Some(PathBuf::from("/xdg/zigkeep/config.toml"))
    );
    assert_eq!(
        config_file_path(None, lookup_from(&[("HOME", "/home/dev")])),
        Some(PathBuf::from("/home/dev/.config/zigkeep/config.toml"))
    );
    assert_eq!(config_file_path(None, lookup_from(&[])), None);
}

#[test]
fn missing_config_file_is_an_empty_layer() {
    let dir = test_dir();
    let layer = read_config_file(&dir.join("config.toml")).expect("missing file must be fine");
    assert_eq!(layer, ConfigLayer::default());
}

#[test]
fn config_template_round_trips_and_refuses_overwrite() {
    let dir = test_dir();
    let path = dir.join("zigkeep").join("config.toml");
    let mut config = resolve_config(ConfigLayer::default(), fixed_layout).expect("must resolve");
    config.keep_last = 2;

    write_config_template(&path, &config, false).expect("must write template");
    let content = fs::read_to_string(&path).expect("must read template");
    assert!(content.starts_with("# zigkeep configuration"));
    let layer = read_config_file(&path).expect("template must parse");
    assert_eq!(layer.keep_last, Some(2));
    assert_eq!(
        layer.install_root,
        Some(PathBuf::from("/home/dev/.local/share/zig"))
    );

    let err = write_config_template(&path, &config, false).expect_err("must refuse overwrite");
    assert!(err.to_string().contains("--force"));
    write_config_template(&path, &config, true).expect("force must overwrite");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn malformed_config_file_names_the_path() {
    let dir = test_dir();
    fs::create_dir_all(&dir).expect("must create dir");
    let path = dir.join("config.toml");
    fs::write(&path, "keep_last = [").expect("must write file");

    let err = read_config_file(&path).expect_err("malformed file must fail");
    assert!(format!("{err:#}").contains("failed parsing configuration"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn telemetry_default_directive_follows_verbosity() {
    assert_eq!(telemetry::default_directive(false), "zigkeep=warn");
    assert_eq!(telemetry::default_directive(true), "zigkeep=debug");
}

#[test]
fn recovery_hint_only_follows_applied_mutations() {
    let applied = anyhow::Error::new(LifecycleError::VerificationFailed {
        link: PathBuf::from("/home/u/.local/bin/zig"),
        expected: "0.13.0".to_string(),
        reported: "0.12.0".to_string(),
    })
    .context("switch failed");
    assert!(recovery_hint(&applied)
        .expect("applied mutation must carry a hint")
        .contains("zigkeep current"));

    let untouched = anyhow::Error::new(LifecycleError::NotInstalled {
        version: "0.9.0".to_string(),
        install_root: PathBuf::from("/home/u/.local/share/zig"),
    });
    assert_eq!(recovery_hint(&untouched), None);
    assert_eq!(recovery_hint(&anyhow::anyhow!("plain failure")), None);
}
