use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use zigkeep_core::{HostPlatform, NamingConvention};
use zigkeep_installer::{default_user_layout, InstallLayout};

const CONFIG_DIR_NAME: &str = "zigkeep";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Effective settings after every source has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerConfig {
    pub install_root: PathBuf,
    pub bin_dir: PathBuf,
    pub artifact: String,
    pub binary_name: String,
    pub version_arg: String,
    pub fixed_segments: usize,
    pub keep_last: usize,
    pub no_color: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl ManagerConfig {
    pub fn layout(&self) -> InstallLayout {
        InstallLayout::new(&self.install_root, &self.bin_dir)
            .with_binary_name(self.binary_name.clone())
    }

    pub fn naming(&self) -> NamingConvention {
        NamingConvention::new(self.artifact.clone(), self.fixed_segments)
    }
}

/// One source of settings. Unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub install_root: Option<PathBuf>,
    pub bin_dir: Option<PathBuf>,
    pub artifact: Option<String>,
    pub binary_name: Option<String>,
    pub version_arg: Option<String>,
    pub fixed_segments: Option<usize>,
    pub keep_last: Option<usize>,
    pub no_color: Option<bool>,
    pub log_file: Option<PathBuf>,
}

impl ConfigLayer {
    pub fn overlay(self, higher: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            install_root: higher.install_root.or(self.install_root),
            bin_dir: higher.bin_dir.or(self.bin_dir),
            artifact: higher.artifact.or(self.artifact),
            binary_name: higher.binary_name.or(self.binary_name),
            version_arg: higher.version_arg.or(self.version_arg),
            fixed_segments: higher.fixed_segments.or(self.fixed_segments),
            keep_last: higher.keep_last.or(self.keep_last),
            no_color: higher.no_color.or(self.no_color),
            log_file: higher.log_file.or(self.log_file),
        }
    }
}

pub fn parse_config_file(content: &str) -> Result<ConfigLayer> {
    let layer = toml::from_str::<ConfigLayer>(content)?;
    if layer.fixed_segments == Some(0) {
        return Err(anyhow!("fixed_segments must be at least 1"));
    }
    Ok(layer)
}

/// A missing file is an empty layer; a malformed one is an error.
pub fn read_config_file(path: &Path) -> Result<ConfigLayer> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no configuration file");
            return Ok(ConfigLayer::default());
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed reading configuration: {}", path.display()))
        }
    };
    parse_config_file(&content)
        .with_context(|| format!("failed parsing configuration: {}", path.display()))
}

pub fn config_file_path<Lookup>(explicit: Option<&Path>, lookup: Lookup) -> Option<PathBuf>
where
    Lookup: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(xdg) = lookup("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        return Some(
            PathBuf::from(xdg)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }
    lookup("HOME").filter(|value| !value.is_empty()).map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    })
}

pub fn env_layer<Lookup>(lookup: Lookup) -> Result<ConfigLayer>
where
    Lookup: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let keep_last = match non_empty("ZIGKEEP_KEEP_LAST") {
        Some(raw) => Some(
            raw.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid ZIGKEEP_KEEP_LAST value '{raw}'"))?,
        ),
        None => None,
    };
    let no_color = match non_empty("ZIGKEEP_NO_COLOR") {
        Some(raw) => Some(parse_flag(&raw).with_context(|| "invalid ZIGKEEP_NO_COLOR value")?),
        None => non_empty("NO_COLOR").map(|_| true),
    };

    Ok(ConfigLayer {
        install_root: non_empty("ZIGKEEP_INSTALL_ROOT").map(PathBuf::from),
        bin_dir: non_empty("ZIGKEEP_BIN_DIR").map(PathBuf::from),
        keep_last,
        no_color,
        ..ConfigLayer::default()
    })
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{other}'")),
    }
}

/// Applies `layer` on top of the built-in defaults. `default_layout` is only
/// consulted for directories no layer sets.
pub fn resolve_config(
    layer: ConfigLayer,
    default_layout: impl FnOnce() -> Result<InstallLayout>,
) -> Result<ManagerConfig> {
    let (install_root, bin_dir) = match (layer.install_root, layer.bin_dir) {
        (Some(install_root), Some(bin_dir)) => (install_root, bin_dir),
        (install_root, bin_dir) => {
            let defaults = default_layout().context(
                "failed to resolve default directories; set install_root and bin_dir explicitly",
            )?;
            (
                install_root.unwrap_or_else(|| defaults.install_root().to_path_buf()),
                bin_dir.unwrap_or_else(|| defaults.bin_dir().to_path_buf()),
            )
        }
    };

    Ok(ManagerConfig {
        install_root,
        bin_dir,
        artifact: layer.artifact.unwrap_or_else(|| "zig".to_string()),
        binary_name: layer
            .binary_name
            .unwrap_or_else(|| HostPlatform::current().binary_file_name("zig")),
        version_arg: layer.version_arg.unwrap_or_else(|| "version".to_string()),
        fixed_segments: layer.fixed_segments.unwrap_or(3).max(1),
        keep_last: layer.keep_last.unwrap_or(0),
        no_color: layer.no_color.unwrap_or(false),
        log_file: layer.log_file,
    })
}

/// Defaults < file < environment < flags.
pub fn load_config(explicit_path: Option<&Path>, flags: ConfigLayer) -> Result<ManagerConfig> {
    let lookup = |key: &str| std::env::var(key).ok();
    let file = match config_file_path(explicit_path, lookup) {
        Some(path) => read_config_file(&path)?,
        None => ConfigLayer::default(),
    };
    let env = env_layer(lookup)?;
    resolve_config(file.overlay(env).overlay(flags), default_user_layout)
}

pub fn render_config_template(config: &ManagerConfig) -> Result<String> {
    let body = toml::to_string(config).context("failed serializing configuration")?;
    Ok(format!(
        "# zigkeep configuration\n\
         # ZIGKEEP_* environment variables and command-line flags override these values.\n\
         # keep_last = 0 disables automatic cleanup.\n\n{body}"
    ))
}

pub fn write_config_template(path: &Path, config: &ManagerConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "configuration already exists: {} (use --force to overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed creating configuration dir: {}", parent.display())
        })?;
    }
    let content = render_config_template(config)?;
    fs::write(path, content)
        .with_context(|| format!("failed writing configuration: {}", path.display()))
}
