use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use zigkeep_core::HostPlatform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    install_root: PathBuf,
    bin_dir: PathBuf,
    binary_name: String,
}

impl InstallLayout {
    pub fn new(install_root: impl Into<PathBuf>, bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            bin_dir: bin_dir.into(),
            binary_name: HostPlatform::current().binary_file_name("zig"),
        }
    }

    pub fn with_binary_name(mut self, binary_name: impl Into<String>) -> Self {
        self.binary_name = binary_name.into();
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn active_link_path(&self) -> PathBuf {
        self.bin_dir.join(&self.binary_name)
    }

    pub fn installation_dir(&self, dir_name: &str) -> PathBuf {
        self.install_root.join(dir_name)
    }

    pub fn installation_binary(&self, install_path: &Path) -> PathBuf {
        install_path.join(&self.binary_name)
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [&self.install_root, &self.bin_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_user_layout() -> Result<InstallLayout> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows install root")?;
        let base = PathBuf::from(app_data).join("zigkeep");
        return Ok(InstallLayout::new(base.join("zig"), base.join("bin")));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve install root")?;
    let local = PathBuf::from(home).join(".local");
    Ok(InstallLayout::new(
        local.join("share").join("zig"),
        local.join("bin"),
    ))
}
