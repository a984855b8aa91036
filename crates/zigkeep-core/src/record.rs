use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Version marker the release index uses for rolling development builds.
pub const DEVELOPMENT_MARKER: &str = "master";

/// One installed version, synthesized fresh from the filesystem on every scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub version: String,
    pub install_path: PathBuf,
    pub size_bytes: u64,
    pub installed_at: SystemTime,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    Stable,
    PreRelease,
    Development,
}

impl ReleaseChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::PreRelease => "pre-release",
            Self::Development => "dev",
        }
    }
}

impl VersionRecord {
    pub fn installed_at_unix(&self) -> u64 {
        self.installed_at
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }

    pub fn channel(&self) -> ReleaseChannel {
        classify_version(&self.version)
    }
}

pub fn classify_version(version: &str) -> ReleaseChannel {
    if version == DEVELOPMENT_MARKER || version.contains("-dev.") {
        return ReleaseChannel::Development;
    }
    match semver::Version::parse(version) {
        Ok(parsed) if parsed.pre.is_empty() => ReleaseChannel::Stable,
        Ok(_) => ReleaseChannel::PreRelease,
        Err(_) if version.contains('-') => ReleaseChannel::PreRelease,
        Err(_) => ReleaseChannel::Stable,
    }
}

/// 1024-based human readable size rounded to whole units (`"512 B"`, `"3 MB"`).
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let units = ["KB", "MB", "GB", "TB", "PB", "EB"];
    let mut div = UNIT;
    let mut exp = 0_usize;
    let mut remaining = bytes / UNIT;
    while remaining >= UNIT && exp + 1 < units.len() {
        div *= UNIT;
        exp += 1;
        remaining /= UNIT;
    }

    format!("{:.0} {}", bytes as f64 / div as f64, units[exp])
}

pub fn total_size_bytes<'a>(records: impl IntoIterator<Item = &'a VersionRecord>) -> u64 {
    records
        .into_iter()
        .map(|record| record.size_bytes)
        .fold(0_u64, u64::saturating_add)
}
