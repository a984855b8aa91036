use std::path::Path;

/// On-disk naming convention for installation directories:
/// `<artifact>-<segment>-<segment>-<version>`, where the version tail may itself
/// contain `-` (pre-release) and `+` (build metadata).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    artifact: String,
    fixed_segments: usize,
}

impl NamingConvention {
    /// `fixed_segments` counts the artifact token plus the platform tokens that
    /// precede the version (3 for `zig-linux-x86_64-...`).
    pub fn new(artifact: impl Into<String>, fixed_segments: usize) -> Self {
        Self {
            artifact: artifact.into(),
            fixed_segments: fixed_segments.max(1),
        }
    }

    pub fn zig() -> Self {
        Self::new("zig", 3)
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn fixed_segments(&self) -> usize {
        self.fixed_segments
    }

    pub fn matches_prefix(&self, dir_name: &str) -> bool {
        dir_name
            .strip_prefix(self.artifact.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Returns `None` when the name is not a recognized version directory; that
    /// is a skip condition for callers, never a failure.
    pub fn decode(&self, dir_name: &str) -> Option<String> {
        let parts = dir_name.split('-').collect::<Vec<_>>();
        if parts.len() <= self.fixed_segments {
            return None;
        }
        let version = parts[self.fixed_segments..].join("-");
        if version.is_empty() {
            return None;
        }
        Some(version)
    }

    pub fn decode_path(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        self.decode(name)
    }

    pub fn encode(&self, platform_tokens: &[&str], version: &str) -> String {
        let mut name = self.artifact.clone();
        for token in platform_tokens {
            name.push('-');
            name.push_str(token);
        }
        name.push('-');
        name.push_str(version);
        name
    }
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::zig()
    }
}
