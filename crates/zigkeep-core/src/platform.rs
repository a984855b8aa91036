use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        Self::new(std::env::consts::OS, arch_token(std::env::consts::ARCH))
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    pub fn binary_file_name(&self, binary_name: &str) -> String {
        if self.is_windows() && !binary_name.ends_with(".exe") {
            return format!("{binary_name}.exe");
        }
        binary_name.to_string()
    }
}

fn arch_token(arch: &str) -> &str {
    match arch {
        "arm" => "armv7a",
        "powerpc64" => "powerpc64le",
        other => other,
    }
}
