mod naming;
mod platform;
mod record;

pub use naming::NamingConvention;
pub use platform::HostPlatform;
pub use record::{
    classify_version, format_bytes, total_size_bytes, ReleaseChannel, VersionRecord,
    DEVELOPMENT_MARKER,
};
