use std::fs;
use std::io;
use std::path::Path;

/// Existence check that does not follow symlinks, so dangling links count.
pub fn path_exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub(crate) fn create_symlink(source_path: &Path, destination: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source_path, destination)
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(source_path, destination)
    }
}
