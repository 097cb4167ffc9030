//! Atomic file writes: write to a temp file in the target directory, fsync,
//! then rename over the destination.

use conduit_core::ConduitError;
use std::io::Write;
use std::path::Path;

/// Write `contents` to `path` atomically, creating parent directories with
/// permissive-read/owner-write permissions if needed.
///
/// # Errors
/// Returns [`ConduitError::Io`] if any step fails.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), ConduitError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(parent) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o755);
            let _ = std::fs::set_permissions(parent, perms);
        }
    }

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ConduitError::Io(e.error))?;
    Ok(())
}

/// Copy `source` to `destination`, creating `destination`'s parent directory
/// if needed.
///
/// # Errors
/// Returns [`ConduitError::Io`] on any filesystem failure.
pub fn copy_aside(source: &Path, destination: &Path) -> Result<(), ConduitError> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(source, destination)?;
    Ok(())
}
