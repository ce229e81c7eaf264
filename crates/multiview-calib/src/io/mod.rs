/// COLMAP text bundle writer and reader.
pub mod colmap;

/// JSON pose and transform manifests.
pub mod manifest;

use std::path::Path;

use crate::error::CalibError;

/// Fail with [`CalibError::NonFinite`] if any value is NaN or infinite.
pub(crate) fn ensure_finite<I>(what: impl FnOnce() -> String, values: I) -> Result<(), CalibError>
where
    I: IntoIterator<Item = f64>,
{
    if values.into_iter().all(f64::is_finite) {
        Ok(())
    } else {
        Err(CalibError::NonFinite(what()))
    }
}

/// Write `contents` to `path` in a single call, creating parent directories.
pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}
