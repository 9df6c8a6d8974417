use error::SyncError;
use std::io::Write;
use std::path::Path;

/// Writes `value` to `path` as pretty JSON, via a temp file in the same
/// directory followed by a rename, so a reader never observes a partially
/// written rules or topology file.
pub fn write_json_atomically(path: impl AsRef<Path>, value: &serde_json::Value) -> Result<(), SyncError> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let body = serde_json::to_vec_pretty(value)?;
    tmp.write_all(&body)?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|err| SyncError::config(format!("could not persist {}: {err}", path.display())))?;
    Ok(())
}
