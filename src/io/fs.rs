//! Output path pre-checks.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Make `path` ready to receive a new file.
///
/// * An existing non-file path fails with [`Error::NotAFile`].
/// * An existing file fails with [`Error::DestinationExists`] unless `force`
///   is set, in which case it is removed.
/// * Missing parent directories are created.
pub fn ensure_file(path: impl AsRef<Path>, force: bool) -> Result<()> {
    let path = path.as_ref();
    if let Ok(meta) = fs::symlink_metadata(path) {
        if !meta.is_file() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }
        if !force {
            return Err(Error::DestinationExists(path.to_path_buf()));
        }
        debug!("Removing existing file '{}'", path.display());
        fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parent_directories() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("a").join("b").join("out.csv");
        ensure_file(&path, false)?;
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn existing_file_needs_force() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("out.csv");
        fs::write(&path, "x")?;
        assert!(matches!(ensure_file(&path, false), Err(Error::DestinationExists(_))));
        assert!(path.exists());
        ensure_file(&path, true)?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn directory_is_not_a_file() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        assert!(matches!(ensure_file(tmp.path(), true), Err(Error::NotAFile(_))));
        Ok(())
    }
}
