use anyhow::{Result, anyhow};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/* Makes the directory if it doesn't exist and sets its mode. Errors if the
 * path already exists but is not a directory. An existing directory keeps
 * its mode. */
pub fn mkdir(path: &Path, mode: u32) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(anyhow!(
                "{} already exists but is not a directory",
                path.display()
            ));
        }
        return Ok(());
    }

    match fs::create_dir_all(path) {
        Ok(_) => (),
        Err(e) => {
            return Err(anyhow!(
                "Failed to create directory {}: {}",
                path.display(),
                e
            ));
        }
    }

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(
        |e| {
            anyhow!(
                "Failed to set mode {:o} on {}: {}",
                mode,
                path.display(),
                e
            )
        },
    )?;

    Ok(())
}

pub fn dir_exists(path: &Path) -> bool {
    path.is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mkdir_failure_paths() -> Result<()> {
        let path = PathBuf::from(format!(
            "/tmp/sshtrap-tests-mkdir-{}",
            std::process::id()
        ));
        if path.exists() {
            fs::remove_file(&path).or_else(|_| fs::remove_dir(&path))?;
        }

        fs::write(&path, "test")?;
        assert!(mkdir(&path, 0o755).is_err());
        assert!(!dir_exists(&path));
        fs::remove_file(&path)?;

        assert!(mkdir(&path, 0o700).is_ok());
        assert!(dir_exists(&path));
        // idempotent on an existing directory
        assert!(mkdir(&path, 0o755).is_ok());
        fs::remove_dir(&path)?;

        Ok(())
    }
}
