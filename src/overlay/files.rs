use crate::overlay::OverlayFs;
use anyhow::{Result, anyhow};
use std::fs::{self, File, OpenOptions};
use std::path::{Component, PathBuf};

/* Path-scoped file access for the fake shell. Every path the attacker
 * supplies is resolved against the merged root and refused if it would
 * land outside it. This keeps honest callers honest; the mount itself is
 * what actually isolates the attacker's shell. */
impl OverlayFs {
    /* Lexically resolves `path` under merged. Absolute paths are re-rooted
     * at merged, `..` components pop; popping past the root is an escape
     * and is refused no matter how many `..` segments follow. */
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = PathBuf::new();

        for component in PathBuf::from(path).components() {
            match component {
                Component::RootDir | Component::Prefix(_) => {
                    resolved.clear();
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(anyhow!("path outside root"));
                    }
                }
                Component::Normal(part) => resolved.push(part),
            }
        }

        Ok(self.merged.join(resolved))
    }

    pub fn open_file(&self, path: &str, opts: &OpenOptions) -> Result<File> {
        let resolved = self.resolve(path)?;
        Ok(opts.open(resolved)?)
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        Ok(fs::create_dir(resolved)?)
    }

    pub fn read_dir(&self, path: &str) -> Result<fs::ReadDir> {
        let resolved = self.resolve(path)?;
        Ok(fs::read_dir(resolved)?)
    }

    pub fn dir_exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(resolved) => resolved.is_dir(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> OverlayFs {
        OverlayFs {
            merged: PathBuf::from("/base/sandboxes/k/merge-9"),
            upper: PathBuf::from("/base/sandboxes/k/layers/9"),
            work: PathBuf::from("/base/sandboxes/k/work-9"),
            lowers: vec![PathBuf::from("/base/defaultfs")],
        }
    }

    #[test]
    fn test_resolve_relative_and_absolute() -> Result<()> {
        let ofs = session();
        assert_eq!(
            ofs.resolve("etc/passwd")?,
            PathBuf::from("/base/sandboxes/k/merge-9/etc/passwd")
        );
        // absolute paths are the sandbox's, not the host's
        assert_eq!(
            ofs.resolve("/etc/passwd")?,
            PathBuf::from("/base/sandboxes/k/merge-9/etc/passwd")
        );
        Ok(())
    }

    #[test]
    fn test_resolve_parent_components_stay_inside() -> Result<()> {
        let ofs = session();
        assert_eq!(
            ofs.resolve("etc/../tmp/./x")?,
            PathBuf::from("/base/sandboxes/k/merge-9/tmp/x")
        );
        Ok(())
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let ofs = session();
        for path in [
            "..",
            "../../../etc/shadow",
            "/..",
            "/tmp/../../etc",
            "a/../../b",
        ] {
            let err = ofs.resolve(path).unwrap_err();
            assert_eq!(err.to_string(), "path outside root");
        }
    }
}
