use crate::defaultfs::{AssetEntry, AssetKind};
use crate::overlay::OverlayFs;
use crate::util::{check_sandbox_key, dir_exists, mkdir};
use anyhow::{Context, Result};
use log::{debug, trace};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/* Manages the overlay stacks for every sandbox. It maintains the
 * following directory hierarchy:
 *
 * base
 * |- defaultfs
 * |  |- etc
 * |  |  |- shadow
 * |  |- ...
 * |- sandboxes
 * |  |- 123.12.1.2
 * |  |  |- merge-1651413027
 * |  |  |- work-1651413027
 * |  |  |- layers
 * |  |     |- 1651413027
 * |  |     |- 1651401234
 * |  |- 127.0.0.1
 * |     |- ...
 *
 * defaultfs is the bottom lower layer of every sandbox: the filesystem
 * each sandbox starts from. A sandbox is identified by its key, the
 * attacker's source address in practice. Every session gets its own
 * merge-<t>/work-<t> pair and a fresh upper directory under layers/;
 * concurrent sessions of the same sandbox share the promoted layers
 * read-only but never an upper. */
pub struct OverlayFsManager {
    base_dir: PathBuf,
}

impl OverlayFsManager {
    /* Materialises the embedded default filesystem on first run and makes
     * sure the on-disk layout exists. Errors here are fatal: without the
     * template there is nothing to show an attacker. */
    pub fn init(base_dir: &Path, asset: &[AssetEntry]) -> Result<Self> {
        mkdir(base_dir, 0o755).context("can't make base dir")?;

        let default_fs_path = base_dir.join("defaultfs");
        if !dir_exists(&default_fs_path) {
            mkdir(&default_fs_path, 0o755)
                .context("can't make defaultfs dir")?;

            debug!(
                "Materialising default filesystem into {}",
                default_fs_path.display()
            );
            for entry in asset {
                let target = default_fs_path.join(entry.path);
                match entry.kind {
                    AssetKind::Dir => {
                        mkdir(&target, 0o755).context(format!(
                            "can't make defaultfs entry {}",
                            entry.path
                        ))?;
                    }
                    AssetKind::File(content) => {
                        fs::write(&target, content).context(format!(
                            "can't write defaultfs entry {}",
                            entry.path
                        ))?;
                        fs::set_permissions(
                            &target,
                            fs::Permissions::from_mode(entry.mode),
                        )
                        .context(format!(
                            "can't set mode on defaultfs entry {}",
                            entry.path
                        ))?;
                    }
                }
            }
        }

        mkdir(&base_dir.join("sandboxes"), 0o755)
            .context("can't make sandboxes dir")?;

        Ok(OverlayFsManager {
            base_dir: base_dir.to_path_buf(),
        })
    }

    pub fn default_fs_path(&self) -> PathBuf {
        self.base_dir.join("defaultfs")
    }

    /* Prepares an unmounted overlay session for the given sandbox. The
     * session key is the current unix time; if a session of this sandbox
     * already claimed that second, the key is bumped forward until it is
     * fresh, which keeps the layers directory strictly ordered by
     * creation. */
    pub fn new_session(&self, sandbox_key: &str) -> Result<OverlayFs> {
        check_sandbox_key(sandbox_key)?;

        let sandbox_path = self.base_dir.join("sandboxes").join(sandbox_key);
        mkdir(&sandbox_path, 0o755).context("make sandbox dir")?;

        let layers_path = sandbox_path.join("layers");
        mkdir(&layers_path, 0o755).context("make sandbox layers dir")?;

        let mut t = chrono::Utc::now().timestamp();
        while layers_path.join(t.to_string()).exists()
            || sandbox_path.join(format!("merge-{}", t)).exists()
            || sandbox_path.join(format!("work-{}", t)).exists()
        {
            t += 1;
        }

        let mut lower_keys: Vec<i64> = Vec::new();
        for entry in fs::read_dir(&layers_path).context("read layers dir")? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Ok(key) =
                entry.file_name().to_string_lossy().parse::<i64>()
            {
                lower_keys.push(key);
            }
        }
        lower_keys.sort_unstable();

        let mut lowers: Vec<PathBuf> = lower_keys
            .iter()
            .map(|key| layers_path.join(key.to_string()))
            .collect();
        lowers.push(self.default_fs_path());

        /* Claim the upper directory right away. A second session of the
         * same sandbox arriving within the same second then sees it and
         * bumps to a fresh key instead of sharing ours. */
        mkdir(&layers_path.join(t.to_string()), 0o700)
            .context("reserve upper layer dir")?;

        trace!(
            "New session {} for sandbox '{}' with {} promoted layer(s)",
            t,
            sandbox_key,
            lowers.len() - 1
        );

        Ok(OverlayFs {
            merged: sandbox_path.join(format!("merge-{}", t)),
            upper: layers_path.join(t.to_string()),
            work: sandbox_path.join(format!("work-{}", t)),
            lowers,
        })
    }
}
