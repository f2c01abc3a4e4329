use crate::overlay::OverlayFs;
use crate::util::{mkdir, mount_overlay};
use anyhow::{Context, Result};
use log::trace;

impl OverlayFs {
    /* Mounts the merged view. The manager hands us the lower list oldest
     * first; the kernel wants the top of the stack first, so the promoted
     * layers are reversed here and defaultfs stays at the bottom. A newer
     * session's changes therefore shadow an older session's, and every
     * session shadows the template. */
    pub fn mount(&self) -> Result<()> {
        mkdir(&self.merged, 0o700).context("mkdir merged")?;
        mkdir(&self.work, 0o700).context("mkdir workdir")?;
        mkdir(&self.upper, 0o700).context("mkdir upper")?;

        // lowers is [oldest, ..., newest, defaultfs]
        let (template, promoted) = self
            .lowers
            .split_last()
            .context("lower list is empty")?;
        let lowerdir = promoted
            .iter()
            .rev()
            .chain(std::iter::once(template))
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(":");

        let data = format!(
            "lowerdir={},upperdir={},workdir={}",
            lowerdir,
            self.upper.display(),
            self.work.display()
        );

        trace!("Mounting overlay at {}", self.merged.display());
        mount_overlay(&self.merged, &data).context("mount")?;

        Ok(())
    }
}
