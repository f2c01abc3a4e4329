use crate::overlay::OverlayFs;
use crate::util::unmount;
use anyhow::{Context, Result};
use log::trace;
use std::fs;

impl OverlayFs {
    /* Unmounts the merged view and removes the session-scoped directories.
     * `upper` is deliberately left behind: it now lives in the sandbox's
     * layers directory and is a lower layer for the sandbox's future
     * sessions. */
    pub fn close(&self) -> Result<()> {
        trace!("Closing overlay at {}", self.merged.display());

        unmount(&self.merged).context("unmount")?;

        fs::remove_dir(&self.merged).context(format!(
            "remove merged dir {}",
            self.merged.display()
        ))?;

        fs::remove_dir_all(&self.work).context(format!(
            "remove work dir {}",
            self.work.display()
        ))?;

        Ok(())
    }
}
