use std::path::PathBuf;

/* One session's worth of overlay state. Created unmounted by the manager;
 * `mount` makes `merged` live, `close` tears everything down except
 * `upper`, which stays behind in the sandbox's layers directory and
 * becomes a lower layer for the sandbox's next session. */
pub struct OverlayFs {
    // Where the merged view is mounted while the session runs
    pub merged: PathBuf,
    // This session's private copy-on-write delta
    pub upper: PathBuf,
    // Scratch space the kernel needs alongside upper
    pub work: PathBuf,
    // Read-only inputs, oldest promoted layer first, defaultfs last
    pub lowers: Vec<PathBuf>,
}
