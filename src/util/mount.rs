use anyhow::{Context, Result, anyhow};
use nix::mount::MsFlags;
use std::ffi::{CStr, CString};
use std::path::Path;

/* Mounts an overlay filesystem at `merged`. `data` carries the usual
 * lowerdir/upperdir/workdir triple. */
pub fn mount_overlay(merged: &Path, data: &str) -> Result<()> {
    let target = CString::new(merged.to_string_lossy().as_bytes())?;
    let fstype = CString::new("overlay")?;
    let source = CString::new("overlay")?;
    let data_cstr = CString::new(data.as_bytes())?;

    let result = nix::mount::mount::<CStr, CStr, CStr, CStr>(
        Some(source.as_c_str()),
        target.as_c_str(),
        Some(fstype.as_c_str()),
        MsFlags::empty(),
        Some(data_cstr.as_c_str()),
    );

    if let Err(e) = result {
        let err_context = format!(
            "failed to mount overlay at {} [data={}]",
            merged.display(),
            data
        );

        /* The kernel caps the number of lower layers (and the total length
         * of the options page). A long-lived sandbox accumulates one layer
         * per session, so this is the error an operator will eventually
         * see for a very persistent attacker. */
        if e == nix::errno::Errno::EINVAL {
            return Err(anyhow!(
                "Overlay mount rejected by the kernel. This usually means \
                the lower layer stack grew past the kernel's limit or a \
                layer path contains characters the mount options cannot \
                carry."
            ))
            .context(err_context);
        }

        return Err(e).context(err_context);
    }

    Ok(())
}

pub fn unmount(merged: &Path) -> Result<()> {
    let target = CString::new(merged.to_string_lossy().as_bytes())?;
    nix::mount::umount(target.as_c_str())
        .context(format!("failed to unmount {}", merged.display()))?;
    Ok(())
}

/* Sandbox keys end up inside the overlay mount option string, so they are
 * restricted to characters that cannot break the option syntax. IPv4
 * source addresses, the usual keys, always pass. */
pub fn check_sandbox_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(anyhow!("Sandbox key is empty"));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(anyhow!("Sandbox key {} contains invalid character", key));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_sandbox_key() {
        assert!(check_sandbox_key("10.0.0.1").is_ok());
        assert!(check_sandbox_key("host-1_test.example").is_ok());
    }

    #[test]
    fn test_check_sandbox_key_empty() {
        assert!(check_sandbox_key("").is_err());
    }

    #[test]
    fn test_check_sandbox_key_invalid_characters() {
        // colons (IPv6) and commas would corrupt the lowerdir option
        assert!(check_sandbox_key("fe80::1").is_err());
        assert!(check_sandbox_key("a,b").is_err());
        assert!(check_sandbox_key("../escape").is_err());
        assert!(check_sandbox_key("with space").is_err());
    }
}
