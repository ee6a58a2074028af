//! Filesystem usage of the downloads directory

use crate::error::{Error, Result};
use std::path::Path;

const GIB: u64 = 1024 * 1024 * 1024;

/// Filesystem statistics in bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskUsage {
    /// Size of the filesystem
    pub total: u64,
    /// Bytes in use (total minus free blocks, including root-reserved ones)
    pub used: u64,
    /// Bytes available to unprivileged users
    pub available: u64,
}

impl DiskUsage {
    /// Used space in whole GiB
    pub fn used_gib(&self) -> u64 {
        self.used / GIB
    }

    /// Total space in whole GiB
    pub fn total_gib(&self) -> u64 {
        self.total / GIB
    }
}

/// Query the filesystem that holds `path`
///
/// Uses `statvfs` on unix and `GetDiskFreeSpaceExW` on Windows.
///
/// # Errors
/// The path does not exist, or the platform call failed
pub fn usage(path: &Path) -> Result<DiskUsage> {
    query(path).map_err(|e| Error::DiskUsage {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(unix)]
fn query(path: &Path) -> std::io::Result<DiskUsage> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // SAFETY: c_path is a valid NUL-terminated string, stat is zero-initialised
    // and only read after statvfs reports success.
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        // f_frsize is the fundamental block size all counts are expressed in
        #[allow(clippy::unnecessary_cast)]
        let frsize = stat.f_frsize as u64;
        #[allow(clippy::unnecessary_cast)]
        let (blocks, bfree, bavail) = (stat.f_blocks as u64, stat.f_bfree as u64, stat.f_bavail as u64);

        Ok(DiskUsage {
            total: blocks.saturating_mul(frsize),
            used: blocks.saturating_sub(bfree).saturating_mul(frsize),
            available: bavail.saturating_mul(frsize),
        })
    }
}

#[cfg(windows)]
fn query(path: &Path) -> std::io::Result<DiskUsage> {
    use std::os::windows::ffi::OsStrExt;
    use winapi::um::fileapi::GetDiskFreeSpaceExW;

    let wide_path: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    // SAFETY: wide_path is NUL-terminated and every out pointer refers to a
    // live, aligned u64 that is only read after the call succeeds.
    unsafe {
        let mut available: u64 = 0;
        let mut total: u64 = 0;
        let mut free: u64 = 0;

        if GetDiskFreeSpaceExW(
            wide_path.as_ptr(),
            &mut available as *mut u64 as *mut _,
            &mut total as *mut u64 as *mut _,
            &mut free as *mut u64 as *mut _,
        ) == 0
        {
            return Err(std::io::Error::last_os_error());
        }

        Ok(DiskUsage {
            total,
            used: total.saturating_sub(free),
            available,
        })
    }
}

#[cfg(not(any(unix, windows)))]
fn query(_path: &Path) -> std::io::Result<DiskUsage> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "disk usage is not supported on this platform",
    ))
}
