use memmap2::Mmap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::error::DiffError;

const MMAP_THRESHOLD: u64 = 32 * 1024;
const RAYON_THRESHOLD: u64 = 128 * 1024 * 1024;

pub fn file_digest(path: &Path) -> io::Result<(u64, blake3::Hash)> {
    let len = fs::metadata(path)?.len();
    let mut hasher = blake3::Hasher::new();

    if len == 0 {
        return Ok((0, hasher.finalize()));
    }

    if len < MMAP_THRESHOLD {
        hasher.update(&fs::read(path)?);
    } else {
        let f = File::open(path)?;
        let mmap = unsafe { Mmap::map(&f)? };
        if len > RAYON_THRESHOLD {
            hasher.update_rayon(&mmap);
        } else {
            hasher.update(&mmap);
        }
    }

    Ok((len, hasher.finalize()))
}

/// True when both files have the same length and BLAKE3 digest.
pub fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    let (h1, h2) = rayon::join(|| file_digest(a), || file_digest(b));
    Ok(h1? == h2?)
}

/// A root must be a directory we can both list and traverse.
pub fn check_root_dir(dir: &Path) -> Result<(), DiffError> {
    if !dir.is_dir() {
        return Err(DiffError::NotADirectory(dir.to_path_buf()));
    }
    if !can_list_and_search(dir) {
        return Err(DiffError::Inaccessible(dir.to_path_buf()));
    }
    Ok(())
}

#[cfg(unix)]
fn can_list_and_search(dir: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(cpath) = CString::new(dir.as_os_str().as_bytes()) else {
        return false;
    };
    #[allow(unsafe_code)]
    unsafe {
        libc::access(cpath.as_ptr(), libc::R_OK | libc::X_OK) == 0
    }
}

#[cfg(not(unix))]
fn can_list_and_search(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok()
}
