use crate::error::{Error, Result};
use libc::{
    c_void, mmap, msync, munmap, MAP_FAILED, MAP_SHARED, MS_SYNC, PROT_READ, PROT_WRITE,
};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, IntoRawFd};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::slice;

/// MmapFile maps the whole content of a file into memory.
///
/// The mapping is shared with the file, so every store into the
/// mapped bytes is visible to other views of the same mapping
/// immediately, and reaches the file after `flush()`.
///
/// The file handle and the mapping are owned exclusively.
/// `close()` is the explicit release path which reports errors.
/// Dropping without close performs the same steps and only logs
/// failures.
pub struct MmapFile {
    path: PathBuf,
    // None after the file handle is released.
    file: Option<File>,
    // None if the file is empty, nothing is mapped in that case.
    ptr: Option<NonNull<u8>>,
    len: usize,
    writable: bool,
}

// The mapping is exclusively owned, and all mutable access goes
// through &mut self.
unsafe impl Send for MmapFile {}
unsafe impl Sync for MmapFile {}

impl MmapFile {
    /// Create a file of exactly `size` zero bytes and map it writable.
    /// Existing content at the path is destroyed.
    #[inline]
    pub fn create<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;
        file.set_len(size as u64)?;
        debug!("created {:?} with {} bytes", path, size);
        Self::map(path, file, size, true)
    }

    /// Open an existing file and map it with requested mutability.
    /// The file is never resized.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P, writable: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let size = file.metadata()?.len();
        let size = usize::try_from(size)
            .map_err(|_| Error::InvalidArgument(format!("file size {} too large", size)))?;
        debug!("opened {:?} with {} bytes, writable={}", path, size, writable);
        Self::map(path, file, size, writable)
    }

    fn map(path: &Path, file: File, len: usize, writable: bool) -> Result<Self> {
        let ptr = if len == 0 {
            None
        } else {
            let prot = if writable {
                PROT_READ | PROT_WRITE
            } else {
                PROT_READ
            };
            // SAFETY:
            //
            // The file descriptor is valid and open during the call,
            // and the length matches current file size.
            let addr = unsafe {
                mmap(
                    std::ptr::null_mut(),
                    len,
                    prot,
                    MAP_SHARED,
                    file.as_raw_fd(),
                    0,
                )
            };
            if addr == MAP_FAILED {
                return Err(Error::Map {
                    len,
                    source: io::Error::last_os_error(),
                });
            }
            NonNull::new(addr as *mut u8)
        };
        Ok(MmapFile {
            path: path.to_path_buf(),
            file: Some(file),
            ptr,
            len,
            writable,
        })
    }

    /// Returns path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns number of mapped bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Returns the mapped bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self.ptr {
            // SAFETY:
            //
            // The region of len bytes stays mapped until self is dropped or closed.
            Some(ptr) => unsafe { slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }

    /// Returns the mapped bytes for mutation.
    /// Fails if the mapping is read-only.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8]> {
        if !self.writable {
            return Err(Error::ReadOnly);
        }
        match self.ptr {
            // SAFETY:
            //
            // Region is mapped with PROT_WRITE and exclusively borrowed.
            Some(ptr) => Ok(unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), self.len) }),
            None => Ok(&mut [][..]),
        }
    }

    /// Write all modified pages back to the file.
    /// The mapping is kept.
    #[inline]
    pub fn flush(&self) -> Result<()> {
        match self.ptr {
            Some(ptr) if self.writable => {
                // SAFETY:
                //
                // The address and length are exactly what mmap returned.
                let res = unsafe { msync(ptr.as_ptr() as *mut c_void, self.len, MS_SYNC) };
                if res != 0 {
                    return Err(Error::Flush(io::Error::last_os_error()));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Flush, unmap and close the file.
    ///
    /// All three steps are always attempted. The first failure is
    /// returned and the others are logged.
    #[inline]
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let mut res = Ok(());
        if let Err(e) = self.flush() {
            warn!("error flushing {:?}: {}", self.path, e);
            res = Err(e);
        }
        if let Err(e) = self.unmap() {
            warn!("error unmapping {:?}: {}", self.path, e);
            if res.is_ok() {
                res = Err(e);
            }
        }
        if let Some(file) = self.file.take() {
            // std::fs::File ignores error on drop, so close the raw
            // descriptor to observe it.
            let fd = file.into_raw_fd();
            // SAFETY:
            //
            // The descriptor is owned and closed exactly once.
            if unsafe { libc::close(fd) } != 0 {
                let e = Error::CloseFile(io::Error::last_os_error());
                warn!("error closing {:?}: {}", self.path, e);
                if res.is_ok() {
                    res = Err(e);
                }
            }
        }
        res
    }

    fn unmap(&mut self) -> Result<()> {
        if let Some(ptr) = self.ptr.take() {
            let len = std::mem::take(&mut self.len);
            // SAFETY:
            //
            // The address and length are exactly what mmap returned, and
            // no reference into the region can outlive &mut self.
            let res = unsafe { munmap(ptr.as_ptr() as *mut c_void, len) };
            if res != 0 {
                return Err(Error::Unmap(io::Error::last_os_error()));
            }
        }
        Ok(())
    }
}

impl Drop for MmapFile {
    #[inline]
    fn drop(&mut self) {
        // errors are already logged.
        let _ = self.release();
    }
}
