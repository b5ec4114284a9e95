use std::ffi::CString;
use std::os::fd::RawFd;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::error::{Result, TransportError};

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// A fixed-size POSIX shared memory block.
///
/// The block is a raw byte buffer with no built-in synchronization: nothing
/// stops two processes from writing at the same time, or a reader from
/// observing a half-written block. Callers coordinate access themselves.
///
/// A block created with [`SharedMemoryBlock::create`] owns the OS object and
/// removes it on drop unless it was already unlinked. A block attached with
/// [`SharedMemoryBlock::open`] only unmaps on drop.
pub struct SharedMemoryBlock {
    ptr: NonNull<u8>,
    capacity: usize,
    fd: RawFd,
    os_name: String,
    /// Whether the OS object should be removed on drop.
    cleanup_on_drop: bool,
    unlinked: bool,
}

// SAFETY: the mapping is process-wide and the block owns its fd; moving the
// handle to another thread does not invalidate either. The type is not `Sync`,
// so in-process access is serialized by whoever holds it.
unsafe impl Send for SharedMemoryBlock {}

impl SharedMemoryBlock {
    /// Permission mode for created shared memory objects.
    pub const DEFAULT_MODE: u32 = 0o600;

    /// Create a new zero-filled block of `capacity` bytes under a fresh name.
    pub fn create(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TransportError::InvalidSize(capacity));
        }

        let os_name = format!(
            "/ipcseal-{}-{}",
            std::process::id(),
            NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed)
        );
        let c_name = c_name(&os_name)?;

        let fd = shm_open(&c_name, libc::O_CREAT | libc::O_EXCL | libc::O_RDWR).map_err(
            |source| TransportError::ShmCreate {
                name: os_name.clone(),
                source,
            },
        )?;

        // SAFETY: `fd` was just opened read-write by shm_open.
        if unsafe { libc::ftruncate(fd, capacity as libc::off_t) } != 0 {
            let source = std::io::Error::last_os_error();
            discard(fd, &c_name);
            return Err(TransportError::ShmCreate {
                name: os_name,
                source,
            });
        }

        let ptr = match map(fd, capacity) {
            Ok(ptr) => ptr,
            Err(source) => {
                discard(fd, &c_name);
                return Err(TransportError::ShmCreate {
                    name: os_name,
                    source,
                });
            }
        };

        info!(name = %os_name, capacity, "created shared memory block");

        Ok(Self {
            ptr,
            capacity,
            fd,
            os_name,
            cleanup_on_drop: true,
            unlinked: false,
        })
    }

    /// Attach to a block created elsewhere, usually by another process.
    pub fn open(os_name: &str, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TransportError::InvalidSize(capacity));
        }

        let c_name = c_name(os_name)?;
        let fd = shm_open(&c_name, libc::O_RDWR).map_err(|source| TransportError::ShmOpen {
            name: os_name.to_string(),
            source,
        })?;

        let actual = match object_size(fd) {
            Ok(actual) => actual,
            Err(source) => {
                close(fd);
                return Err(TransportError::ShmOpen {
                    name: os_name.to_string(),
                    source,
                });
            }
        };
        if actual < capacity {
            close(fd);
            return Err(TransportError::ShmTooSmall {
                name: os_name.to_string(),
                actual,
                expected: capacity,
            });
        }

        let ptr = map(fd, capacity).map_err(|source| {
            close(fd);
            TransportError::ShmOpen {
                name: os_name.to_string(),
                source,
            }
        })?;

        debug!(name = %os_name, capacity, "attached shared memory block");

        Ok(Self {
            ptr,
            capacity,
            fd,
            os_name: os_name.to_string(),
            cleanup_on_drop: false,
            unlinked: false,
        })
    }

    /// Fixed capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// OS-level object name, for handing to [`SharedMemoryBlock::open`] in a peer.
    pub fn os_name(&self) -> &str {
        &self.os_name
    }

    /// Whether the OS object has been removed through this handle.
    pub fn is_unlinked(&self) -> bool {
        self.unlinked
    }

    /// Zero the entire block, then copy `data` to offset 0.
    ///
    /// Fails with [`TransportError::BlockOverflow`] before touching the block
    /// when `data` does not fit.
    pub fn write_zero_padded(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.capacity {
            return Err(TransportError::BlockOverflow {
                size: data.len(),
                capacity: self.capacity,
            });
        }

        let block = self.as_mut_slice();
        block.fill(0);
        block[..data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Bytes from offset 0 up to, not including, the first zero byte.
    pub fn read_until_nul(&self) -> Vec<u8> {
        let block = self.as_slice();
        let end = block.iter().position(|&b| b == 0).unwrap_or(block.len());
        block[..end].to_vec()
    }

    /// Copy of the whole block, padding included.
    pub fn snapshot(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Remove the OS object. The mapping stays valid until this handle drops.
    ///
    /// Idempotent: a second call is a no-op.
    pub fn unlink(&mut self) -> Result<()> {
        if self.unlinked {
            return Ok(());
        }
        self.unlinked = true;

        let c_name = c_name(&self.os_name)?;
        // SAFETY: `c_name` is a valid NUL-terminated string.
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } != 0 {
            return Err(TransportError::ShmUnlink {
                name: self.os_name.clone(),
                source: std::io::Error::last_os_error(),
            });
        }

        info!(name = %self.os_name, "unlinked shared memory block");
        Ok(())
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` maps `capacity` readable bytes for the lifetime of self.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: `ptr` maps `capacity` writable bytes and `&mut self` rules out
        // any other in-process borrow of the mapping.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) }
    }
}

impl Drop for SharedMemoryBlock {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`capacity` describe the mapping created in `map`, and
        // `fd` is owned by this handle.
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast::<libc::c_void>(), self.capacity);
            libc::close(self.fd);
        }

        if self.cleanup_on_drop && !self.unlinked {
            if let Ok(c_name) = CString::new(self.os_name.as_str()) {
                debug!(name = %self.os_name, "removing shared memory block on drop");
                // SAFETY: `c_name` is a valid NUL-terminated string.
                let _ = unsafe { libc::shm_unlink(c_name.as_ptr()) };
            }
        }
    }
}

impl std::fmt::Debug for SharedMemoryBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMemoryBlock")
            .field("os_name", &self.os_name)
            .field("capacity", &self.capacity)
            .field("unlinked", &self.unlinked)
            .finish()
    }
}

fn c_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| {
        TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "shared memory name contains a NUL byte",
        ))
    })
}

fn shm_open(name: &CString, flags: libc::c_int) -> std::io::Result<RawFd> {
    // SAFETY: `name` is a valid NUL-terminated string.
    #[cfg(target_os = "linux")]
    let fd = unsafe {
        libc::shm_open(
            name.as_ptr(),
            flags,
            SharedMemoryBlock::DEFAULT_MODE as libc::mode_t,
        )
    };
    // SAFETY: as above; the mode is passed as a promoted variadic argument.
    #[cfg(not(target_os = "linux"))]
    let fd = unsafe {
        libc::shm_open(
            name.as_ptr(),
            flags,
            SharedMemoryBlock::DEFAULT_MODE as libc::c_uint,
        )
    };

    if fd < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(fd)
    }
}

fn map(fd: RawFd, len: usize) -> std::io::Result<NonNull<u8>> {
    // SAFETY: mapping a shared, read-write region of an fd we own; the result
    // is checked against MAP_FAILED before use.
    let raw = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if raw == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error());
    }
    NonNull::new(raw.cast::<u8>())
        .ok_or_else(|| std::io::Error::other("mmap returned a null mapping"))
}

fn object_size(fd: RawFd) -> std::io::Result<usize> {
    // SAFETY: `stat` is plain old data and fully written by a successful fstat.
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    // SAFETY: `fd` is open and `stat` is a valid writable pointer.
    if unsafe { libc::fstat(fd, &mut stat) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(stat.st_size as usize)
}

fn close(fd: RawFd) {
    // SAFETY: `fd` is owned by the caller and not used afterwards.
    unsafe {
        libc::close(fd);
    }
}

fn discard(fd: RawFd, name: &CString) {
    close(fd);
    // SAFETY: `name` is a valid NUL-terminated string.
    unsafe {
        libc::shm_unlink(name.as_ptr());
    }
}
