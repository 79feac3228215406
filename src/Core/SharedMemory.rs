// Shared memory backend abstraction for Linux
// Named regions go through POSIX shm_open + mmap, anonymous regions through a
// MAP_SHARED | MAP_ANONYMOUS mapping that survives fork()

use std::fmt::Debug;
use std::io;

/// Shared memory backend trait for mapped regions
pub trait SharedMemoryBackend: Send + Sync + Debug {
    /// Get a pointer to the mapped memory region
    fn as_ptr(&self) -> *mut u8;

    /// Get the size of the mapped region in bytes
    fn size(&self) -> usize;

    /// Get the underlying handle
    fn raw_handle(&self) -> RawHandle;

    /// POSIX name of the region, `None` for anonymous mappings
    fn name(&self) -> Option<&str>;
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawHandle {
    /// Unix file descriptor returned by shm_open
    Fd(i32),
    /// Anonymous mapping, no descriptor
    Anonymous,
}

/// Longest POSIX shared memory name accepted (NAME_MAX).
pub const MAX_NAME_LEN: usize = 255;

/// Create (or open, if it already exists) a shared memory region and map it.
///
/// # Arguments
/// * `size` - Size of the shared memory region in bytes
/// * `name` - POSIX name (`/name`) for a named region, `None` for an anonymous
///   mapping that is shared with children created by `fork()`
///
/// # Returns
/// A boxed trait object implementing SharedMemoryBackend
#[cfg(target_os = "linux")]
pub fn create_shared_memory(
    size: usize,
    name: Option<&str>,
) -> io::Result<Box<dyn SharedMemoryBackend>> {
    if size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Shared memory size must be greater than zero",
        ));
    }
    match name {
        Some(name) => Ok(Box::new(LinuxSharedMemory::create_or_open(size, name)?)),
        None => Ok(Box::new(LinuxSharedMemory::anonymous(size)?)),
    }
}

/// Remove a named shared memory object.
///
/// Existing mappings stay valid; the object is released once the last one is
/// unmapped.
#[cfg(target_os = "linux")]
pub fn unlink_shared_memory(name: &str) -> io::Result<()> {
    let c_name = validate_name(name)?;
    if unsafe { libc::shm_unlink(c_name.as_ptr()) } != 0 {
        let err = io::Error::last_os_error();
        return Err(io::Error::new(
            err.kind(),
            format!("Failed to unlink shared memory {}: {}", name, err),
        ));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn create_shared_memory(
    _size: usize,
    _name: Option<&str>,
) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn unlink_shared_memory(_name: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

/// Checks a POSIX shared memory name: leading '/', no other '/', no NUL.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn validate_name(name: &str) -> io::Result<std::ffi::CString> {
    let invalid = |reason: &str| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid shared memory name {:?}: {}", name, reason),
        )
    };

    if !name.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if name.len() < 2 {
        return Err(invalid("must not be empty after '/'"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("longer than NAME_MAX"));
    }
    if name[1..].contains('/') {
        return Err(invalid("must not contain '/' after the first character"));
    }
    std::ffi::CString::new(name).map_err(|_| invalid("contains a NUL byte"))
}

#[cfg(target_os = "linux")]
use std::ptr::{self, NonNull};

#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct LinuxSharedMemory {
    ptr: NonNull<u8>,
    size: usize,
    fd: Option<i32>,
    name: Option<String>,
}

#[cfg(target_os = "linux")]
unsafe impl Send for LinuxSharedMemory {}
#[cfg(target_os = "linux")]
unsafe impl Sync for LinuxSharedMemory {}

#[cfg(target_os = "linux")]
impl LinuxSharedMemory {
    /// Create or open a named region in /dev/shm and size it to `size` bytes
    pub fn create_or_open(size: usize, name: &str) -> io::Result<Self> {
        let c_name = validate_name(name)?;

        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR,
                0o600 as libc::mode_t,
            )
        };
        if fd < 0 {
            let err = io::Error::last_os_error();
            return Err(io::Error::new(
                err.kind(),
                format!("Failed to open shared memory {}: {}", name, err),
            ));
        }

        // Set size
        if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(io::Error::new(
                err.kind(),
                format!("Failed to size shared memory {} to {} bytes: {}", name, size, err),
            ));
        }

        let ptr = match Self::map(size, libc::MAP_SHARED, fd) {
            Ok(ptr) => ptr,
            Err(err) => {
                unsafe { libc::close(fd) };
                return Err(io::Error::new(
                    err.kind(),
                    format!("Failed to map shared memory {}: {}", name, err),
                ));
            }
        };

        Ok(Self {
            ptr,
            size,
            fd: Some(fd),
            name: Some(name.to_owned()),
        })
    }

    /// Map an anonymous shared region; children created by fork() see the same pages
    pub fn anonymous(size: usize) -> io::Result<Self> {
        let ptr = Self::map(size, libc::MAP_SHARED | libc::MAP_ANONYMOUS, -1).map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Failed to map anonymous shared memory of {} bytes: {}", size, err),
            )
        })?;

        Ok(Self {
            ptr,
            size,
            fd: None,
            name: None,
        })
    }

    fn map(size: usize, flags: libc::c_int, fd: libc::c_int) -> io::Result<NonNull<u8>> {
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                flags,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        NonNull::new(ptr as *mut u8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned a null mapping"))
    }
}

#[cfg(target_os = "linux")]
impl Drop for LinuxSharedMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
            if let Some(fd) = self.fd {
                libc::close(fd);
            }
        }
    }
}

#[cfg(target_os = "linux")]
impl SharedMemoryBackend for LinuxSharedMemory {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn raw_handle(&self) -> RawHandle {
        match self.fd {
            Some(fd) => RawHandle::Fd(fd),
            None => RawHandle::Anonymous,
        }
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
