/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/shm/channel.rs
 *
 * This file implements the `SharedChannel`, the writer side of the named
 * POSIX shared-memory mailbox. It wraps the `shm_open` / `ftruncate` /
 * `mmap` / `shm_unlink` sequence behind a safe RAII type: the region is
 * created and zeroed on `open`, overwritten in place on every `write`, and
 * unmapped and unlinked on `close` (or on drop).
 *
 * There is no synchronization with readers. A reader mapping the same name
 * can observe a record while it is being overwritten; see `ChannelReader`.
 *
 * Dependencies:
 *   - libc: For the POSIX shared-memory and mmap calls.
 *   - log: For structured logging.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use super::record::MAX_RECORD_LEN;
use super::{ChannelError, Publisher};
use std::ffi::CString;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd};
use std::ptr::{self, NonNull};

/// Permission bits for a newly created object, before the umask.
const CHANNEL_MODE: libc::mode_t = 0o666;

/// The writer side of the shared-memory mailbox.
pub struct SharedChannel {
    name: String,
    c_name: CString,
    capacity: usize,
    region: Option<NonNull<u8>>,
    linked: bool,
}

impl SharedChannel {
    /// Creates (or attaches to) the named object, sizes it, maps it and
    /// zero-fills it.
    pub fn open(name: &str, capacity: usize) -> Result<Self, ChannelError> {
        let c_name = validate_name(name)?;
        if capacity <= MAX_RECORD_LEN {
            return Err(ChannelError::CapacityTooSmall {
                capacity,
                required: MAX_RECORD_LEN + 1,
            });
        }

        let raw_fd = unsafe {
            libc::shm_open(c_name.as_ptr(), libc::O_CREAT | libc::O_RDWR, CHANNEL_MODE)
        };
        if raw_fd < 0 {
            return Err(ChannelError::Create {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        // The mapping stays valid after the descriptor is closed.
        let fd = unsafe { OwnedFd::from_raw_fd(raw_fd) };

        let region = match map_region(&fd, capacity) {
            Ok(region) => region,
            Err(err) => {
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                return Err(err.into_channel_error(name));
            }
        };

        unsafe { ptr::write_bytes(region.as_ptr(), 0, capacity) };
        log::debug!("Shared memory '{}' mapped ({} bytes)", name, capacity);

        Ok(Self {
            name: name.to_string(),
            c_name,
            capacity,
            region: Some(region),
            linked: true,
        })
    }

    /// Copies `text` and a NUL terminator to the start of the region.
    ///
    /// Bytes after the terminator are left as they were.
    pub fn write(&mut self, text: &str) -> Result<(), ChannelError> {
        let bytes = text.as_bytes();
        if bytes.len() >= self.capacity {
            return Err(ChannelError::RecordTooLong {
                len: bytes.len(),
                capacity: self.capacity,
            });
        }
        let region = self.region.ok_or(ChannelError::Closed)?;

        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), region.as_ptr(), bytes.len());
            *region.as_ptr().add(bytes.len()) = 0;
        }
        Ok(())
    }

    /// A copy of the whole region.
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        let region = self.region?;
        let bytes = unsafe { std::slice::from_raw_parts(region.as_ptr(), self.capacity) };
        Some(bytes.to_vec())
    }

    /// The current record, up to the first NUL.
    pub fn record(&self) -> Option<String> {
        let snapshot = self.snapshot()?;
        let end = snapshot.iter().position(|&b| b == 0).unwrap_or(snapshot.len());
        Some(String::from_utf8_lossy(&snapshot[..end]).into_owned())
    }

    /// Unmaps the region and removes the name from the system namespace.
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(region) = self.region.take() {
            let rc = unsafe { libc::munmap(region.as_ptr().cast(), self.capacity) };
            if rc != 0 {
                log::warn!(
                    "munmap of '{}' failed: {}",
                    self.name,
                    io::Error::last_os_error()
                );
            }
        }

        if self.linked {
            self.linked = false;
            let rc = unsafe { libc::shm_unlink(self.c_name.as_ptr()) };
            if rc != 0 {
                log::warn!(
                    "shm_unlink of '{}' failed: {}",
                    self.name,
                    io::Error::last_os_error()
                );
            } else {
                log::debug!("Shared memory '{}' unlinked", self.name);
            }
        }
    }

    /// Name of the shared-memory object.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the region in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` until `close` has run.
    pub fn is_open(&self) -> bool {
        self.region.is_some()
    }
}

impl Publisher for SharedChannel {
    fn publish(&mut self, text: &str) -> Result<(), ChannelError> {
        self.write(text)
    }
}

impl Drop for SharedChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Checks a shared-memory object name and converts it for libc.
pub(crate) fn validate_name(name: &str) -> Result<CString, ChannelError> {
    let invalid = |reason: &str| ChannelError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let body = name.strip_prefix('/').unwrap_or(name);
    if body.is_empty() {
        return Err(invalid("name is empty"));
    }
    if body.contains('/') {
        return Err(invalid("name may only contain a leading '/'"));
    }
    CString::new(name).map_err(|_| invalid("name contains a NUL byte"))
}

enum MapFailure {
    Resize(io::Error),
    Map(io::Error),
}

impl MapFailure {
    fn into_channel_error(self, name: &str) -> ChannelError {
        match self {
            MapFailure::Resize(source) => ChannelError::Resize {
                name: name.to_string(),
                source,
            },
            MapFailure::Map(source) => ChannelError::Map {
                name: name.to_string(),
                source,
            },
        }
    }
}

fn map_region(fd: &OwnedFd, capacity: usize) -> Result<NonNull<u8>, MapFailure> {
    use std::os::fd::AsRawFd;

    let len = libc::off_t::try_from(capacity)
        .map_err(|_| MapFailure::Resize(io::Error::from(io::ErrorKind::InvalidInput)))?;
    if unsafe { libc::ftruncate(fd.as_raw_fd(), len) } != 0 {
        return Err(MapFailure::Resize(io::Error::last_os_error()));
    }

    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            capacity,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd.as_raw_fd(),
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(MapFailure::Map(io::Error::last_os_error()));
    }
    NonNull::new(addr.cast::<u8>()).ok_or_else(|| MapFailure::Map(io::Error::last_os_error()))
}
