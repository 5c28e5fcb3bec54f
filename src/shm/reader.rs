/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/shm/reader.rs
 *
 * Read-only consumer view of the shared-memory mailbox. Other processes that
 * want the latest orientation attach to the channel name with
 * `ChannelReader::attach` and call `latest()`.
 *
 * Torn reads: the publisher overwrites the record in place with no lock,
 * sequence number or flag. A read that overlaps a write can return a mix of
 * two consecutive records. `latest()` parses by fixed column and rejects
 * anything malformed, but a torn record whose columns happen to parse is
 * indistinguishable from a real one. Consumers that need consistency should
 * read twice and compare.
 *
 * Dependencies:
 *   - libc: For `shm_open` and `mmap`.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use super::channel::validate_name;
use super::record::parse_record;
use super::ChannelError;
use crate::sensors::OrientationSample;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::{self, NonNull};

/// A read-only mapping of an existing channel.
pub struct ChannelReader {
    region: NonNull<u8>,
    capacity: usize,
}

impl ChannelReader {
    /// Maps an existing channel read-only. Never creates the object.
    pub fn attach(name: &str, capacity: usize) -> Result<Self, ChannelError> {
        let c_name = validate_name(name)?;

        let raw_fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };
        if raw_fd < 0 {
            return Err(ChannelError::Create {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw_fd) };

        // Touching mapped pages past the end of the object raises SIGBUS.
        let size = object_size(&fd).map_err(|source| ChannelError::Map {
            name: name.to_string(),
            source,
        })?;
        if capacity == 0 || capacity > size {
            return Err(ChannelError::ObjectTooSmall {
                name: name.to_string(),
                capacity,
                size,
            });
        }

        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                capacity,
                libc::PROT_READ,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(ChannelError::Map {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        let region = NonNull::new(addr.cast::<u8>()).ok_or_else(|| ChannelError::Map {
            name: name.to_string(),
            source: io::Error::from(io::ErrorKind::InvalidData),
        })?;

        Ok(Self { region, capacity })
    }

    /// Copies the current record text, up to the first NUL.
    pub fn read_text(&self) -> String {
        let bytes = unsafe { std::slice::from_raw_parts(self.region.as_ptr(), self.capacity) };
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    /// The latest published sample, or `None` before the first reading.
    pub fn latest(&self) -> Option<OrientationSample> {
        parse_record(&self.read_text())
    }
}

fn object_size(fd: &OwnedFd) -> io::Result<usize> {
    let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fd.as_raw_fd(), stat.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let stat = unsafe { stat.assume_init() };
    usize::try_from(stat.st_size).map_err(|_| io::Error::from(io::ErrorKind::InvalidData))
}

impl Drop for ChannelReader {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.region.as_ptr().cast(), self.capacity) };
    }
}

#[cfg(test)]
mod tests {
    use super::super::channel::tests::{name_exists, unique_name};
    use super::super::SharedChannel;
    use super::*;

    #[test]
    fn test_reader_sees_writer_updates() {
        let name = unique_name("reader");
        let mut writer = SharedChannel::open(&name, 50).unwrap();
        let reader = ChannelReader::attach(&name, 50).unwrap();

        assert_eq!(reader.latest(), None);

        writer.write("  12.34   -5.67  180.00\n").unwrap();
        assert_eq!(
            reader.latest(),
            Some(OrientationSample { yaw: 12.34, pitch: -5.67, roll: 180.0 })
        );

        writer.write("   0.00    0.00    0.00\n").unwrap();
        assert_eq!(reader.read_text(), "   0.00    0.00    0.00\n");
    }

    #[test]
    fn test_attach_rejects_capacity_beyond_object() {
        let name = unique_name("oversize");
        let _writer = SharedChannel::open(&name, 50).unwrap();

        match ChannelReader::attach(&name, 12288) {
            Err(ChannelError::ObjectTooSmall { capacity, size, .. }) => {
                assert_eq!(capacity, 12288);
                assert_eq!(size, 50);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("oversized mapping should be rejected"),
        }

        // A shorter view of the same object is fine.
        assert!(ChannelReader::attach(&name, 24).is_ok());
    }

    #[test]
    fn test_attach_never_creates() {
        let name = unique_name("absent");
        assert!(ChannelReader::attach(&name, 50).is_err());
        assert!(!name_exists(&name));
    }
}
