/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/shm/mod.rs
 *
 * The shared-memory mailbox that carries the latest orientation to other
 * processes on the host: one named POSIX object, one writer (this daemon),
 * any number of readers, and a single fixed-width text record.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

//! # Shared Memory Channel

/// The writer side: create, write, close.
pub mod channel;
/// Read-only consumer mapping.
pub mod reader;
/// Record text format.
pub mod record;

pub use channel::SharedChannel;
pub use reader::ChannelReader;

use thiserror::Error;

/// Errors raised while setting up or writing the channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The object name cannot be used with `shm_open`.
    #[error("Invalid shared memory name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested capacity cannot hold a full record and its terminator.
    #[error("Channel capacity {capacity} is too small (need at least {required} bytes)")]
    CapacityTooSmall {
        /// Requested capacity.
        capacity: usize,
        /// Minimum capacity.
        required: usize,
    },

    /// `shm_open` failed.
    #[error("Failed to open shared memory '{name}': {source}")]
    Create {
        /// Object name.
        name: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// `ftruncate` failed.
    #[error("Failed to size shared memory '{name}': {source}")]
    Resize {
        /// Object name.
        name: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// `mmap` failed.
    #[error("Failed to map shared memory '{name}': {source}")]
    Map {
        /// Object name.
        name: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// A reader asked to map more bytes than the object holds.
    #[error("Shared memory '{name}' is {size} bytes, cannot map {capacity}")]
    ObjectTooSmall {
        /// Object name.
        name: String,
        /// Requested mapping length.
        capacity: usize,
        /// Actual object size.
        size: usize,
    },

    /// A record longer than the region was offered.
    #[error("Record of {len} bytes does not fit a {capacity}-byte channel")]
    RecordTooLong {
        /// Record length without terminator.
        len: usize,
        /// Channel capacity.
        capacity: usize,
    },

    /// The channel was already closed.
    #[error("Channel is closed")]
    Closed,
}

/// Destination for formatted records.
pub trait Publisher {
    /// Replaces the current record with `text`.
    fn publish(&mut self, text: &str) -> Result<(), ChannelError>;
}
