/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/sensors/mod.rs
 *
 * This module is the Rust interface to the motion sensor. It defines the
 * black-box device contract (`DmpDevice`) exposed by the MPU6050/DMP library,
 * the capability interface the acquisition loop polls (`FifoSource`), and the
 * shared data types that flow between them.
 *
 * The main components are:
 * - `ffi`: Runtime-loaded bindings to the C device library.
 * - `dmp_math`: Quaternion -> gravity -> yaw/pitch/roll conversion.
 * - `session`: The `SensorSession`, which owns the device and its readiness.
 *
 * Dependencies:
 *   - thiserror: For ergonomic error handling.
 *   - libloading: For loading the device library (see `ffi`).
 *   - nalgebra: For quaternion and vector math (see `dmp_math`).
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

//! # Sensor Subsystem
//!
//! Device contract, readiness tracking and DMP packet conversion.

/// Runtime-loaded bindings to the MPU6050 DMP device library.
pub mod ffi;
/// Pure conversion math from raw DMP packets to Euler angles.
pub mod dmp_math;
/// The long-lived sensor session owned by the acquisition loop.
pub mod session;

use std::fmt;
use thiserror::Error;

/// Size of the scratch buffer a single FIFO packet is drained into.
pub const FIFO_BUFFER_LEN: usize = 64;

/// Orientation angles in radians, as produced by the DMP conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawPitchRoll {
    /// Rotation about the Z axis.
    pub yaw: f32,
    /// Nose up/down, about the Y axis.
    pub pitch: f32,
    /// Tilt left/right, about the X axis.
    pub roll: f32,
}

/// A single orientation reading in degrees, ready to be published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Roll in degrees.
    pub roll: f32,
}

impl From<YawPitchRoll> for OrientationSample {
    fn from(ypr: YawPitchRoll) -> Self {
        Self {
            yaw: ypr.yaw.to_degrees(),
            pitch: ypr.pitch.to_degrees(),
            roll: ypr.roll.to_degrees(),
        }
    }
}

/// Result of loading the DMP firmware, as reported by `dmpInitialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmpStatus {
    /// The firmware loaded and the DMP is configured.
    Ok,
    /// Code 1: the initial firmware memory load failed.
    MemoryLoadFailed,
    /// Code 2: the DMP configuration updates failed.
    ConfigUpdateFailed,
    /// Any other non-zero code.
    Unknown(u8),
}

impl DmpStatus {
    /// The raw device status code.
    pub fn code(self) -> u8 {
        match self {
            DmpStatus::Ok => 0,
            DmpStatus::MemoryLoadFailed => 1,
            DmpStatus::ConfigUpdateFailed => 2,
            DmpStatus::Unknown(code) => code,
        }
    }
}

impl From<u8> for DmpStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => DmpStatus::Ok,
            1 => DmpStatus::MemoryLoadFailed,
            2 => DmpStatus::ConfigUpdateFailed,
            other => DmpStatus::Unknown(other),
        }
    }
}

impl fmt::Display for DmpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmpStatus::Ok => write!(f, "ok (code 0)"),
            DmpStatus::MemoryLoadFailed => write!(f, "initial memory load failed (code 1)"),
            DmpStatus::ConfigUpdateFailed => {
                write!(f, "DMP configuration updates failed (code 2)")
            }
            DmpStatus::Unknown(code) => write!(f, "unknown device status (code {})", code),
        }
    }
}

/// The primary error type for the sensor subsystem.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The device library could not be loaded.
    #[error("Failed to load device library from '{path}': {source}")]
    LibraryLoad {
        /// Path that was attempted.
        path: String,
        /// The loader error.
        #[source]
        source: libloading::Error,
    },

    /// A required symbol is missing from the device library.
    #[error("Symbol '{symbol}' not found in device library '{path}': {source}")]
    SymbolNotFound {
        /// Path of the loaded library.
        path: String,
        /// The missing symbol.
        symbol: String,
        /// The loader error.
        #[source]
        source: libloading::Error,
    },

    /// `dmpInitialize` returned a non-zero status.
    #[error("DMP initialization failed: {0}")]
    DmpInit(DmpStatus),

    /// The device reported a packet size the drain buffer cannot hold.
    #[error("Unsupported DMP packet size {size} (must be {min}..={max})")]
    UnsupportedPacketSize {
        /// Reported packet size.
        size: u16,
        /// Smallest size that still carries a quaternion.
        min: usize,
        /// Largest size the drain buffer holds.
        max: usize,
    },
}

/// The raw device contract exposed by the MPU6050 DMP library.
///
/// Mirrors the library's calls one to one. None of them can fail at this
/// level; failures surface only through `dmp_initialize`'s status.
pub trait DmpDevice {
    /// Powers up the device and applies its default configuration.
    fn initialize(&mut self);
    /// Checks the WHO_AM_I register.
    fn test_connection(&mut self) -> bool;
    /// Uploads the DMP firmware and configuration.
    fn dmp_initialize(&mut self) -> DmpStatus;
    /// Turns the DMP on or off.
    fn set_dmp_enabled(&mut self, enabled: bool);
    /// Reads the interrupt status register.
    fn int_status(&mut self) -> u8;
    /// Size of one DMP packet in bytes.
    fn dmp_packet_size(&mut self) -> u16;
    /// Number of bytes currently buffered in the FIFO.
    fn fifo_count(&mut self) -> u16;
    /// Reads `buf.len()` bytes from the FIFO.
    fn fifo_bytes(&mut self, buf: &mut [u8]);
    /// Discards everything in the FIFO.
    fn reset_fifo(&mut self);
}

/// The capability interface the acquisition loop polls.
pub trait FifoSource {
    /// `true` once the DMP is loaded and enabled.
    fn is_ready(&self) -> bool;
    /// Expected packet size in bytes.
    fn packet_size(&self) -> usize;
    /// Current FIFO fill level in bytes.
    fn fifo_count(&mut self) -> u16;
    /// Reads exactly one packet into the head of `buf`.
    ///
    /// The caller must have checked `fifo_count() >= packet_size()`.
    fn drain_packet(&mut self, buf: &mut [u8; FIFO_BUFFER_LEN]);
    /// Discards all buffered device data.
    fn reset_fifo(&mut self);
    /// Decodes a drained packet into yaw/pitch/roll in radians.
    fn convert(&self, packet: &[u8; FIFO_BUFFER_LEN]) -> YawPitchRoll;
}

pub mod prelude {
    //! A "prelude" for convenient imports of this module's main types.
    pub use super::{
        session::SensorSession, DmpDevice, DmpStatus, FifoSource, OrientationSample,
        SensorError, YawPitchRoll,
    };
}
