/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/lib.rs
 *
 * This file is the library entry point for `imud`, a small daemon that reads
 * orientation from an MPU6050's on-chip Digital Motion Processor (DMP) and
 * republishes it as a fixed-width text record in a POSIX shared-memory
 * object, so that any process on the host can read the latest yaw, pitch and
 * roll without talking to the sensor bus.
 *
 * The main components are:
 * - `sensors`: The device library binding, DMP bring-up and quaternion math.
 * - `shm`: The shared-memory mailbox and its record format.
 * - `workers`: The acquisition loop.
 * - `shutdown`: SIGINT handling.
 * - `config`, `logging`, `error`: The ambient plumbing.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

// === TOC ===
// 1. Crate-level Documentation & Attributes
// 2. Public Module Declarations
// 3. Public Prelude
// =============

//! # imud
//!
//! MPU6050 DMP orientation, published through shared memory.
//!
//! ## Reading the channel
//!
//! ```rust,ignore
//! use imud::shm::ChannelReader;
//!
//! let reader = ChannelReader::attach("MPU", 50)?;
//! if let Some(sample) = reader.latest() {
//!     println!("yaw {:.2}", sample.yaw);
//! }
//! ```

// --- Public Module Declarations ---

pub mod config;
pub mod error;
pub mod logging;
pub mod sensors;
pub mod shm;
pub mod shutdown;
pub mod workers;

// --- Public Prelude ---

pub mod prelude {
    //! A "prelude" for convenient imports of this crate's main types.
    pub use super::{
        config::{ConfigLoader, ImudConfig},
        error::{ImudError, ImudResult},
        sensors::prelude::*,
        shm::{ChannelError, ChannelReader, Publisher, SharedChannel},
        workers::{AcquisitionLoop, LoopSettings, LoopStats},
    };
}
