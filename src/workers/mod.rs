/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/workers/mod.rs
 *
 * This module holds the long-running background work of the daemon. There is
 * a single worker: the acquisition loop that drains the sensor FIFO and
 * republishes orientation into shared memory.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

#![deny(missing_docs)]

//! # Background Workers

/// The FIFO polling and publishing loop.
pub mod acquisition;

pub use acquisition::{AcquisitionLoop, LoopSettings, LoopStats, PollOutcome};
