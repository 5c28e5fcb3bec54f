/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/workers/acquisition.rs
 *
 * This file implements the acquisition loop, the long-running task that
 * bridges the sensor session and the shared-memory channel.
 *
 * Every iteration is evaluated fresh, in this order:
 * - Not ready: the DMP never came up. Nothing is touched.
 * - Overflow: the FIFO reports exactly its capacity. It is reset and the
 *   cycle ends; stale data is dropped rather than resynchronised.
 * - Packet available: exactly one packet is drained, converted and
 *   published. Any further queued packets wait for the next cycle.
 * - Idle: fewer bytes than one packet. Nothing happens.
 *
 * Between iterations the loop sleeps for a fixed interval regardless of the
 * work done. The shutdown flag is checked before each iteration and also
 * cuts the sleep short.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

#![deny(missing_docs)]

//! The acquisition worker polls the sensor FIFO and publishes orientation.

use crate::sensors::{FifoSource, OrientationSample, FIFO_BUFFER_LEN};
use crate::shm::record::format_record;
use crate::shm::Publisher;
use crate::shutdown::ShutdownToken;
use std::time::Duration;
use tokio::time::sleep;

/// Timing and buffer limits for the loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// Fixed delay after every iteration.
    pub poll_interval: Duration,
    /// FIFO count that means the device buffer overflowed.
    pub fifo_capacity: u16,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            fifo_capacity: 1024,
        }
    }
}

/// What a single iteration did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// The session is not ready; nothing was touched.
    NotReady,
    /// The FIFO was full and has been reset.
    Overflow,
    /// Not enough data for a packet yet.
    Idle {
        /// FIFO count observed this cycle.
        fifo_count: u16,
    },
    /// A packet was converted and published.
    Published(OrientationSample),
    /// A packet was converted but the channel rejected the record.
    PublishFailed(OrientationSample),
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Iterations executed.
    pub iterations: u64,
    /// Samples written to the channel.
    pub published: u64,
    /// FIFO overflow resets.
    pub overflows: u64,
}

/// Owns the sensor source and the publisher for the lifetime of the loop.
pub struct AcquisitionLoop<S: FifoSource, P: Publisher> {
    source: S,
    publisher: P,
    settings: LoopSettings,
    buffer: [u8; FIFO_BUFFER_LEN],
    stats: LoopStats,
}

impl<S: FifoSource, P: Publisher> AcquisitionLoop<S, P> {
    /// Creates a loop over `source`, publishing into `publisher`.
    pub fn new(source: S, publisher: P, settings: LoopSettings) -> Self {
        Self {
            source,
            publisher,
            settings,
            buffer: [0; FIFO_BUFFER_LEN],
            stats: LoopStats::default(),
        }
    }

    /// Runs one iteration of the state machine.
    pub fn poll_once(&mut self) -> PollOutcome {
        self.stats.iterations += 1;

        if !self.source.is_ready() {
            return PollOutcome::NotReady;
        }

        let fifo_count = self.source.fifo_count();

        if fifo_count == self.settings.fifo_capacity {
            self.source.reset_fifo();
            self.stats.overflows += 1;
            log::warn!("FIFO overflow ({} bytes), resetting", fifo_count);
            return PollOutcome::Overflow;
        }

        if usize::from(fifo_count) < self.source.packet_size() {
            return PollOutcome::Idle { fifo_count };
        }

        self.source.drain_packet(&mut self.buffer);
        let sample = OrientationSample::from(self.source.convert(&self.buffer));
        let record = format_record(&sample);

        match self.publisher.publish(&record) {
            Ok(()) => {
                self.stats.published += 1;
                log::trace!("Published {}", record.trim_end());
                PollOutcome::Published(sample)
            }
            Err(e) => {
                log::warn!("Failed to publish orientation: {}", e);
                PollOutcome::PublishFailed(sample)
            }
        }
    }

    /// Polls at the fixed cadence until shutdown is requested.
    pub async fn run(&mut self, shutdown: &mut ShutdownToken) -> LoopStats {
        log::info!(
            "Acquisition loop running (poll interval {:?}, ready: {})",
            self.settings.poll_interval,
            self.source.is_ready()
        );

        loop {
            if shutdown.is_requested() {
                break;
            }

            self.poll_once();

            tokio::select! {
                _ = sleep(self.settings.poll_interval) => {}
                _ = shutdown.requested() => break,
            }
        }

        log::info!(
            "Acquisition loop stopped after {} iterations ({} published, {} overflow resets)",
            self.stats.iterations,
            self.stats.published,
            self.stats.overflows
        );
        self.stats
    }

    /// Counters so far.
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Borrows the publisher.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Gives back the source and the publisher.
    pub fn into_parts(self) -> (S, P) {
        (self.source, self.publisher)
    }
}
