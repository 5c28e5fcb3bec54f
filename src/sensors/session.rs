/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/sensors/session.rs
 *
 * This file provides the `SensorSession`, the single long-lived owner of the
 * motion sensor. It performs the one-time device bring-up and DMP firmware
 * load, remembers whether the DMP became ready together with the packet size
 * it reported, and exposes the polled FIFO operations to the acquisition
 * loop through the `FifoSource` capability trait.
 *
 * A failed bring-up is not fatal: the session simply stays not-ready and every
 * poll becomes a no-op. Initialization is never retried.
 *
 * Dependencies:
 *   - super::dmp_math: For the packet conversion.
 *   - log: For structured logging.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use super::dmp_math::{self, QUATERNION_BLOCK_LEN};
use super::{DmpDevice, DmpStatus, FifoSource, SensorError, YawPitchRoll, FIFO_BUFFER_LEN};

/// Owns the device handle and its readiness state.
pub struct SensorSession<D: DmpDevice> {
    device: D,
    ready: bool,
    packet_size: usize,
    int_status: u8,
}

impl<D: DmpDevice> SensorSession<D> {
    /// Wraps a device without touching it. The session starts not-ready.
    pub fn new(device: D) -> Self {
        Self {
            device,
            ready: false,
            packet_size: 0,
            int_status: 0,
        }
    }

    /// Brings the device up and loads the DMP.
    ///
    /// On success the DMP is enabled and the session becomes ready. On
    /// failure the session stays not-ready and the distinct cause is
    /// returned; the caller decides whether that is fatal.
    pub fn initialize(&mut self) -> Result<(), SensorError> {
        self.device.initialize();

        if self.device.test_connection() {
            log::debug!("MPU6050 connection successful");
        } else {
            log::warn!("MPU6050 connection test failed, attempting DMP load anyway");
        }

        let status = self.device.dmp_initialize();
        if status != DmpStatus::Ok {
            return Err(SensorError::DmpInit(status));
        }

        let size = self.device.dmp_packet_size();
        let packet_size = usize::from(size);
        if !(QUATERNION_BLOCK_LEN..=FIFO_BUFFER_LEN).contains(&packet_size) {
            return Err(SensorError::UnsupportedPacketSize {
                size,
                min: QUATERNION_BLOCK_LEN,
                max: FIFO_BUFFER_LEN,
            });
        }

        log::debug!("Enabling DMP...");
        self.device.set_dmp_enabled(true);
        self.int_status = self.device.int_status();
        self.packet_size = packet_size;
        self.ready = true;

        log::info!(
            "DMP ready (packet size {} bytes, int status {:#04x})",
            self.packet_size,
            self.int_status
        );
        Ok(())
    }

    /// Interrupt status byte read right after the DMP was enabled.
    pub fn int_status(&self) -> u8 {
        self.int_status
    }

    /// Borrows the underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: DmpDevice> FifoSource for SensorSession<D> {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn packet_size(&self) -> usize {
        self.packet_size
    }

    fn fifo_count(&mut self) -> u16 {
        self.device.fifo_count()
    }

    fn drain_packet(&mut self, buf: &mut [u8; FIFO_BUFFER_LEN]) {
        self.device.fifo_bytes(&mut buf[..self.packet_size]);
    }

    fn reset_fifo(&mut self) {
        self.device.reset_fifo();
    }

    fn convert(&self, packet: &[u8; FIFO_BUFFER_LEN]) -> YawPitchRoll {
        dmp_math::packet_to_ypr(packet)
    }
}
