/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/error.rs
 *
 * The crate-wide error type. Each module keeps its own error enum; this one
 * only collects them so that `main` can report any startup failure through a
 * single path.
 *
 * Dependencies:
 *   - thiserror: For ergonomic error enum definitions.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use thiserror::Error;

/// The unified error type for the daemon.
#[derive(Debug, Error)]
pub enum ImudError {
    /// Configuration could not be resolved.
    #[error("Configuration Error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The global logger could not be installed.
    #[error("Logging Error: {0}")]
    Logging(#[from] fern::InitError),

    /// The shared-memory channel failed.
    #[error("Channel Error: {0}")]
    Channel(#[from] crate::shm::ChannelError),

    /// The device library or DMP failed.
    #[error("Sensor Error: {0}")]
    Sensor(#[from] crate::sensors::SensorError),

    /// The interrupt handler could not be registered.
    #[error("Signal Error: {0}")]
    Signal(#[source] std::io::Error),
}

pub type ImudResult<T> = Result<T, ImudError>;
