/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/main.rs
 *
 * This is the main entry point for the imud daemon. It initializes the
 * components in order (configuration, logging, shared-memory channel, SIGINT
 * trap, sensor) and then runs the acquisition loop until interrupted.
 *
 * Startup failures before the sensor exit with status 2. A sensor that cannot
 * be brought up is logged and leaves the daemon idle, still holding the
 * channel, until SIGINT. An interrupt always unlinks the channel and exits
 * with status 1.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use std::process;

use imud::config::{ConfigLoader, ImudConfig};
use imud::error::{ImudError, ImudResult};
use imud::sensors::ffi::DmpLibrary;
use imud::sensors::session::SensorSession;
use imud::shm::SharedChannel;
use imud::shutdown::{self, ShutdownToken};
use imud::workers::AcquisitionLoop;

/// Exit status after an interrupt.
const EXIT_INTERRUPTED: i32 = 1;
/// Exit status when the daemon could not start.
const EXIT_STARTUP_FAILED: i32 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // --- 1. Configuration and Logging ---

    // The logger is not up yet, so these failures go straight to stderr.
    let config = match ConfigLoader::new().load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("imud: {}", ImudError::from(e));
            process::exit(EXIT_STARTUP_FAILED);
        }
    };
    if let Err(e) = imud::logging::init_logging(&config.logging) {
        eprintln!("imud: {}", ImudError::from(e));
        process::exit(EXIT_STARTUP_FAILED);
    }

    log::info!("imud {} starting", env!("CARGO_PKG_VERSION"));

    // --- 2. Channel and Signal Trap ---

    let (channel, token) = match start(&config) {
        Ok(started) => started,
        Err(e) => {
            log::error!("Startup failed: {}", e);
            process::exit(EXIT_STARTUP_FAILED);
        }
    };

    // --- 3. Run Until Interrupted ---

    let mut channel = acquire(&config, channel, token).await;

    // --- 4. Cleanup ---

    channel.close();
    log::info!("Channel '{}' released, exiting", channel.name());
    log::logger().flush();
    process::exit(EXIT_INTERRUPTED);
}

/// Opens the channel and arms the interrupt handler.
///
/// The channel is opened first so that an early interrupt still finds
/// something to release.
fn start(config: &ImudConfig) -> ImudResult<(SharedChannel, ShutdownToken)> {
    let channel = SharedChannel::open(&config.channel.name, config.channel.capacity)?;
    log::info!(
        "Channel '{}' open ({} bytes)",
        channel.name(),
        channel.capacity()
    );

    let (trigger, token) = shutdown::channel();
    shutdown::install_interrupt_handler(trigger).map_err(ImudError::Signal)?;
    Ok((channel, token))
}

/// Brings the sensor up and polls it until shutdown, returning the channel.
async fn acquire(
    config: &ImudConfig,
    channel: SharedChannel,
    mut token: ShutdownToken,
) -> SharedChannel {
    let library_path = &config.sensor.library_path;

    // SAFETY: the configured path is trusted to be the MPU6050 DMP library
    // built against the ABI declared in `sensors::ffi`.
    let library = match unsafe { DmpLibrary::open(library_path) } {
        Ok(library) => library,
        Err(e) => {
            log::error!("{}", ImudError::from(e));
            log::warn!("No sensor available; idling until interrupted");
            token.requested().await;
            return channel;
        }
    };

    let mut session = SensorSession::new(library);
    if let Err(e) = session.initialize() {
        log::error!("{}", ImudError::from(e));
        log::warn!(
            "Sensor behind '{}' not ready; no readings will be published",
            session.device().path()
        );
    }

    tokio::time::sleep(config.startup_delay()).await;

    let mut worker = AcquisitionLoop::new(session, channel, config.loop_settings());
    worker.run(&mut token).await;

    let (_, channel) = worker.into_parts();
    channel
}
