/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/logging/mod.rs
 *
 * Logger setup for the daemon. Everything goes to stderr so stdout stays
 * free; the shared-memory record is the daemon's only real output.
 *
 * Two line formats are available: a compact human-readable text line and an
 * ECS-shaped JSON object for log collectors.
 *
 * Dependencies:
 *   - log: The logging facade used throughout the crate.
 *   - fern: The dispatcher that routes records to stderr.
 *   - chrono: For timestamps.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

//! # Logging Setup

/// Line formatters plugged into the `fern` dispatcher.
pub mod event_formatter;

pub use event_formatter::{JsonLogFormatter, TextLogFormatter};

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global logger.
///
/// `level` is taken as already validated; an unparseable value falls back to
/// `info`. Fails if a logger was installed before.
pub fn init_logging(config: &LoggingConfig) -> Result<(), fern::InitError> {
    let level = config.level_filter().unwrap_or(log::LevelFilter::Info);
    build_dispatch(config.format, level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn build_dispatch(format: LogFormat, level: log::LevelFilter) -> fern::Dispatch {
    let dispatch = fern::Dispatch::new().level(level);
    match format {
        LogFormat::Text => dispatch.format(TextLogFormatter::format),
        LogFormat::Json => dispatch.format(JsonLogFormatter::format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_dispatch_filters_below_level() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let (_, logger) = build_dispatch(LogFormat::Text, log::LevelFilter::Warn)
            .chain(fern::Output::call(move |record| {
                sink.lock().unwrap().push(record.args().to_string());
            }))
            .into_log();

        logger.log(
            &log::Record::builder()
                .args(format_args!("quiet"))
                .level(log::Level::Info)
                .build(),
        );
        logger.log(
            &log::Record::builder()
                .args(format_args!("loud"))
                .level(log::Level::Warn)
                .build(),
        );

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("loud"));
        assert!(lines[0].contains("WARN"));
    }
}
