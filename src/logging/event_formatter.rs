/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/logging/event_formatter.rs
 *
 * Formatters for `fern`. `JsonLogFormatter` turns a `log::Record` into a
 * single-line JSON object shaped after the Elastic Common Schema (ECS) so it
 * can be shipped to a log collector unchanged. `TextLogFormatter` produces
 * the plain line used on a terminal.
 *
 * Dependencies:
 *   - log: For the `log::Record` struct.
 *   - serde, serde_json: For serializing the JSON line.
 *   - chrono: For generating ISO 8601 timestamps.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use chrono::Utc;
use log::Record;
use serde::Serialize;

const ECS_VERSION: &str = "1.6.0";
const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One log event in ECS field layout.
#[derive(Serialize)]
struct EcsLine<'a> {
    #[serde(rename = "@timestamp")]
    timestamp: String,
    #[serde(rename = "log.level")]
    level: &'a str,
    message: String,
    #[serde(rename = "ecs.version")]
    ecs_version: &'static str,
    #[serde(rename = "service.name")]
    service_name: &'static str,
    #[serde(rename = "service.version")]
    service_version: &'static str,
    #[serde(rename = "process.pid")]
    pid: u32,
    #[serde(rename = "log.logger")]
    logger: &'a str,
    #[serde(rename = "log.origin.file.name", skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(rename = "log.origin.file.line", skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
}

impl<'a> EcsLine<'a> {
    fn new(message: &std::fmt::Arguments, record: &'a Record) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            level: record.level().as_str(),
            message: message.to_string(),
            ecs_version: ECS_VERSION,
            service_name: SERVICE_NAME,
            service_version: SERVICE_VERSION,
            pid: std::process::id(),
            logger: record.target(),
            file: record.file(),
            line: record.line(),
        }
    }
}

/// Single-line JSON events for log collectors.
///
/// ```json
/// {"@timestamp":"2025-09-03T12:34:56.789+00:00","log.level":"WARN",
///  "message":"FIFO overflow (1024 bytes), resetting","ecs.version":"1.6.0",
///  "service.name":"imud","service.version":"0.1.0","process.pid":412,
///  "log.logger":"imud::workers::acquisition",
///  "log.origin.file.name":"src/workers/acquisition.rs","log.origin.file.line":116}
/// ```
pub struct JsonLogFormatter;

impl JsonLogFormatter {
    pub fn format(out: fern::FormatCallback, message: &std::fmt::Arguments, record: &Record) {
        match serde_json::to_string(&EcsLine::new(message, record)) {
            Ok(line) => out.finish(format_args!("{}", line)),
            // Keep the message even if serialization fails.
            Err(e) => out.finish(format_args!(
                "{} {} (unserializable log event: {})",
                record.level(),
                message,
                e
            )),
        }
    }
}

/// Plain `timestamp LEVEL target: message` lines.
pub struct TextLogFormatter;

impl TextLogFormatter {
    pub fn format(out: fern::FormatCallback, message: &std::fmt::Arguments, record: &Record) {
        out.finish(format_args!("{}", Self::render(message, record)));
    }

    fn render(message: &std::fmt::Arguments, record: &Record) -> String {
        format!(
            "{} {:<5} {}: {}",
            Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            record.level(),
            record.target(),
            message
        )
    }
}
