/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/shm/record.rs
 *
 * The text record stored in the shared-memory mailbox: three fixed-width
 * columns (yaw, pitch, roll in degrees, `%7.2f` each) separated by single
 * spaces and terminated by a newline, e.g. `"  12.34   -5.67  180.00\n"`.
 * There is no header or version field. Readers parse by column.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use crate::sensors::OrientationSample;

/// Width of one angle column.
pub const FIELD_WIDTH: usize = 7;

/// Longest record the publisher produces: three columns, two separators
/// and the trailing newline. DMP angles stay within +/-180 degrees, so
/// `"-180.00"` is the widest column.
pub const MAX_RECORD_LEN: usize = 3 * FIELD_WIDTH + 2 + 1;

/// Formats a sample the way it is stored in the channel.
pub fn format_record(sample: &OrientationSample) -> String {
    format!(
        "{:7.2} {:7.2} {:7.2}\n",
        sample.yaw, sample.pitch, sample.roll
    )
}

/// Parses a record back into a sample.
///
/// Trailing NUL padding is ignored. Returns `None` for an empty mailbox or
/// anything that is not three numeric columns.
pub fn parse_record(text: &str) -> Option<OrientationSample> {
    let line = text.trim_end_matches('\0').strip_suffix('\n')?;
    if line.len() != MAX_RECORD_LEN - 1 {
        return None;
    }

    let column = |index: usize| {
        let start = index * (FIELD_WIDTH + 1);
        line.get(start..start + FIELD_WIDTH)?.trim().parse::<f32>().ok()
    };

    Some(OrientationSample {
        yaw: column(0)?,
        pitch: column(1)?,
        roll: column(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_sample_formats_as_zero_columns() {
        let sample = OrientationSample { yaw: 0.0, pitch: 0.0, roll: 0.0 };
        assert_eq!(format_record(&sample), "   0.00    0.00    0.00\n");
    }

    #[test]
    fn test_mixed_signs_keep_fixed_columns() {
        let sample = OrientationSample { yaw: 12.34, pitch: -5.67, roll: 180.0 };
        assert_eq!(format_record(&sample), "  12.34   -5.67  180.00\n");
    }

    #[test]
    fn test_widest_record_fits_the_bound() {
        let sample = OrientationSample { yaw: -180.0, pitch: -90.0, roll: -179.99 };
        let record = format_record(&sample);
        assert_eq!(record.len(), MAX_RECORD_LEN);
        assert_eq!(record, "-180.00  -90.00 -179.99\n");
    }

    #[test]
    fn test_parse_reads_columns() {
        let parsed = parse_record("  12.34   -5.67  180.00\n\0\0\0").unwrap();
        assert_eq!(parsed, OrientationSample { yaw: 12.34, pitch: -5.67, roll: 180.0 });
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert_eq!(parse_record(""), None);
        assert_eq!(parse_record("\0\0\0\0"), None);
        assert_eq!(parse_record("not a record\n"), None);
        assert_eq!(parse_record("  12.34   -5.67  180.00"), None);
    }
}
