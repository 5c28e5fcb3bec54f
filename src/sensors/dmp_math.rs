/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/sensors/dmp_math.rs
 *
 * Pure Rust implementation of the DMP "MotionApps 2.0" packet conversions:
 * raw FIFO packet -> orientation quaternion -> gravity vector -> yaw, pitch
 * and roll. The formulas match the ones the device library uses, so the
 * published angles are identical to what the vendor tooling reports.
 *
 * This module is self-contained and does not touch the device.
 *
 * Dependencies:
 *   - nalgebra: For quaternion and vector types.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use super::{YawPitchRoll, FIFO_BUFFER_LEN};
use nalgebra::{Quaternion, Vector3};

/// Fixed-point scale of the quaternion components (Q14).
pub const QUATERNION_SCALE: f32 = 16384.0;

/// Bytes at the head of every DMP packet that carry the quaternion.
pub const QUATERNION_BLOCK_LEN: usize = 16;

/// Decodes the orientation quaternion from the head of a DMP packet.
///
/// Each component is stored as a 32-bit big-endian word; only the upper
/// 16 bits (offsets 0, 4, 8 and 12) are significant.
pub fn quaternion_from_packet(packet: &[u8; FIFO_BUFFER_LEN]) -> Quaternion<f32> {
    let component = |offset: usize| {
        i16::from_be_bytes([packet[offset], packet[offset + 1]]) as f32 / QUATERNION_SCALE
    };
    Quaternion::new(component(0), component(4), component(8), component(12))
}

/// Derives the gravity direction from an orientation quaternion.
pub fn gravity(q: &Quaternion<f32>) -> Vector3<f32> {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    Vector3::new(
        2.0 * (x * z - w * y),
        2.0 * (w * x + y * z),
        w * w - x * x - y * y + z * z,
    )
}

/// Computes yaw, pitch and roll (radians) from a quaternion and its gravity vector.
pub fn yaw_pitch_roll(q: &Quaternion<f32>, gravity: &Vector3<f32>) -> YawPitchRoll {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    let (gx, gy, gz) = (gravity.x, gravity.y, gravity.z);

    YawPitchRoll {
        yaw: (2.0 * x * y - 2.0 * w * z).atan2(2.0 * w * w + 2.0 * x * x - 1.0),
        pitch: (gx / (gy * gy + gz * gz).sqrt()).atan(),
        roll: (gy / (gx * gx + gz * gz).sqrt()).atan(),
    }
}

/// Full packet conversion: quaternion, then gravity, then Euler angles.
pub fn packet_to_ypr(packet: &[u8; FIFO_BUFFER_LEN]) -> YawPitchRoll {
    let q = quaternion_from_packet(packet);
    let g = gravity(&q);
    yaw_pitch_roll(&q, &g)
}
