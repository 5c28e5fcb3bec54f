/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/sensors/ffi.rs
 *
 * This file contains the Foreign Function Interface (FFI) bindings for the
 * C-ABI shim around the MPU6050 I2C driver and its DMP firmware library
 * (`libmpu6050_dmp.so`). The library is resolved at runtime with
 * `libloading`, so the daemon builds and runs without it. A missing library
 * is reported as a device initialization failure instead of a link error.
 *
 * The `DmpLibrary` struct keeps the `Library` alive for as long as the
 * resolved function pointers are in use and implements the safe
 * `DmpDevice` contract on top of them.
 *
 * Dependencies:
 *   - libloading: For loading the shared library and resolving symbols.
 *   - log: For structured logging.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

#![allow(non_camel_case_types)]

use super::{DmpDevice, DmpStatus, SensorError};
use libloading::Library;
use std::path::Path;

type mpu_void_fn = unsafe extern "C" fn();
type mpu_bool_fn = unsafe extern "C" fn() -> bool;
type mpu_u8_fn = unsafe extern "C" fn() -> u8;
type mpu_u16_fn = unsafe extern "C" fn() -> u16;
type mpu_set_bool_fn = unsafe extern "C" fn(enabled: bool);
type mpu_read_fn = unsafe extern "C" fn(data: *mut u8, length: u8);

/// Exported symbol names, NUL-terminated for `Library::get`.
mod symbols {
    pub const INITIALIZE: &[u8] = b"mpu6050_initialize\0";
    pub const TEST_CONNECTION: &[u8] = b"mpu6050_test_connection\0";
    pub const DMP_INITIALIZE: &[u8] = b"mpu6050_dmp_initialize\0";
    pub const SET_DMP_ENABLED: &[u8] = b"mpu6050_set_dmp_enabled\0";
    pub const GET_INT_STATUS: &[u8] = b"mpu6050_get_int_status\0";
    pub const DMP_GET_FIFO_PACKET_SIZE: &[u8] = b"mpu6050_dmp_get_fifo_packet_size\0";
    pub const GET_FIFO_COUNT: &[u8] = b"mpu6050_get_fifo_count\0";
    pub const GET_FIFO_BYTES: &[u8] = b"mpu6050_get_fifo_bytes\0";
    pub const RESET_FIFO: &[u8] = b"mpu6050_reset_fifo\0";
}

/// Resolved entry points of the device library.
#[derive(Clone, Copy)]
struct DmpVtable {
    initialize: mpu_void_fn,
    test_connection: mpu_bool_fn,
    dmp_initialize: mpu_u8_fn,
    set_dmp_enabled: mpu_set_bool_fn,
    get_int_status: mpu_u8_fn,
    dmp_get_fifo_packet_size: mpu_u16_fn,
    get_fifo_count: mpu_u16_fn,
    get_fifo_bytes: mpu_read_fn,
    reset_fifo: mpu_void_fn,
}

/// A loaded MPU6050 DMP device library.
pub struct DmpLibrary {
    vtable: DmpVtable,
    path: String,
    // Must outlive every call through `vtable`.
    _library: Library,
}

impl DmpLibrary {
    /// Loads the device library and resolves every required symbol.
    ///
    /// # Safety
    ///
    /// Loading a shared library runs its initializers, and the resolved
    /// symbols are trusted to have the signatures listed in `symbols`. The
    /// caller must trust the library at `path`.
    pub unsafe fn open(path: impl AsRef<Path>) -> Result<Self, SensorError> {
        let path_str = path.as_ref().display().to_string();
        log::debug!("Loading device library from: {}", path_str);

        let library = Library::new(path.as_ref()).map_err(|e| SensorError::LibraryLoad {
            path: path_str.clone(),
            source: e,
        })?;

        let vtable = DmpVtable {
            initialize: resolve(&library, &path_str, symbols::INITIALIZE)?,
            test_connection: resolve(&library, &path_str, symbols::TEST_CONNECTION)?,
            dmp_initialize: resolve(&library, &path_str, symbols::DMP_INITIALIZE)?,
            set_dmp_enabled: resolve(&library, &path_str, symbols::SET_DMP_ENABLED)?,
            get_int_status: resolve(&library, &path_str, symbols::GET_INT_STATUS)?,
            dmp_get_fifo_packet_size: resolve(
                &library,
                &path_str,
                symbols::DMP_GET_FIFO_PACKET_SIZE,
            )?,
            get_fifo_count: resolve(&library, &path_str, symbols::GET_FIFO_COUNT)?,
            get_fifo_bytes: resolve(&library, &path_str, symbols::GET_FIFO_BYTES)?,
            reset_fifo: resolve(&library, &path_str, symbols::RESET_FIFO)?,
        };

        log::info!("Device library loaded: {}", path_str);
        Ok(Self {
            vtable,
            path: path_str,
            _library: library,
        })
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Looks up one symbol and copies the function pointer out of the library.
unsafe fn resolve<T: Copy>(library: &Library, path: &str, symbol: &[u8]) -> Result<T, SensorError> {
    library
        .get::<T>(symbol)
        .map(|sym| *sym)
        .map_err(|e| SensorError::SymbolNotFound {
            path: path.to_string(),
            symbol: String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol))
                .into_owned(),
            source: e,
        })
}

// The library functions take no pointers except `get_fifo_bytes`, whose
// buffer and length are derived from the same slice below.
impl DmpDevice for DmpLibrary {
    fn initialize(&mut self) {
        unsafe { (self.vtable.initialize)() }
    }

    fn test_connection(&mut self) -> bool {
        unsafe { (self.vtable.test_connection)() }
    }

    fn dmp_initialize(&mut self) -> DmpStatus {
        DmpStatus::from(unsafe { (self.vtable.dmp_initialize)() })
    }

    fn set_dmp_enabled(&mut self, enabled: bool) {
        unsafe { (self.vtable.set_dmp_enabled)(enabled) }
    }

    fn int_status(&mut self) -> u8 {
        unsafe { (self.vtable.get_int_status)() }
    }

    fn dmp_packet_size(&mut self) -> u16 {
        unsafe { (self.vtable.dmp_get_fifo_packet_size)() }
    }

    fn fifo_count(&mut self) -> u16 {
        unsafe { (self.vtable.get_fifo_count)() }
    }

    fn fifo_bytes(&mut self, buf: &mut [u8]) {
        let length = u8::try_from(buf.len()).unwrap_or(u8::MAX);
        unsafe { (self.vtable.get_fifo_bytes)(buf.as_mut_ptr(), length) }
    }

    fn reset_fifo(&mut self) {
        unsafe { (self.vtable.reset_fifo)() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_a_load_error() {
        let result = unsafe { DmpLibrary::open("/nonexistent/libmpu6050_dmp.so") };
        match result {
            Err(SensorError::LibraryLoad { path, .. }) => {
                assert_eq!(path, "/nonexistent/libmpu6050_dmp.so");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("library should not load"),
        }
    }

    #[test]
    fn test_symbol_names_are_nul_terminated() {
        for symbol in [
            symbols::INITIALIZE,
            symbols::TEST_CONNECTION,
            symbols::DMP_INITIALIZE,
            symbols::SET_DMP_ENABLED,
            symbols::GET_INT_STATUS,
            symbols::DMP_GET_FIFO_PACKET_SIZE,
            symbols::GET_FIFO_COUNT,
            symbols::GET_FIFO_BYTES,
            symbols::RESET_FIFO,
        ] {
            assert_eq!(symbol.last(), Some(&0));
            assert!(symbol.starts_with(b"mpu6050_"));
        }
    }
}
