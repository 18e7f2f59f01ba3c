// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::type_complexity)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::too_many_arguments)]

include!("ffi.rs");

// Re-export libloading for error handling
pub use libloading;

use std::sync::{Mutex, OnceLock};

static LIBRARY: OnceLock<ArgusLibrary> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Default shared object name of the capture shim.
pub const DEFAULT_LIBRARY: &str = "libjepture_argus.so";

/// Initialize the capture shim by loading libjepture_argus.so
///
/// This must be called before using any other shim functions.
/// Returns an error if the library cannot be loaded.
///
/// The environment variable `JEPTURE_ARGUS_LIBRARY` can be used to specify
/// a custom path to the library. If not set, searches standard system paths.
pub fn init() -> Result<&'static ArgusLibrary, libloading::Error> {
    if let Some(lib) = LIBRARY.get() {
        return Ok(lib);
    }

    let _guard = INIT_LOCK.lock().unwrap();

    // Double-check after acquiring lock
    if let Some(lib) = LIBRARY.get() {
        return Ok(lib);
    }

    let lib_path = std::env::var("JEPTURE_ARGUS_LIBRARY")
        .ok()
        .unwrap_or_else(|| DEFAULT_LIBRARY.to_string());

    let lib = unsafe { ArgusLibrary::new(lib_path.as_str())? };

    LIBRARY.set(lib).ok().expect("Failed to initialize library");

    Ok(LIBRARY.get().unwrap())
}
