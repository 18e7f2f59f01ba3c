// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

// The capture shim is loaded at runtime through libloading, so nothing is
// linked here.

fn main() {
    // Bindings in src/ffi.rs are kept in sync with the shim header by hand.
    println!("cargo:rerun-if-changed=../../include/jepture_argus.h");
}
