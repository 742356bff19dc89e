//! Build script for the WSPR beacon firmware
//!
//! Handles:
//! - Memory layout configuration
//! - Linker scripts for the embedded binary (cortex-m-rt + defmt)

fn main() {
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (`--features std`) link like any other Rust program
    if std::env::var_os("CARGO_FEATURE_EMBEDDED").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("CARGO_MANIFEST_DIR") {
        println!("cargo:rustc-link-search={dir}");
    }

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
