//! Build script for imsg-ffi.
//!
//! Regenerates `include/imsg.h` from the exported `extern "C"` items with
//! `cbindgen`. A failed generation leaves the committed header in place and
//! emits a warning instead of failing the build.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-env-changed=DOCS_RS");

    if env::var("DOCS_RS").is_ok() {
        return;
    }

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let header = crate_dir.join("include").join("imsg.h");

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("IMSG_H".into()),
        pragma_once: true,
        cpp_compat: true,
        usize_is_size_t: true,
        documentation: true,
        header: Some("/* Generated by cbindgen from imsg-ffi. Do not edit. */".into()),
        ..cbindgen::Config::default()
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&header);
        }
        Err(e) => println!("cargo:warning=cbindgen failed, keeping existing header: {e}"),
    }
}
