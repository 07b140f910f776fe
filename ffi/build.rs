//! Generates `include/portail_ffi.h` from the `extern "C"` surface.

use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let Ok(crate_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR unset, skipping header generation");
        return;
    };
    let include = PathBuf::from(&crate_dir).join("include");
    if let Err(e) = std::fs::create_dir_all(&include) {
        println!("cargo:warning=could not create {}: {e}", include.display());
        return;
    }
    let out = include.join("portail_ffi.h");

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("PORTAIL_FFI_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out);
        }
        Err(e) => println!("cargo:warning=could not generate C header: {e}"),
    }
}
