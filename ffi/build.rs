use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        println!("cargo:warning=cocurl.h not generated: cargo build environment missing");
        return;
    };
    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("COCURL_H".to_string()),
        ..Default::default()
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            let header = PathBuf::from(out_dir).join("cocurl.h");
            bindings.write_to_file(header);
        }
        Err(e) => println!("cargo:warning=cocurl.h not generated: {e}"),
    }
}
