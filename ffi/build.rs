use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let (Ok(crate_dir), Ok(out_dir)) = (std::env::var("CARGO_MANIFEST_DIR"), std::env::var("OUT_DIR")) else {
        return;
    };

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("IGUANA_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(PathBuf::from(out_dir).join("iguana.h"));
        }
        Err(e) => println!("cargo:warning=failed to generate iguana.h: {e}"),
    }
}
