use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("constants.gen.rs");
    let mut f = File::create(dest_path).unwrap();

    writeln!(
        f,
        "/// The rustc version that was used to compile this crate"
    )
    .ok();
    if let Ok(version) = rustc_version::version() {
        writeln!(
            f,
            "#[allow(dead_code)] pub const RUSTC_VERSION: Option<&'static str> = Some(\"{}\");",
            version
        )
        .ok();
    } else {
        writeln!(
            f,
            "#[allow(dead_code)] pub const RUSTC_VERSION: Option<&'static str> = None;"
        )
        .ok();
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
