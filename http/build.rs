use rustc_version::{version_meta, Result};

fn main() -> Result<()> {
    let meta = version_meta()?;
    println!("cargo:rustc-env=COURIER_RUSTC_VERSION={}", meta.semver);
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
