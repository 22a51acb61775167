//! Build script for storefront crate.
//!
//! Fingerprints static assets (stylesheet and the payment widget glue script)
//! so templates can reference immutable, cache-busted file names.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    fingerprint("css", "main", "css", "CSS_HASH");
    fingerprint("js", "checkout", "js", "CHECKOUT_JS_HASH");
}

/// Hash `static/<dir>/<stem>.<ext>` and copy it to `static/<dir>/derived/<stem>.<hash>.<ext>`.
///
/// Sets `env_var` for use with `env!()`. An empty value means the asset was
/// missing at build time and templates fall back to the unhashed file.
fn fingerprint(dir: &str, stem: &str, ext: &str, env_var: &str) {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let static_dir = Path::new(&manifest_dir).join("static").join(dir);
    let source = static_dir.join(format!("{stem}.{ext}"));

    println!("cargo:rerun-if-changed={}", source.display());

    let content = match fs::read(&source) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", source.display());
            println!("cargo:rustc-env={env_var}=");
            return;
        }
    };

    let digest = format!("{:x}", Sha256::digest(&content));
    let short_hash = digest.get(..8).unwrap_or(&digest);

    println!("cargo:rustc-env={env_var}={short_hash}");

    let derived_dir = static_dir.join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");
    fs::copy(
        &source,
        derived_dir.join(format!("{stem}.{short_hash}.{ext}")),
    )
    .expect("Failed to copy asset to derived directory");
}
