// Licensed under the Apache-2.0 license

use std::env;
use std::fs;
use std::path::PathBuf;

/// Embed the DA record named by `PROV_DA_CONFIG`. Without it the embedded
/// record is empty and fails validation.
fn main() {
    println!("cargo:rerun-if-env-changed=PROV_DA_CONFIG");
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let record = match env::var_os("PROV_DA_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            println!("cargo:rerun-if-changed={}", path.display());
            fs::read(&path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
        }
        None => Vec::new(),
    };
    fs::write(out_dir.join("da_config.obk"), record).unwrap();
}
