// Licensed under the Apache-2.0 license

use anyhow::{bail, Result};
use crate::PROJECT_ROOT;
use std::process::{Command, Stdio};

pub(crate) fn cargo_lock() -> Result<()> {
    println!("Checking Cargo lock");
    let status = Command::new("cargo")
        .current_dir(&*PROJECT_ROOT)
        .args(["tree", "--locked", "--workspace"])
        .stdout(Stdio::null())
        .status()?;

    if !status.success() {
        bail!("cargo tree --locked failed; commit the updated Cargo.lock with your change");
    }
    Ok(())
}
