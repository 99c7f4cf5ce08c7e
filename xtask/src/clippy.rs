// Licensed under the Apache-2.0 license

use anyhow::{bail, Result};
use crate::PROJECT_ROOT;
use std::process::Command;

/// Cortex-M33 target the engine runs on.
const DEVICE_TARGET: &str = "thumbv8m.main-none-eabi";

/// Crates linked into the device image; they must build without `std`.
const DEVICE_CRATES: &[&str] = &["prov-error", "prov-config", "prov-rom-common"];

pub(crate) fn clippy() -> Result<()> {
    clippy_run(&["--workspace", "--all-targets"])?;
    // Board builds drop the state names, keep that configuration lint clean too.
    clippy_run(&["-p", "prov-rom-common", "--no-default-features"])?;
    let device = device_selection();
    clippy_run(&device.iter().map(String::as_str).collect::<Vec<_>>())
}

fn device_selection() -> Vec<String> {
    let mut selection = vec![];
    for name in DEVICE_CRATES {
        selection.push("-p".to_string());
        selection.push(name.to_string());
    }
    selection.push("--no-default-features".to_string());
    selection.push(format!("--target={DEVICE_TARGET}"));
    selection
}

fn clippy_run(selection: &[&str]) -> Result<()> {
    println!("Running: cargo clippy {}", selection.join(" "));
    let mut args = vec!["clippy"];
    args.extend(selection);
    args.extend(["--", "-D", "warnings", "--no-deps"]);
    let status = Command::new("cargo")
        .current_dir(&*PROJECT_ROOT)
        .args(args)
        .status()?;

    if !status.success() {
        bail!("cargo clippy failed");
    }
    Ok(())
}
