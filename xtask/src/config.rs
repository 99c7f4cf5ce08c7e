// Licensed under the Apache-2.0 license

use anyhow::Result;
use prov_config::ProvisioningConfig;
use std::path::Path;

pub(crate) fn load(file: Option<&Path>) -> Result<ProvisioningConfig> {
    match file {
        Some(path) => Ok(toml::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(ProvisioningConfig::default()),
    }
}

pub(crate) fn show(file: Option<&Path>) -> Result<()> {
    let config = load(file)?;
    let mut entries: Vec<_> = config.hash_map().into_iter().collect();
    entries.sort();
    for (key, value) in entries {
        println!("{:<24} {}", key, value);
    }
    Ok(())
}
