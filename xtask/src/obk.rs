// Licensed under the Apache-2.0 license

use anyhow::{anyhow, bail, Result};
use prov_config::ProvisioningConfig;
use prov_rom_common::integrity::{constant_time_equal, SHA256_DIGEST_LEN};
use prov_rom_common::record::{encode_record, ObkRecord, OBK_HEADER_LEN};
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::path::Path;

/// Build a record for `payload` destined to `address`.
pub(crate) fn build_record(payload: &[u8], address: u32) -> Result<Vec<u8>> {
    let digest: [u8; SHA256_DIGEST_LEN] = Sha256::digest(payload).into();
    let mut out = vec![0u8; OBK_HEADER_LEN + SHA256_DIGEST_LEN + payload.len()];
    let len = encode_record(address, &digest, payload, &mut out)
        .ok_or_else(|| anyhow!("payload of {} bytes does not fit a record", payload.len()))?;
    out.truncate(len);
    Ok(out)
}

/// Pack `payload` and check the result against `config`, the same
/// configuration the device image is built with.
pub(crate) fn pack(
    payload: &Path,
    address: u32,
    output: &Path,
    config: &ProvisioningConfig,
) -> Result<()> {
    let payload = std::fs::read(payload)?;
    let record = build_record(&payload, address)?;
    describe(&record, config)?;
    std::fs::write(output, &record)?;
    println!("Wrote {} bytes to {}", record.len(), output.display());
    Ok(())
}

pub(crate) fn inspect(file: &Path, config: &ProvisioningConfig) -> Result<()> {
    let record = std::fs::read(file)?;
    describe(&record, config)
}

/// Print the header and run the same checks as the device, with the
/// digest computed in software.
pub(crate) fn describe(bytes: &[u8], config: &ProvisioningConfig) -> Result<()> {
    let record = ObkRecord::parse(bytes)?;
    println!("address   : 0x{:08x}", record.address());
    println!("length    : 0x{:x}", record.length());
    println!("encrypted : {}", record.header().encrypted.get());
    record.validate_header(&config.da, &config.obk)?;

    let body = record.body()?;
    let (digest, payload) = body.split_at(SHA256_DIGEST_LEN);
    println!("digest    : {}", hex::encode(digest));
    let computed = Sha256::digest(payload);
    if !constant_time_equal(&computed, digest, SHA256_DIGEST_LEN) {
        bail!("digest mismatch, payload hashes to {}", hex::encode(computed));
    }
    println!("offset    : 0x{:x}", record.offset(&config.obk)?);
    Ok(())
}

pub(crate) fn format_rust_array(bytes: &[u8], name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "pub const {}: [u8; {}] = [", name, bytes.len());
    for line in bytes.chunks(12) {
        let items: Vec<String> = line.iter().map(|b| format!("0x{:02x},", b)).collect();
        let _ = writeln!(out, "    {}", items.join(" "));
    }
    out.push_str("];\n");
    out
}

pub(crate) fn rust_array(file: &Path, name: &str) -> Result<()> {
    let bytes = std::fs::read(file)?;
    print!("{}", format_rust_array(&bytes, name));
    Ok(())
}
