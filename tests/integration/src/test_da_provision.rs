// Licensed under the Apache-2.0 license

use anyhow::Result;
use prov_emulator_periph::{run_until_reset, DeviceArgs, EmulatedDevice, Faults};
use prov_error::ProvError;
use prov_rom_common::error::{
    IntegrityEngineError, ObkError, ProvisionError, ValidationError,
};
use prov_rom_common::obk::KeyStore;
use prov_rom_common::record::OBK_HEADER_LEN;
use prov_rom_common::{ProductState, ProvisioningFlow};

use crate::common::*;

#[test]
fn test_provision_and_read_back() -> Result<()> {
    let config = config();
    let record = da_record();
    let mut dev = device_in(ProductState::Closed);

    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).provision_da(&record));
    assert!(boot.is_reset());
    assert!(dev.is_locked());
    assert_eq!(dev.stats.obk_swaps, 1);

    let body = &record[OBK_HEADER_LEN..];
    let stored = dev.obk().active()[da_offset()..da_offset() + body.len()].to_vec();
    assert_ne!(stored, body);

    let readback = ProvisioningFlow::new(&mut dev, &config).read_da(&record)?;
    assert_eq!(readback.decrypted(), body);
    assert_eq!(readback.raw(), stored);
    assert_eq!(hex::encode(&readback.decrypted()[32..]), hex::encode(da_payload()));
    Ok(())
}

#[test]
fn test_second_provisioning_is_a_no_op() -> Result<()> {
    let config = config();
    let record = da_record();
    let mut dev = device_in(ProductState::Closed);
    let (result, _) = boot_until_done(&mut dev, 3, |dev| {
        ProvisioningFlow::new(dev, &config).provision_da(&record)
    });
    result?;
    assert_eq!(dev.stats.resets, 1);
    assert_eq!(dev.stats.obk_erases, 1);

    // A different record does not overwrite the stored one.
    let other = record_for(DA_ADDRESS, &[0x42; DA_PAYLOAD_LEN]);
    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).provision_da(&other));
    assert_eq!(boot.returned(), Some(Ok(())));
    assert_eq!(dev.stats.obk_erases, 1);
    Ok(())
}

#[test]
fn test_tampered_record_leaves_store_erased() {
    let config = config();
    let mut record = da_record();
    let last = record.len() - 1;
    record[last] ^= 0x80;
    let mut dev = device_in(ProductState::Closed);

    let result = ProvisioningFlow::new(&mut dev, &config).provision_da(&record);
    assert_eq!(
        result,
        Err(ProvisionError::Validation(ValidationError::DigestMismatch))
    );
    assert_eq!(
        ProvError::from(&result.unwrap_err()),
        ProvError::INTEGRITY_DIGEST_MISMATCH
    );
    assert_eq!(dev.stats.obk_erases, 0);
    assert_eq!(dev.stats.resets, 0);
    assert!(dev.obk().active().iter().all(|b| *b == 0xFF));
}

#[test]
fn test_header_checks() {
    let config = config();
    let mut dev = device_in(ProductState::Closed);

    let wrong_address = record_for(DA_ADDRESS + 0x10, &da_payload());
    assert_eq!(
        ProvisioningFlow::new(&mut dev, &config).provision_da(&wrong_address),
        Err(ProvisionError::Validation(ValidationError::Address(
            DA_ADDRESS + 0x10
        )))
    );

    let wrong_length = record_for(DA_ADDRESS, &[0u8; 0x30]);
    assert_eq!(
        ProvisioningFlow::new(&mut dev, &config).provision_da(&wrong_length),
        Err(ProvisionError::Validation(ValidationError::Length(0x50)))
    );

    let record = da_record();
    assert!(matches!(
        ProvisioningFlow::new(&mut dev, &config).provision_da(&record[..OBK_HEADER_LEN + 0x20]),
        Err(ProvisionError::Validation(ValidationError::Truncated { .. }))
    ));
    assert_eq!(dev.stats.hash_runs, 0);
    assert_eq!(dev.stats.obk_erases, 0);
}

#[test]
fn test_program_failure_keeps_active_bank() {
    let config = config();
    let mut dev = device_in(ProductState::Closed);
    dev.faults = Faults::OBK_PROGRAM;

    let err = ProvisioningFlow::new(&mut dev, &config)
        .provision_da(&da_record())
        .unwrap_err();
    assert_eq!(err, ProvisionError::KeyStore(ObkError::Program(0x100)));
    assert_eq!(u32::from(ProvError::from(&err)), 0x0003_0007);
    assert_eq!(err.to_string(), "Error writing OBK: Key store program failed at offset 0x100 (code 7)");
    assert!(dev.is_locked());
    assert_eq!(dev.stats.resets, 0);
    assert!(dev.obk().active().iter().all(|b| *b == 0xFF));
}

#[test]
fn test_engine_failures_map_to_codes() {
    let config = config();
    for (fault, expected) in [
        (Faults::CIPHER_DEINIT, ObkError::CipherDeinit),
        (Faults::CIPHER_INIT, ObkError::CipherInit),
        (Faults::CIPHER_PROCESS, ObkError::CipherProcess),
        (Faults::OBK_ERASE, ObkError::Erase),
        (Faults::OBK_SWAP, ObkError::Swap),
    ] {
        let mut dev = device_in(ProductState::Closed);
        dev.faults = fault;
        assert_eq!(
            ProvisioningFlow::new(&mut dev, &config).provision_da(&da_record()),
            Err(ProvisionError::KeyStore(expected)),
            "{:?}",
            fault
        );
        assert!(dev.obk().active().iter().all(|b| *b == 0xFF));
    }

    let mut dev = device_in(ProductState::Closed);
    dev.faults = Faults::HASH_COMPUTE;
    assert_eq!(
        ProvisioningFlow::new(&mut dev, &config).provision_da(&da_record()),
        Err(ProvisionError::Integrity(IntegrityEngineError::Compute))
    );
    assert_eq!(dev.stats.obk_erases, 0);
}

#[test]
fn test_other_keys_survive_provisioning() -> Result<()> {
    let config = config();
    let mut dev = device_in(ProductState::Closed);
    KeyStore::new(&mut dev, config.obk, config.timing).write_encrypted(0x200, &[0x77; 0x20])?;

    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).provision_da(&da_record()));
    assert!(boot.is_reset());

    let mut other = [0u8; 0x20];
    KeyStore::new(&mut dev, config.obk, config.timing).read_and_decrypt(0x200, &mut other)?;
    assert_eq!(other, [0x77; 0x20]);
    Ok(())
}

#[test]
fn test_ciphertext_is_bound_to_the_device() -> Result<()> {
    let config = config();
    let record = da_record();
    let state = tempfile::NamedTempFile::new()?;
    let args = DeviceArgs {
        file_name: Some(state.path().to_path_buf()),
        product_state: ProductState::Closed.code(),
        ..Default::default()
    };

    {
        let mut dev = EmulatedDevice::new(args.clone())?;
        let boot =
            run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).provision_da(&record));
        assert!(boot.is_reset());
    }

    // Same part after a power cycle.
    let mut dev = EmulatedDevice::new(args.clone())?;
    let readback = ProvisioningFlow::new(&mut dev, &config).read_da(&record)?;
    assert_eq!(readback.decrypted(), &record[OBK_HEADER_LEN..]);
    drop(dev);

    // Key store image moved to another part.
    let mut clone = EmulatedDevice::new(DeviceArgs {
        uid: *b"H573-EMU-002",
        ..args
    })?;
    let readback = ProvisioningFlow::new(&mut clone, &config).read_da(&record)?;
    assert_ne!(readback.decrypted(), &record[OBK_HEADER_LEN..]);
    Ok(())
}

#[test]
fn test_read_back_after_non_secure_epoch() -> Result<()> {
    let config = config();
    let record = da_record();
    let mut dev = device_in(ProductState::Closed);
    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).provision_da(&record));
    assert!(boot.is_reset());
    assert_eq!(
        dev.saes().epoch(),
        prov_rom_common::hil::KeyEpoch::NonSecure
    );

    let readback = ProvisioningFlow::new(&mut dev, &config).read_da(&record)?;
    assert_eq!(readback.decrypted(), &record[OBK_HEADER_LEN..]);
    assert_eq!(
        dev.saes().epoch(),
        prov_rom_common::hil::KeyEpoch::Secure
    );
    Ok(())
}
