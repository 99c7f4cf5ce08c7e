// Licensed under the Apache-2.0 license

use prov_config::WatermarkRange;
use prov_emulator_periph::{run_until_reset, Faults};
use prov_rom_common::error::{FatalHardwareFault, ProvisionError};
use prov_rom_common::hil::{FlashBank, ObProgram, OptionByteCtrl};
use prov_rom_common::trustzone::WatermarkStatus;
use prov_rom_common::{ProductState, ProvisioningFlow};

use crate::common::*;

#[test]
fn test_enable_trust_zone_once() {
    let config = config();
    let mut dev = device_in(ProductState::Open);

    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).enable_trust_zone());
    assert!(boot.is_reset());
    assert_eq!(dev.option_status2().tzen(), 0xB4);
    assert_eq!(dev.stats.ob_launches, 1);

    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).enable_trust_zone());
    assert_eq!(boot.returned(), Some(Ok(())));
    assert_eq!(dev.stats.ob_launches, 1);
    assert_eq!(dev.stats.resets, 1);
}

#[test]
fn test_watermark_programs_only_mismatching_banks() {
    let config = config();
    let mut dev = device_in(ProductState::Open);

    let status = ProvisioningFlow::new(&mut dev, &config).set_secure_watermark();
    assert_eq!(status, Ok(WatermarkStatus::Updated));
    // Bank 2 already had the disabled range.
    assert_eq!(
        dev.stats.ob_programs,
        [ObProgram::SecureWatermark {
            bank: FlashBank::Bank1,
            range: WatermarkRange::new(0, 0x7F),
        }]
    );
    assert_eq!(dev.secure_watermark(FlashBank::Bank1), WatermarkRange::new(0, 0x7F));
    assert_eq!(dev.stats.resets, 0);
    assert!(dev.is_locked());

    let status = ProvisioningFlow::new(&mut dev, &config).set_secure_watermark();
    assert_eq!(status, Ok(WatermarkStatus::AlreadySet));
    assert_eq!(dev.stats.ob_launches, 1);
}

#[test]
fn test_watermark_program_failure_is_fatal() {
    let config = config();
    let mut dev = device_in(ProductState::Open);
    dev.faults = Faults::OB_PROGRAM;

    let status = ProvisioningFlow::new(&mut dev, &config).set_secure_watermark();
    assert_eq!(
        status,
        Err(ProvisionError::Fatal(FatalHardwareFault::WatermarkProgram(
            FlashBank::Bank1
        )))
    );
    assert!(dev.is_locked());
    assert_eq!(dev.stats.ob_launches, 0);
}

#[test]
fn test_trust_zone_launch_failure() {
    let config = config();
    let mut dev = device_in(ProductState::Open);
    dev.faults = Faults::OB_LAUNCH;

    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).enable_trust_zone());
    assert_eq!(
        boot.returned(),
        Some(Err(ProvisionError::Fatal(FatalHardwareFault::TrustZoneLaunch)))
    );
    assert_eq!(dev.option_status2().tzen(), 0xC3);
    assert!(dev.is_locked());
}
