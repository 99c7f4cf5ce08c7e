// Licensed under the Apache-2.0 license

use anyhow::Result;
use prov_emulator_periph::{run_until_reset, Boot, Faults};
use prov_error::ProvError;
use prov_rom_common::error::{FatalHardwareFault, ProvisionError, ValidationError};
use prov_rom_common::hil::ObProgram;
use prov_rom_common::{halt_on_fatal, FatalErrorHandler, ProductState, ProductStateCtrl, ProvisioningFlow};

use crate::common::*;

#[test]
fn test_close_takes_two_boots() -> Result<()> {
    let config = config();
    let mut dev = device_in(ProductState::Open);

    let (result, states) = boot_until_done(&mut dev, 4, |dev| {
        ProvisioningFlow::new(dev, &config).close_product()
    });
    result?;
    assert_eq!(
        states,
        [ProductState::IrotProvisioned, ProductState::Closed]
    );
    assert_eq!(
        dev.stats.ob_programs,
        [
            ObProgram::ProductState(0x2E),
            ObProgram::ProductState(0x72)
        ]
    );
    assert!(dev.is_locked());
    Ok(())
}

#[test]
fn test_close_resumes_from_provisioned() {
    let config = config();
    let mut dev = device_in(ProductState::IrotProvisioned);
    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).close_product());
    assert!(boot.is_reset());
    assert_eq!(dev.product_state(), ProductState::Closed);
    assert_eq!(dev.stats.ob_programs, [ObProgram::ProductState(0x72)]);
}

#[test]
fn test_close_from_tz_closed_moves_forward_only() -> Result<()> {
    let config = config();
    let mut dev = device_in(ProductState::TzClosed);

    let (result, states) = boot_until_done(&mut dev, 3, |dev| {
        ProvisioningFlow::new(dev, &config).close_product()
    });
    result?;
    assert_eq!(states, [ProductState::Closed]);
    assert_eq!(dev.stats.ob_programs, [ObProgram::ProductState(0x72)]);
    Ok(())
}

#[test]
fn test_close_needs_oem_boot() {
    let config = config();
    let mut dev = device_in(ProductState::Open);
    dev.option_bytes_mut().force_boot_ube(0xC3);

    let result = ProvisioningFlow::new(&mut dev, &config).close_product();
    assert_eq!(
        result,
        Err(ProvisionError::Validation(ValidationError::BootUbe(0xC3)))
    );
    assert!(dev.stats.ob_programs.is_empty());
    assert_eq!(dev.product_state(), ProductState::Open);
}

#[test]
fn test_close_never_goes_back() {
    let config = config();
    let mut dev = device_in(ProductState::Locked);
    let result = ProvisioningFlow::new(&mut dev, &config).close_product();
    assert_eq!(
        result,
        Err(ProvisionError::Validation(ValidationError::BackwardTransition {
            from: ProductState::Locked,
            to: ProductState::Closed,
        }))
    );
    assert_eq!(
        ProvError::from(&result.unwrap_err()),
        ProvError::PRODUCT_STATE_BACKWARD
    );
    assert_eq!(dev.stats.resets, 0);
}

#[test]
fn test_transition_order() {
    let config = config();
    let mut dev = device_in(ProductState::Open);

    let boot = run_until_reset(|| {
        ProductStateCtrl::new(&mut dev, &config).transition_to(ProductState::Provisioning)
    });
    assert!(boot.is_reset());
    assert_eq!(dev.product_state(), ProductState::Provisioning);

    let result = ProductStateCtrl::new(&mut dev, &config).transition_to(ProductState::Open);
    assert!(result.is_err());
    assert_eq!(
        ProductStateCtrl::new(&mut dev, &config).transition_to(ProductState::Provisioning),
        Ok(())
    );
    assert_eq!(dev.stats.resets, 1);
}

#[test]
fn test_regression_from_closed() {
    let config = config();
    let mut dev = device_in(ProductState::Closed);
    let boot = run_until_reset(|| ProvisioningFlow::new(&mut dev, &config).regress());
    assert!(boot.is_reset());
    assert_eq!(dev.product_state(), ProductState::Regression);
    assert_eq!(ProvisioningFlow::new(&mut dev, &config).get_product_state(), ProductState::Regression);
}

#[test]
fn test_launch_failure_is_fatal() {
    let config = config();
    let mut dev = device_in(ProductState::Open);
    dev.faults = Faults::OB_LAUNCH;

    let result = ProvisioningFlow::new(&mut dev, &config).close_product();
    assert_eq!(
        result,
        Err(ProvisionError::Fatal(FatalHardwareFault::ProductStateLaunch(
            0x2E
        )))
    );
    assert!(result.unwrap_err().is_fatal());
    assert!(dev.is_locked());
    assert_eq!(dev.stats.resets, 0);
}

struct Halt;

impl FatalErrorHandler for Halt {
    fn fatal_error(&mut self, code: u32) -> ! {
        std::panic::panic_any(code)
    }
}

#[test]
fn test_fatal_error_reaches_handler() {
    let config = config();
    let mut dev = device_in(ProductState::Open);
    dev.faults = Faults::OB_PROGRAM;
    prov_rom_common::set_fatal_error_handler(Box::leak(Box::new(Halt)));

    let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        run_until_reset(|| halt_on_fatal(ProvisioningFlow::new(&mut dev, &config).close_product()))
    }))
    .unwrap_err();
    assert_eq!(
        *payload.downcast::<u32>().unwrap(),
        u32::from(ProvError::PRODUCT_STATE_PROGRAM)
    );
    assert!(dev.is_locked());

    // Nothing fatal: the handler is not involved.
    dev.faults = Faults::empty();
    dev.option_bytes_mut().force_boot_ube(0xC3);
    let boot = run_until_reset(|| halt_on_fatal(ProvisioningFlow::new(&mut dev, &config).close_product()));
    assert!(matches!(boot, Boot::Returned(Err(ProvisionError::Validation(_)))));
}
