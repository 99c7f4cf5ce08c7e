// Licensed under the Apache-2.0 license

//! Entry points used by the board integration.

use core::convert::Infallible;

use log::{error, info, warn};
use prov_config::ProvisioningConfig;
use prov_error::ProvError;

use crate::error::ProvisionError;
use crate::hil::ProvisioningHal;
use crate::product_state::{ProductState, ProductStateCtrl};
use crate::provision::{DaProvisioner, DaReadback};
use crate::trustzone::{TrustAnchor, WatermarkStatus};

pub struct ProvisioningFlow<'a, H: ProvisioningHal + ?Sized> {
    hal: &'a mut H,
    config: ProvisioningConfig,
}

impl<'a, H: ProvisioningHal + ?Sized> ProvisioningFlow<'a, H> {
    pub fn new(hal: &'a mut H, config: &ProvisioningConfig) -> Self {
        Self {
            hal,
            config: *config,
        }
    }

    pub fn enable_trust_zone(&mut self) -> Result<(), ProvisionError> {
        Ok(TrustAnchor::new(&mut *self.hal, &self.config).enable_trust_zone()?)
    }

    pub fn set_secure_watermark(&mut self) -> Result<WatermarkStatus, ProvisionError> {
        Ok(TrustAnchor::new(&mut *self.hal, &self.config).set_secure_watermark()?)
    }

    pub fn provision_da(&mut self, record: &[u8]) -> Result<(), ProvisionError> {
        DaProvisioner::new(&mut *self.hal, &self.config).provision_da(record)
    }

    pub fn read_da(&mut self, record: &[u8]) -> Result<DaReadback, ProvisionError> {
        DaProvisioner::new(&mut *self.hal, &self.config).read_da(record)
    }

    pub fn get_product_state(&mut self) -> ProductState {
        ProductStateCtrl::new(&mut *self.hal, &self.config).get_state()
    }

    pub fn close_product(&mut self) -> Result<(), ProvisionError> {
        Ok(ProductStateCtrl::new(&mut *self.hal, &self.config).close()?)
    }

    pub fn regress(&mut self) -> Result<Infallible, ProvisionError> {
        Ok(ProductStateCtrl::new(&mut *self.hal, &self.config).regression()?)
    }

    /// Unattended factory sequence.
    ///
    /// Every step checks whether it already ran, so calling this on each
    /// boot walks the device through TrustZone, watermarks, close and DA
    /// provisioning across the resets they trigger.
    pub fn run_auto(&mut self, record: &[u8]) -> Result<(), ProvisionError> {
        self.enable_trust_zone()?;
        self.set_secure_watermark()?;
        if let Err(err) = self.close_product() {
            if err.is_fatal() {
                return Err(err);
            }
            warn!("Close skipped: {}", err);
        }
        self.provision_da(record)
    }
}

/// Enter the fatal error handler when `result` holds a fatal error.
pub fn halt_on_fatal<T>(result: Result<T, ProvisionError>) -> Result<T, ProvisionError> {
    if let Err(err) = &result {
        if err.is_fatal() {
            let code = ProvError::from(err);
            error!("{} (0x{:08x})", err, u32::from(code));
            crate::fatal_error(code.into());
        }
    }
    result
}

/// Run the unattended sequence with the embedded DA record.
pub fn auto_provision<H: ProvisioningHal + ?Sized>(
    hal: &mut H,
    config: &ProvisioningConfig,
) -> Result<(), ProvisionError> {
    info!("Automatic provisioning");
    halt_on_fatal(ProvisioningFlow::new(hal, config).run_auto(crate::EMBEDDED_DA_CONFIG))
}
