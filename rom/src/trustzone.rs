// Licensed under the Apache-2.0 license

//! TrustZone enable and secure watermark option bytes.

use log::{error, info, warn};
use prov_config::{ProvisioningConfig, WatermarkRange};

use crate::error::FatalHardwareFault;
use crate::hil::{FlashBank, ObProgram, ObUnlocked, OptionByteCtrl, SystemCtrl};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatermarkStatus {
    AlreadySet,
    /// At least one bank was programmed and the option bytes launched.
    Updated,
}

pub struct TrustAnchor<'a, H: OptionByteCtrl + SystemCtrl + ?Sized> {
    hal: &'a mut H,
    config: ProvisioningConfig,
}

impl<'a, H: OptionByteCtrl + SystemCtrl + ?Sized> TrustAnchor<'a, H> {
    pub fn new(hal: &'a mut H, config: &ProvisioningConfig) -> Self {
        Self {
            hal,
            config: *config,
        }
    }

    pub fn is_trust_zone_enabled(&self) -> bool {
        self.hal.option_status2().tzen() == self.config.option_bytes.tzen_enable
    }

    /// Returns only when TrustZone is already enabled or on failure.
    /// Otherwise the option byte is programmed and the device reset.
    pub fn enable_trust_zone(&mut self) -> Result<(), FatalHardwareFault> {
        if self.is_trust_zone_enabled() {
            info!("TrustZone already enabled");
            return Ok(());
        }

        let tzen = self.config.option_bytes.tzen_enable;
        {
            let mut hal = ObUnlocked::acquire(&mut *self.hal)
                .map_err(|_| FatalHardwareFault::TrustZoneProgram)?;
            info!("TZ not enabled : program TZEN option byte to 0x{:02x}", tzen);
            hal.ob_program(&ObProgram::TrustZone(tzen)).map_err(|err| {
                error!("Error while setting TrustZone : {:?}", err);
                FatalHardwareFault::TrustZoneProgram
            })?;
            hal.ob_launch().map_err(|err| {
                error!("Error while executing OB_Launch : {:?}", err);
                FatalHardwareFault::TrustZoneLaunch
            })?;
        }
        info!("Reset...");
        self.hal.reset()
    }

    /// Program the secure watermark of every bank that does not match,
    /// then launch once.
    pub fn set_secure_watermark(&mut self) -> Result<WatermarkStatus, FatalHardwareFault> {
        let expected = [
            (FlashBank::Bank1, self.config.watermark.bank1),
            (FlashBank::Bank2, self.config.watermark.bank2),
        ];
        let mut pending: [Option<(FlashBank, WatermarkRange)>; 2] = [None; 2];
        for (slot, (bank, range)) in pending.iter_mut().zip(expected) {
            let current = self.hal.secure_watermark(bank);
            if current != range {
                warn!(
                    "Flash watermarks {:?} not set correctly : Start 0x{:02x} End 0x{:02x}",
                    bank, current.start, current.end
                );
                *slot = Some((bank, range));
            }
        }

        if pending.iter().all(Option::is_none) {
            info!("Secure watermarks already set");
            return Ok(WatermarkStatus::AlreadySet);
        }

        let mut hal = ObUnlocked::acquire(&mut *self.hal)
            .map_err(|_| FatalHardwareFault::WatermarkLaunch)?;
        for (bank, range) in pending.into_iter().flatten() {
            info!("Program option byte WM {:?}", bank);
            hal.ob_program(&ObProgram::SecureWatermark { bank, range })
                .map_err(|err| {
                    error!("Error while setting WM {:?} : {:?}", bank, err);
                    FatalHardwareFault::WatermarkProgram(bank)
                })?;
        }
        info!("OB Launch ...");
        hal.ob_launch().map_err(|err| {
            error!("Error while executing OB_Launch : {:?}", err);
            FatalHardwareFault::WatermarkLaunch
        })?;
        Ok(WatermarkStatus::Updated)
    }
}
