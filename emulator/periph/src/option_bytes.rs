/*++

Licensed under the Apache-2.0 license.

File Name:

    option_bytes.rs

Abstract:

    Option byte controller. Programmed values land in the PRG shadow
    registers and only become current on launch.

--*/

use prov_config::WatermarkRange;
use prov_rom_common::hil::{FlashBank, HalError, ObProgram, OptionStatus, OptionStatus2};

/// TZEN value of a part shipped with TrustZone disabled.
pub const TZEN_DISABLED: u8 = 0xC3;

/// Watermark of a bank with no secure area (start above end).
pub const WATERMARK_DISABLED: WatermarkRange = WatermarkRange::new(0x7F, 0x00);

#[derive(Clone, Debug)]
pub struct OptionBytes {
    optsr_cur: OptionStatus,
    optsr2_cur: OptionStatus2,
    watermark_cur: [WatermarkRange; 2],
    optsr_prg: OptionStatus,
    optsr2_prg: OptionStatus2,
    watermark_prg: [WatermarkRange; 2],
    unlocked: bool,
}

fn bank_index(bank: FlashBank) -> usize {
    match bank {
        FlashBank::Bank1 => 0,
        FlashBank::Bank2 => 1,
    }
}

impl OptionBytes {
    pub fn new(product_state: u8, boot_ube: u8) -> Self {
        let mut optsr = OptionStatus(0);
        optsr.set_product_state(product_state);
        optsr.set_boot_ube(boot_ube);
        let mut optsr2 = OptionStatus2(0);
        optsr2.set_tzen(TZEN_DISABLED);
        Self::from_raw(optsr.0, optsr2.0, [WATERMARK_DISABLED; 2])
    }

    pub fn from_raw(optsr: u32, optsr2: u32, watermarks: [WatermarkRange; 2]) -> Self {
        Self {
            optsr_cur: OptionStatus(optsr),
            optsr2_cur: OptionStatus2(optsr2),
            watermark_cur: watermarks,
            optsr_prg: OptionStatus(optsr),
            optsr2_prg: OptionStatus2(optsr2),
            watermark_prg: watermarks,
            unlocked: false,
        }
    }

    pub fn unlock(&mut self) {
        self.unlocked = true;
    }

    pub fn lock(&mut self) {
        self.unlocked = false;
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn status(&self) -> OptionStatus {
        self.optsr_cur
    }

    pub fn status2(&self) -> OptionStatus2 {
        self.optsr2_cur
    }

    pub fn watermark(&self, bank: FlashBank) -> WatermarkRange {
        self.watermark_cur[bank_index(bank)]
    }

    pub fn watermarks(&self) -> [WatermarkRange; 2] {
        self.watermark_cur
    }

    /// Write a request into the PRG registers.
    pub fn program(&mut self, request: &ObProgram) -> Result<(), HalError> {
        if !self.unlocked {
            return Err(HalError::LOCKED);
        }
        match *request {
            ObProgram::ProductState(code) => self.optsr_prg.set_product_state(code),
            ObProgram::TrustZone(tzen) => self.optsr2_prg.set_tzen(tzen),
            ObProgram::SecureWatermark { bank, range } => {
                if range.start > 0x7F || range.end > 0x7F {
                    return Err(HalError::INVAL);
                }
                self.watermark_prg[bank_index(bank)] = range;
            }
        }
        Ok(())
    }

    /// Copy the PRG registers into the current ones.
    pub fn launch(&mut self) -> Result<(), HalError> {
        if !self.unlocked {
            return Err(HalError::LOCKED);
        }
        self.optsr_cur = self.optsr_prg;
        self.optsr2_cur = self.optsr2_prg;
        self.watermark_cur = self.watermark_prg;
        Ok(())
    }

    /// Values that were programmed but not launched are lost on reset.
    pub fn reset(&mut self) {
        self.optsr_prg = self.optsr_cur;
        self.optsr2_prg = self.optsr2_cur;
        self.watermark_prg = self.watermark_cur;
        self.unlocked = false;
    }

    /// Force the current product state, bypassing the controller.
    pub fn force_product_state(&mut self, code: u8) {
        self.optsr_cur.set_product_state(code);
        self.optsr_prg.set_product_state(code);
    }

    pub fn force_boot_ube(&mut self, code: u8) {
        self.optsr_cur.set_boot_ube(code);
        self.optsr_prg.set_boot_ube(code);
    }
}
