// Licensed under the Apache-2.0 license

//! Minimal in-memory part used by the unit tests of this crate.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use prov_config::{ObkLayout, ProvisioningConfig, WatermarkRange};
use sha2::{Digest, Sha256};

use crate::hil::*;
use crate::product_state::ProductState;

pub(crate) struct ResetSignal;

pub(crate) enum Boot<R> {
    Returned(R),
    Reset,
}

/// Run `f` until it returns or resets the device.
pub(crate) fn run_until_reset<R>(f: impl FnOnce() -> R) -> Boot<R> {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().downcast_ref::<ResetSignal>().is_none() {
                default(info);
            }
        }));
    });
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => Boot::Returned(r),
        Err(payload) if payload.is::<ResetSignal>() => Boot::Reset,
        Err(payload) => panic::resume_unwind(payload),
    }
}

pub(crate) struct FakeDevice {
    pub optsr: OptionStatus,
    pub optsr2: OptionStatus2,
    pub watermarks: [WatermarkRange; 2],
    pending: Vec<ObProgram>,
    pub ob_programs: Vec<ObProgram>,
    pub ob_unlocked: bool,
    pub launches: usize,
    pub fail_ob_program: bool,
    pub fail_ob_launch: bool,
    pub obk: Vec<u8>,
    obk_alt: Vec<u8>,
    pub obk_unlocked: bool,
    pub obk_erases: usize,
    pub fail_obk_program: bool,
    epoch: Option<KeyEpoch>,
    cipher: Option<CipherConfig>,
    pub resets: usize,
}

impl FakeDevice {
    pub fn with_state(state: ProductState) -> Self {
        let layout = ObkLayout::default();
        let mut optsr = OptionStatus(0);
        optsr.set_product_state(state.code());
        optsr.set_boot_ube(ProvisioningConfig::default().option_bytes.boot_ube_oem_irot);
        let mut optsr2 = OptionStatus2(0);
        optsr2.set_tzen(0xC3);
        Self {
            optsr,
            optsr2,
            watermarks: [WatermarkRange::new(0x7F, 0); 2],
            pending: Vec::new(),
            ob_programs: Vec::new(),
            ob_unlocked: false,
            launches: 0,
            fail_ob_program: false,
            fail_ob_launch: false,
            obk: vec![0xFF; layout.size() as usize],
            obk_alt: vec![0xFF; layout.size() as usize],
            obk_unlocked: false,
            obk_erases: 0,
            fail_obk_program: false,
            epoch: None,
            cipher: None,
            resets: 0,
        }
    }

    pub fn current_state(&self) -> ProductState {
        ProductState::from(self.optsr.product_state())
    }

    fn xor(&self, input: &[u32], output: &mut [u32]) -> Result<(), HalError> {
        let config = self.cipher.ok_or(HalError::FAIL)?;
        let key = match self.epoch {
            Some(KeyEpoch::Secure) => 0x5EC0_0001,
            _ => 0x0000_0000,
        };
        for (i, (o, w)) in output.iter_mut().zip(input).enumerate() {
            *o = w ^ config.iv[i % 4] ^ key;
        }
        Ok(())
    }
}

impl OptionByteCtrl for FakeDevice {
    fn ob_unlock(&mut self) -> Result<(), HalError> {
        self.ob_unlocked = true;
        Ok(())
    }

    fn ob_lock(&mut self) {
        self.ob_unlocked = false;
    }

    fn option_status(&self) -> OptionStatus {
        self.optsr
    }

    fn option_status2(&self) -> OptionStatus2 {
        self.optsr2
    }

    fn secure_watermark(&self, bank: FlashBank) -> WatermarkRange {
        self.watermarks[bank as usize]
    }

    fn ob_program(&mut self, request: &ObProgram) -> Result<(), HalError> {
        if !self.ob_unlocked {
            return Err(HalError::LOCKED);
        }
        if self.fail_ob_program {
            return Err(HalError::FAIL);
        }
        self.ob_programs.push(*request);
        self.pending.push(*request);
        Ok(())
    }

    fn ob_launch(&mut self) -> Result<(), HalError> {
        if self.fail_ob_launch {
            return Err(HalError::FAIL);
        }
        self.launches += 1;
        for request in self.pending.drain(..) {
            match request {
                ObProgram::ProductState(code) => self.optsr.set_product_state(code),
                ObProgram::TrustZone(tzen) => self.optsr2.set_tzen(tzen),
                ObProgram::SecureWatermark { bank, range } => self.watermarks[bank as usize] = range,
            }
        }
        Ok(())
    }
}

impl ObkFlash for FakeDevice {
    fn obk_unlock(&mut self) -> Result<(), HalError> {
        self.obk_unlocked = true;
        Ok(())
    }

    fn obk_lock(&mut self) {
        self.obk_unlocked = false;
    }

    fn obk_read(&self, offset: u32, buffer: &mut [u8]) -> Result<(), HalError> {
        let start = offset as usize;
        let src = self
            .obk
            .get(start..start + buffer.len())
            .ok_or(HalError::INVAL)?;
        buffer.copy_from_slice(src);
        Ok(())
    }

    fn obk_erase_alt(&mut self) -> Result<(), HalError> {
        if !self.obk_unlocked {
            return Err(HalError::LOCKED);
        }
        self.obk_erases += 1;
        self.obk_alt.fill(0xFF);
        Ok(())
    }

    fn obk_program_alt(&mut self, offset: u32, data: &[u8; 16]) -> Result<(), HalError> {
        if !self.obk_unlocked || self.fail_obk_program {
            return Err(HalError::FAIL);
        }
        let start = offset as usize;
        self.obk_alt[start..start + 16].copy_from_slice(data);
        Ok(())
    }

    fn obk_swap(&mut self, _key_count: u32) -> Result<(), HalError> {
        if !self.obk_unlocked {
            return Err(HalError::LOCKED);
        }
        std::mem::swap(&mut self.obk, &mut self.obk_alt);
        Ok(())
    }
}

impl CipherEngine for FakeDevice {
    fn select_epoch(&mut self, epoch: KeyEpoch) {
        self.epoch = Some(epoch);
    }

    fn cipher_deinit(&mut self) -> Result<(), HalError> {
        self.cipher = None;
        Ok(())
    }

    fn cipher_init(&mut self, config: &CipherConfig) -> Result<(), HalError> {
        self.cipher = Some(*config);
        Ok(())
    }

    fn encrypt(&mut self, input: &[u32], output: &mut [u32], _: u32) -> Result<(), HalError> {
        self.xor(input, output)
    }

    fn decrypt(&mut self, input: &[u32], output: &mut [u32], _: u32) -> Result<(), HalError> {
        self.xor(input, output)
    }
}

impl HashEngine for FakeDevice {
    fn hash_deinit(&mut self) -> Result<(), HalError> {
        Ok(())
    }

    fn hash_init(&mut self, _algorithm: HashAlgorithm) -> Result<(), HalError> {
        Ok(())
    }

    fn hash_compute(&mut self, data: &[u8], digest: &mut [u8; 32], _: u32) -> Result<(), HalError> {
        digest.copy_from_slice(&Sha256::digest(data));
        Ok(())
    }
}

impl SystemCtrl for FakeDevice {
    fn reset(&mut self) -> ! {
        self.resets += 1;
        self.ob_unlocked = false;
        self.obk_unlocked = false;
        self.epoch = None;
        self.cipher = None;
        panic::panic_any(ResetSignal)
    }

    fn delay_ms(&mut self, _ms: u32) {}
}
