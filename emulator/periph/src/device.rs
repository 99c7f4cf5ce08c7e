/*++

Licensed under the Apache-2.0 license.

File Name:

    device.rs

Abstract:

    Complete emulated part: option bytes, OBK, SAES, HASH and system
    control behind the provisioning hardware interface.

--*/

use std::fs::File;
use std::io::Seek;
use std::path::PathBuf;

use bitflags::bitflags;
use log::{debug, warn};
use prov_config::{ObkLayout, WatermarkRange};
use prov_rom_common::hil::*;
use prov_rom_common::ProductState;
use serde::{Deserialize, Serialize};

use crate::hash::HashAccel;
use crate::obk::ObkBanks;
use crate::option_bytes::OptionBytes;
use crate::reset::DeviceReset;
use crate::saes::Saes;

bitflags! {
    /// Operations forced to fail.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Faults: u32 {
        const OB_UNLOCK = 1 << 0;
        const OB_PROGRAM = 1 << 1;
        const OB_LAUNCH = 1 << 2;
        const OBK_UNLOCK = 1 << 3;
        const OBK_ERASE = 1 << 4;
        const OBK_PROGRAM = 1 << 5;
        const OBK_SWAP = 1 << 6;
        const CIPHER_DEINIT = 1 << 7;
        const CIPHER_INIT = 1 << 8;
        const CIPHER_PROCESS = 1 << 9;
        const HASH_DEINIT = 1 << 10;
        const HASH_INIT = 1 << 11;
        const HASH_COMPUTE = 1 << 12;
    }
}

#[derive(Clone)]
pub struct DeviceArgs {
    /// File keeping option bytes and OBK content across emulator runs.
    pub file_name: Option<PathBuf>,
    pub uid: [u8; 12],
    pub product_state: u8,
    pub boot_ube: u8,
    pub layout: ObkLayout,
}

impl Default for DeviceArgs {
    fn default() -> Self {
        Self {
            file_name: None,
            uid: *b"H573-EMU-001",
            product_state: ProductState::Open.code(),
            boot_ube: 0xB4,
            layout: ObkLayout::default(),
        }
    }
}

#[derive(Deserialize, Serialize)]
struct DeviceState {
    optsr: u32,
    optsr2: u32,
    watermarks: [(u32, u32); 2],
    obk: Vec<u8>,
}

/// Operation counters, never cleared by a reset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub ob_programs: Vec<ObProgram>,
    pub ob_launches: usize,
    pub obk_erases: usize,
    pub obk_programs: usize,
    pub obk_swaps: usize,
    pub cipher_runs: usize,
    pub hash_runs: usize,
    pub resets: usize,
    pub delay_ms: u64,
}

pub struct EmulatedDevice {
    file: Option<File>,
    option_bytes: OptionBytes,
    obk: ObkBanks,
    saes: Saes,
    hash: HashAccel,
    pub faults: Faults,
    pub stats: DeviceStats,
}

impl Drop for EmulatedDevice {
    fn drop(&mut self) {
        if let Err(err) = self.save_to_file() {
            warn!("Could not save device state: {}", err);
        }
    }
}

impl EmulatedDevice {
    pub fn new(args: DeviceArgs) -> Result<Self, std::io::Error> {
        let file = if let Some(path) = &args.file_name {
            Some(
                File::options()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)?,
            )
        } else {
            None
        };

        let mut device = Self {
            file,
            option_bytes: OptionBytes::new(args.product_state, args.boot_ube),
            obk: ObkBanks::new(args.layout.size() as usize),
            saes: Saes::new(args.uid),
            hash: HashAccel::default(),
            faults: Faults::empty(),
            stats: DeviceStats::default(),
        };
        device.read_from_file()?;
        Ok(device)
    }

    fn state(&self) -> DeviceState {
        let [wm1, wm2] = self.option_bytes.watermarks();
        DeviceState {
            optsr: self.option_bytes.status().0,
            optsr2: self.option_bytes.status2().0,
            watermarks: [(wm1.start, wm1.end), (wm2.start, wm2.end)],
            obk: self.obk.active().to_vec(),
        }
    }

    fn load_state(&mut self, state: DeviceState) {
        let watermarks = state
            .watermarks
            .map(|(start, end)| WatermarkRange::new(start, end));
        self.option_bytes = OptionBytes::from_raw(state.optsr, state.optsr2, watermarks);
        self.obk = ObkBanks::from_active(state.obk);
    }

    fn read_from_file(&mut self) -> Result<(), std::io::Error> {
        if let Some(file) = &mut self.file {
            if file.metadata()?.len() > 0 {
                file.rewind()?;
                let state: DeviceState = serde_json::from_reader(&*file)?;
                self.load_state(state);
            }
        }
        Ok(())
    }

    fn save_to_file(&mut self) -> Result<(), std::io::Error> {
        let state = self.state();
        if let Some(file) = &mut self.file {
            file.rewind()?;
            file.set_len(0)?;
            serde_json::to_writer(&*file, &state)?;
            file.sync_all()?;
        }
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(err) = self.save_to_file() {
            warn!("Could not save device state: {}", err);
        }
    }

    fn check(&self, fault: Faults) -> Result<(), HalError> {
        if self.faults.contains(fault) {
            debug!("[EMU] injected fault {:?}", fault);
            Err(HalError::FAIL)
        } else {
            Ok(())
        }
    }

    pub fn product_state(&self) -> ProductState {
        ProductState::from(self.option_bytes.status().product_state())
    }

    pub fn option_bytes(&self) -> &OptionBytes {
        &self.option_bytes
    }

    pub fn option_bytes_mut(&mut self) -> &mut OptionBytes {
        &mut self.option_bytes
    }

    pub fn obk(&self) -> &ObkBanks {
        &self.obk
    }

    pub fn saes(&self) -> &Saes {
        &self.saes
    }

    /// True when no register block was left unlocked.
    pub fn is_locked(&self) -> bool {
        !self.option_bytes.is_unlocked() && !self.obk.is_unlocked()
    }
}

impl OptionByteCtrl for EmulatedDevice {
    fn ob_unlock(&mut self) -> Result<(), HalError> {
        self.check(Faults::OB_UNLOCK)?;
        self.option_bytes.unlock();
        Ok(())
    }

    fn ob_lock(&mut self) {
        self.option_bytes.lock();
    }

    fn option_status(&self) -> OptionStatus {
        self.option_bytes.status()
    }

    fn option_status2(&self) -> OptionStatus2 {
        self.option_bytes.status2()
    }

    fn secure_watermark(&self, bank: FlashBank) -> WatermarkRange {
        self.option_bytes.watermark(bank)
    }

    fn ob_program(&mut self, request: &ObProgram) -> Result<(), HalError> {
        self.check(Faults::OB_PROGRAM)?;
        self.option_bytes.program(request)?;
        self.stats.ob_programs.push(*request);
        Ok(())
    }

    fn ob_launch(&mut self) -> Result<(), HalError> {
        self.check(Faults::OB_LAUNCH)?;
        self.option_bytes.launch()?;
        self.stats.ob_launches += 1;
        self.persist();
        Ok(())
    }
}

impl ObkFlash for EmulatedDevice {
    fn obk_unlock(&mut self) -> Result<(), HalError> {
        self.check(Faults::OBK_UNLOCK)?;
        self.obk.unlock();
        Ok(())
    }

    fn obk_lock(&mut self) {
        self.obk.lock();
    }

    fn obk_read(&self, offset: u32, buffer: &mut [u8]) -> Result<(), HalError> {
        self.obk.read(offset, buffer)
    }

    fn obk_erase_alt(&mut self) -> Result<(), HalError> {
        self.check(Faults::OBK_ERASE)?;
        self.obk.erase_alt()?;
        self.stats.obk_erases += 1;
        Ok(())
    }

    fn obk_program_alt(&mut self, offset: u32, data: &[u8; 16]) -> Result<(), HalError> {
        self.check(Faults::OBK_PROGRAM)?;
        self.obk.program_alt(offset, data)?;
        self.stats.obk_programs += 1;
        Ok(())
    }

    fn obk_swap(&mut self, key_count: u32) -> Result<(), HalError> {
        self.check(Faults::OBK_SWAP)?;
        self.obk.swap(key_count)?;
        self.stats.obk_swaps += 1;
        self.persist();
        Ok(())
    }
}

impl CipherEngine for EmulatedDevice {
    fn select_epoch(&mut self, epoch: KeyEpoch) {
        self.saes.select_epoch(epoch);
    }

    fn cipher_deinit(&mut self) -> Result<(), HalError> {
        self.check(Faults::CIPHER_DEINIT)?;
        self.saes.deinit();
        Ok(())
    }

    fn cipher_init(&mut self, config: &CipherConfig) -> Result<(), HalError> {
        self.check(Faults::CIPHER_INIT)?;
        self.saes.init(config)
    }

    fn encrypt(&mut self, input: &[u32], output: &mut [u32], _timeout_ms: u32) -> Result<(), HalError> {
        self.check(Faults::CIPHER_PROCESS)?;
        self.stats.cipher_runs += 1;
        self.saes.encrypt(input, output)
    }

    fn decrypt(&mut self, input: &[u32], output: &mut [u32], _timeout_ms: u32) -> Result<(), HalError> {
        self.check(Faults::CIPHER_PROCESS)?;
        self.stats.cipher_runs += 1;
        self.saes.decrypt(input, output)
    }
}

impl HashEngine for EmulatedDevice {
    fn hash_deinit(&mut self) -> Result<(), HalError> {
        self.check(Faults::HASH_DEINIT)?;
        self.hash.deinit();
        Ok(())
    }

    fn hash_init(&mut self, algorithm: HashAlgorithm) -> Result<(), HalError> {
        self.check(Faults::HASH_INIT)?;
        self.hash.init(algorithm);
        Ok(())
    }

    fn hash_compute(&mut self, data: &[u8], digest: &mut [u8; 32], _timeout_ms: u32) -> Result<(), HalError> {
        self.check(Faults::HASH_COMPUTE)?;
        self.stats.hash_runs += 1;
        self.hash.compute(data, digest)
    }
}

impl SystemCtrl for EmulatedDevice {
    fn reset(&mut self) -> ! {
        self.stats.resets += 1;
        debug!("[EMU] system reset #{}", self.stats.resets);
        self.option_bytes.reset();
        self.obk.lock();
        self.saes.deinit();
        self.saes.select_epoch(KeyEpoch::NonSecure);
        self.hash.deinit();
        self.persist();
        std::panic::panic_any(DeviceReset {
            count: self.stats.resets,
        })
    }

    fn delay_ms(&mut self, ms: u32) {
        self.stats.delay_ms += u64::from(ms);
    }
}
