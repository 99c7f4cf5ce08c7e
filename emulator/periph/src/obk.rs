/*++

Licensed under the Apache-2.0 license.

File Name:

    obk.rs

Abstract:

    Option-byte key area with an active and an alternate bank.

--*/

use log::trace;
use prov_rom_common::hil::HalError;
use prov_rom_common::obk::OBK_PROG_UNIT;

const ERASED: u8 = 0xFF;

#[derive(Clone, Debug)]
pub struct ObkBanks {
    active: Vec<u8>,
    alt: Vec<u8>,
    unlocked: bool,
}

impl ObkBanks {
    /// Both banks erased.
    pub fn new(size: usize) -> Self {
        Self::from_active(vec![ERASED; size])
    }

    pub fn from_active(active: Vec<u8>) -> Self {
        Self {
            alt: vec![ERASED; active.len()],
            active,
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

    pub fn active(&self) -> &[u8] {
        &self.active
    }

    pub fn alt(&self) -> &[u8] {
        &self.alt
    }

    pub fn read(&self, offset: u32, buffer: &mut [u8]) -> Result<(), HalError> {
        let start = offset as usize;
        let src = start
            .checked_add(buffer.len())
            .and_then(|end| self.active.get(start..end))
            .ok_or(HalError::INVAL)?;
        buffer.copy_from_slice(src);
        Ok(())
    }

    pub fn erase_alt(&mut self) -> Result<(), HalError> {
        if !self.unlocked {
            return Err(HalError::LOCKED);
        }
        self.alt.fill(ERASED);
        Ok(())
    }

    /// Program one quad-word. Flash only clears bits, so the target must be
    /// erased.
    pub fn program_alt(&mut self, offset: u32, data: &[u8; OBK_PROG_UNIT]) -> Result<(), HalError> {
        if !self.unlocked {
            return Err(HalError::LOCKED);
        }
        let start = offset as usize;
        if start % OBK_PROG_UNIT != 0 {
            return Err(HalError::INVAL);
        }
        let dst = self
            .alt
            .get_mut(start..start + OBK_PROG_UNIT)
            .ok_or(HalError::INVAL)?;
        if dst.iter().any(|b| *b != ERASED) {
            return Err(HalError::FAIL);
        }
        dst.copy_from_slice(data);
        trace!("[OBK] programmed alt 0x{:03x}", offset);
        Ok(())
    }

    /// Activate the alternate bank.
    ///
    /// The first `key_count` key slots still erased in the alternate bank
    /// are carried over from the active one before the banks trade places.
    pub fn swap(&mut self, key_count: u32) -> Result<(), HalError> {
        if !self.unlocked {
            return Err(HalError::LOCKED);
        }
        let slots = (key_count as usize).min(self.active.len() / OBK_PROG_UNIT);
        for slot in 0..slots {
            let range = slot * OBK_PROG_UNIT..(slot + 1) * OBK_PROG_UNIT;
            if self.alt[range.clone()].iter().all(|b| *b == ERASED) {
                let src = self.active[range.clone()].to_vec();
                self.alt[range].copy_from_slice(&src);
            }
        }
        core::mem::swap(&mut self.active, &mut self.alt);
        Ok(())
    }
}
