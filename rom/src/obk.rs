/*++

Licensed under the Apache-2.0 license.

File Name:

    obk.rs

Abstract:

    Encrypted writer and reader for the option-byte key (OBK) area.

--*/

use log::{debug, error};
use prov_config::{ObkLayout, Timing};
use zeroize::Zeroize;

use crate::cipher::{SaesCipher, MAX_CIPHER_LEN};
use crate::error::ObkError;
use crate::hil::{CipherEngine, ObkFlash, ObkUnlocked, SystemCtrl};

/// Smallest programmable unit of the OBK area.
pub const OBK_PROG_UNIT: usize = 16;

/// Value of an erased OBK word.
pub const OBK_ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Bound-checked access to the HDPL1 part of the OBK area.
pub struct KeyStore<'a, H: ObkFlash + CipherEngine + SystemCtrl + ?Sized> {
    hal: &'a mut H,
    layout: ObkLayout,
    timing: Timing,
}

impl<'a, H: ObkFlash + CipherEngine + SystemCtrl + ?Sized> KeyStore<'a, H> {
    pub fn new(hal: &'a mut H, layout: ObkLayout, timing: Timing) -> Self {
        Self {
            hal,
            layout,
            timing,
        }
    }

    /// The last byte touched must not pass the end of the area.
    fn is_range_valid(&self, offset: u32, length: usize) -> bool {
        if length == 0 {
            return false;
        }
        let Ok(length) = u32::try_from(length) else {
            return false;
        };
        match offset.checked_add(length - 1) {
            Some(last) => last <= self.layout.hdpl1_end,
            None => false,
        }
    }

    fn check_range(&self, offset: u32, length: usize) -> Result<(), ObkError> {
        if self.is_range_valid(offset, length) {
            Ok(())
        } else {
            Err(ObkError::InvalidRange { offset, length })
        }
    }

    fn max_len(&self) -> usize {
        (self.layout.max_record_size as usize).min(MAX_CIPHER_LEN)
    }

    /// Encrypt `data` and commit it at `offset`.
    ///
    /// The whole alternate bank is erased, the ciphertext programmed in
    /// quad-words and all key slots swapped in one go. A failure after the
    /// erase leaves the alternate bank partially written and is never
    /// retried here.
    pub fn write_encrypted(&mut self, offset: u32, data: &[u8]) -> Result<(), ObkError> {
        let length = data.len();
        let unit = self.layout.prog_unit as usize;
        if !self.is_range_valid(offset, length)
            || offset as usize % unit != 0
            || length % unit != 0
            || length > self.max_len()
        {
            return Err(ObkError::InvalidRange { offset, length });
        }

        let mut hal = ObkUnlocked::acquire(&mut *self.hal).map_err(|err| {
            error!("OBK unlock failed: {:?}", err);
            ObkError::Erase
        })?;

        let mut ciphertext = [0u8; MAX_CIPHER_LEN];
        SaesCipher::new(&mut *hal, self.timing.hw_timeout_ms)
            .encrypt_block(data, &mut ciphertext)?;

        hal.obk_erase_alt().map_err(|_| ObkError::Erase)?;

        for (i, unit) in ciphertext[..length].chunks_exact(OBK_PROG_UNIT).enumerate() {
            let dest = offset + (i * OBK_PROG_UNIT) as u32;
            let mut quad = [0u8; OBK_PROG_UNIT];
            quad.copy_from_slice(unit);
            hal.obk_program_alt(dest, &quad)
                .map_err(|_| ObkError::Program(dest))?;
        }

        hal.obk_swap(self.layout.swap_key_count)
            .map_err(|_| ObkError::Swap)?;
        debug!("OBK 0x{:x} bytes committed at offset 0x{:x}", length, offset);
        Ok(())
    }

    /// Raw copy of the stored bytes, one word at a time.
    ///
    /// ECC double errors are not reported at this level, callers that need
    /// integrity should use [`Self::read_and_decrypt`].
    pub fn read_plain(&mut self, offset: u32, buffer: &mut [u8]) -> Result<(), ObkError> {
        self.check_range(offset, buffer.len())?;
        let delay = self.timing.obk_read_delay_ms;
        for (i, chunk) in buffer.chunks_mut(4).enumerate() {
            let addr = offset + (i * 4) as u32;
            self.hal
                .obk_read(addr, chunk)
                .map_err(|_| ObkError::InvalidRange {
                    offset: addr,
                    length: chunk.len(),
                })?;
            self.hal.delay_ms(delay);
        }
        Ok(())
    }

    /// Read ciphertext at `offset` and decrypt it into `buffer`.
    pub fn read_and_decrypt(&mut self, offset: u32, buffer: &mut [u8]) -> Result<(), ObkError> {
        let length = buffer.len();
        self.check_range(offset, length)?;
        if length > self.max_len() {
            return Err(ObkError::InvalidRange { offset, length });
        }

        let mut ciphertext = [0u8; MAX_CIPHER_LEN];
        self.hal
            .obk_read(offset, &mut ciphertext[..length])
            .map_err(|_| ObkError::InvalidRange { offset, length })?;

        let result = SaesCipher::new(&mut *self.hal, self.timing.hw_timeout_ms)
            .decrypt_block(&ciphertext[..length], buffer);
        ciphertext.zeroize();
        result.map_err(ObkError::from)
    }

    /// True when the word at `offset` still reads as erased.
    pub fn is_erased(&mut self, offset: u32) -> Result<bool, ObkError> {
        self.check_range(offset, 4)?;
        let mut word = [0u8; 4];
        self.hal
            .obk_read(offset, &mut word)
            .map_err(|_| ObkError::InvalidRange { offset, length: 4 })?;
        Ok(u32::from_le_bytes(word) == OBK_ERASED_WORD)
    }
}
