/*++

Licensed under the Apache-2.0 license.

File Name:

    saes.rs

Abstract:

    Secure AES engine. The only key is the derived hardware unique key
    (DHUK), a function of the device UID and the current key epoch.

--*/

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use prov_rom_common::hil::{CipherConfig, CipherMode, HalError, KeyEpoch, KeySelect};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const AES_BLOCK_SIZE: usize = 16;

pub struct Saes {
    uid: [u8; 12],
    epoch: KeyEpoch,
    config: Option<CipherConfig>,
}

impl Saes {
    pub fn new(uid: [u8; 12]) -> Self {
        Self {
            uid,
            epoch: KeyEpoch::NonSecure,
            config: None,
        }
    }

    pub fn epoch(&self) -> KeyEpoch {
        self.epoch
    }

    pub fn select_epoch(&mut self, epoch: KeyEpoch) {
        self.epoch = epoch;
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn deinit(&mut self) {
        self.config = None;
    }

    pub fn init(&mut self, config: &CipherConfig) -> Result<(), HalError> {
        match (config.key, config.mode) {
            (KeySelect::HardwareUnique, CipherMode::Cbc) => {
                self.config = Some(*config);
                Ok(())
            }
        }
    }

    fn dhuk(&self) -> [u8; 32] {
        let epoch: u8 = match self.epoch {
            KeyEpoch::NonSecure => 0,
            KeyEpoch::Secure => 1,
        };
        let mut hasher = Sha256::new();
        hasher.update(self.uid);
        hasher.update([epoch]);
        hasher.finalize().into()
    }

    /// Load the words into a byte buffer, most significant byte first.
    fn prepare(
        &self,
        input: &[u32],
        output: &[u32],
    ) -> Result<(CipherConfig, Vec<u8>), HalError> {
        let config = self.config.ok_or(HalError::FAIL)?;
        if input.len() * 4 % AES_BLOCK_SIZE != 0 {
            return Err(HalError::SIZE);
        }
        if output.len() < input.len() {
            return Err(HalError::SIZE);
        }
        Ok((config, input.iter().flat_map(|w| w.to_be_bytes()).collect()))
    }

    fn iv_bytes(config: &CipherConfig) -> [u8; AES_BLOCK_SIZE] {
        let mut iv = [0u8; AES_BLOCK_SIZE];
        for (chunk, word) in iv.chunks_exact_mut(4).zip(config.iv) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        iv
    }

    fn store(buf: &[u8], output: &mut [u32]) {
        for (word, chunk) in output.iter_mut().zip(buf.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }

    pub fn encrypt(&mut self, input: &[u32], output: &mut [u32]) -> Result<(), HalError> {
        let (config, mut buf) = self.prepare(input, output)?;
        let mut key = self.dhuk();
        let mut cipher = Aes256CbcEnc::new(&key.into(), &Self::iv_bytes(&config).into());
        for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
            cipher.encrypt_block_mut(aes::Block::from_mut_slice(block));
        }
        key.zeroize();
        Self::store(&buf, output);
        buf.zeroize();
        Ok(())
    }

    pub fn decrypt(&mut self, input: &[u32], output: &mut [u32]) -> Result<(), HalError> {
        let (config, mut buf) = self.prepare(input, output)?;
        let mut key = self.dhuk();
        let mut cipher = Aes256CbcDec::new(&key.into(), &Self::iv_bytes(&config).into());
        for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
            cipher.decrypt_block_mut(aes::Block::from_mut_slice(block));
        }
        key.zeroize();
        Self::store(&buf, output);
        buf.zeroize();
        Ok(())
    }
}
