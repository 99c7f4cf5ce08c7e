// Licensed under the Apache-2.0 license

//! AES-256-CBC through the secure AES engine keyed with the derived
//! hardware unique key.

use zeroize::Zeroize;

use crate::error::CipherError;
use crate::hil::{CipherConfig, CipherEngine, CipherMode, KeyEpoch, KeySelect};

/// Public IV shared by every key store record.
pub const OBK_AES_IV: [u32; 4] = [0x8001_D1CE, 0xD1CE_D1CE, 0xD1CE_8001, 0xCED1_CED1];

/// Largest buffer processed in one call, in bytes.
pub const MAX_CIPHER_LEN: usize = 0x60;

const MAX_CIPHER_WORDS: usize = MAX_CIPHER_LEN / 4;

const OBK_CIPHER_CONFIG: CipherConfig = CipherConfig {
    key: KeySelect::HardwareUnique,
    mode: CipherMode::Cbc,
    iv: OBK_AES_IV,
};

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

pub struct SaesCipher<'a, H: CipherEngine + ?Sized> {
    engine: &'a mut H,
    timeout_ms: u32,
}

impl<'a, H: CipherEngine + ?Sized> SaesCipher<'a, H> {
    pub fn new(engine: &'a mut H, timeout_ms: u32) -> Self {
        Self { engine, timeout_ms }
    }

    /// Encrypt `plaintext` into the start of `ciphertext`.
    pub fn encrypt_block(&mut self, plaintext: &[u8], ciphertext: &mut [u8]) -> Result<(), CipherError> {
        self.process(Direction::Encrypt, plaintext, ciphertext)
    }

    /// Decrypt `ciphertext` into the start of `plaintext`.
    pub fn decrypt_block(&mut self, ciphertext: &[u8], plaintext: &mut [u8]) -> Result<(), CipherError> {
        self.process(Direction::Decrypt, ciphertext, plaintext)
    }

    fn process(&mut self, dir: Direction, input: &[u8], output: &mut [u8]) -> Result<(), CipherError> {
        if input.len() % 4 != 0 {
            return Err(CipherError::Alignment(input.len()));
        }
        if input.len() > MAX_CIPHER_LEN || output.len() < input.len() {
            return Err(CipherError::BufferSize(input.len()));
        }
        let words = input.len() / 4;

        let mut src = [0u32; MAX_CIPHER_WORDS];
        let mut dst = [0u32; MAX_CIPHER_WORDS];
        for (word, chunk) in src.iter_mut().zip(input.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        // The epoch register may have been changed by the non-secure side.
        self.engine.select_epoch(KeyEpoch::Secure);
        let result = self.run(dir, &src[..words], &mut dst[..words]);
        if result.is_ok() {
            for (chunk, word) in output.chunks_exact_mut(4).zip(dst[..words].iter()) {
                chunk.copy_from_slice(&word.to_le_bytes());
            }
        }
        src.zeroize();
        dst.zeroize();
        result
    }

    fn run(&mut self, dir: Direction, src: &[u32], dst: &mut [u32]) -> Result<(), CipherError> {
        self.engine
            .cipher_deinit()
            .map_err(|_| CipherError::Deinit)?;
        self.engine
            .cipher_init(&OBK_CIPHER_CONFIG)
            .map_err(|_| CipherError::Init)?;
        match dir {
            Direction::Encrypt => self.engine.encrypt(src, dst, self.timeout_ms),
            Direction::Decrypt => self.engine.decrypt(src, dst, self.timeout_ms),
        }
        .map_err(|_| CipherError::Process)?;
        self.engine
            .cipher_deinit()
            .map_err(|_| CipherError::Release)
    }
}
