// Licensed under the Apache-2.0 license

use prov_rom_common::hil::{HalError, HashAlgorithm};
use sha2::{Digest, Sha256};

/// HASH accelerator, SHA-256 only.
#[derive(Default)]
pub struct HashAccel {
    algorithm: Option<HashAlgorithm>,
}

impl HashAccel {
    pub fn deinit(&mut self) {
        self.algorithm = None;
    }

    pub fn init(&mut self, algorithm: HashAlgorithm) {
        self.algorithm = Some(algorithm);
    }

    pub fn compute(&mut self, data: &[u8], digest: &mut [u8; 32]) -> Result<(), HalError> {
        match self.algorithm {
            Some(HashAlgorithm::Sha256) => {
                digest.copy_from_slice(&Sha256::digest(data));
                Ok(())
            }
            None => Err(HalError::FAIL),
        }
    }
}
