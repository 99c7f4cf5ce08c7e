// Licensed under the Apache-2.0 license

use constant_time_eq::constant_time_eq;
use log::debug;

use crate::error::IntegrityEngineError;
use crate::hil::{HashAlgorithm, HashEngine};

pub const SHA256_DIGEST_LEN: usize = 32;

/// SHA-256 over the hardware hash engine.
pub struct IntegrityVerifier<'a, H: HashEngine + ?Sized> {
    engine: &'a mut H,
    timeout_ms: u32,
}

impl<'a, H: HashEngine + ?Sized> IntegrityVerifier<'a, H> {
    pub fn new(engine: &'a mut H, timeout_ms: u32) -> Self {
        Self { engine, timeout_ms }
    }

    pub fn digest(&mut self, data: &[u8]) -> Result<[u8; SHA256_DIGEST_LEN], IntegrityEngineError> {
        self.engine
            .hash_deinit()
            .map_err(|_| IntegrityEngineError::Deinit)?;
        self.engine
            .hash_init(HashAlgorithm::Sha256)
            .map_err(|_| IntegrityEngineError::Init)?;

        let mut digest = [0u8; SHA256_DIGEST_LEN];
        self.engine
            .hash_compute(data, &mut digest, self.timeout_ms)
            .map_err(|err| {
                debug!("hash engine error {:?}", err);
                IntegrityEngineError::Compute
            })?;
        Ok(digest)
    }

    /// Hash `data` and compare it with `expected` in constant time.
    pub fn verify(&mut self, data: &[u8], expected: &[u8]) -> Result<bool, IntegrityEngineError> {
        let digest = self.digest(data)?;
        Ok(constant_time_equal(&digest, expected, SHA256_DIGEST_LEN))
    }
}

/// Compare the first `size` bytes of `a` and `b`.
///
/// Run time depends on `size` only, never on where the buffers differ.
/// Buffers shorter than `size` never compare equal.
pub fn constant_time_equal(a: &[u8], b: &[u8], size: usize) -> bool {
    match (a.get(..size), b.get(..size)) {
        (Some(a), Some(b)) => constant_time_eq(a, b),
        _ => false,
    }
}
