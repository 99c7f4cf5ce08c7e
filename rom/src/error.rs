// Licensed under the Apache-2.0 license

use prov_error::ProvError;
use thiserror::Error;

use crate::hil::FlashBank;
use crate::product_state::ProductState;

/// Input rejected before any hardware was touched. Safe to retry once
/// the input is fixed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Wrong header encrypted value (0x{0:x})")]
    EncryptedFlag(u32),
    #[error("Wrong address (0x{0:x})")]
    Address(u32),
    #[error("Wrong size (0x{0:x})")]
    Length(u32),
    #[error("Address 0x{0:x} is outside the key store")]
    OutOfRegion(u32),
    #[error("Record truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("Wrong hash")]
    DigestMismatch,
    #[error("Boot UBE not set properly: 0x{0:x}")]
    BootUbe(u8),
    #[error("Refusing to move product state from {from} back to {to}")]
    BackwardTransition { from: ProductState, to: ProductState },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityEngineError {
    #[error("Hash engine de-init failed")]
    Deinit,
    #[error("Hash engine init failed")]
    Init,
    #[error("Hash computation failed")]
    Compute,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    #[error("Cipher input of {0} bytes is not word aligned")]
    Alignment(usize),
    #[error("Cipher buffer of {0} bytes is too large or output too small")]
    BufferSize(usize),
    #[error("Cipher de-init failed")]
    Deinit,
    #[error("Cipher init failed")]
    Init,
    #[error("Cipher processing failed")]
    Process,
    #[error("Cipher de-init after processing failed")]
    Release,
}

/// Key store failure. `code()` identifies the failure point.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObkError {
    #[error("Key store range 0x{offset:x}+0x{length:x} is out of bounds or misaligned")]
    InvalidRange { offset: u32, length: usize },
    #[error("Key store cipher de-init failed")]
    CipherDeinit,
    #[error("Key store cipher init failed")]
    CipherInit,
    #[error("Key store encrypt or decrypt failed")]
    CipherProcess,
    #[error("Key store cipher de-init after processing failed")]
    CipherRelease,
    #[error("Key store alternate bank erase failed")]
    Erase,
    #[error("Key store program failed at offset 0x{0:x}")]
    Program(u32),
    #[error("Key store swap failed")]
    Swap,
}

impl ObkError {
    pub fn code(&self) -> u32 {
        match self {
            ObkError::InvalidRange { .. } => 1,
            ObkError::CipherDeinit => 2,
            ObkError::CipherInit => 3,
            ObkError::CipherProcess => 4,
            ObkError::CipherRelease => 5,
            ObkError::Erase => 6,
            ObkError::Program(_) => 7,
            ObkError::Swap => 8,
        }
    }
}

impl From<CipherError> for ObkError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Deinit => ObkError::CipherDeinit,
            CipherError::Init => ObkError::CipherInit,
            CipherError::Alignment(_) | CipherError::BufferSize(_) | CipherError::Process => {
                ObkError::CipherProcess
            }
            CipherError::Release => ObkError::CipherRelease,
        }
    }
}

/// Option byte write that did not complete. The option bytes may be in an
/// inconsistent state, execution must not continue.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalHardwareFault {
    #[error("Error while setting product state 0x{0:x}")]
    ProductStateProgram(u8),
    #[error("Error while executing OB launch for product state 0x{0:x}")]
    ProductStateLaunch(u8),
    #[error("Error while setting TrustZone")]
    TrustZoneProgram,
    #[error("Error while executing OB launch for TrustZone")]
    TrustZoneLaunch,
    #[error("Error while setting WM {0:?}")]
    WatermarkProgram(FlashBank),
    #[error("Error while executing OB launch for watermarks")]
    WatermarkLaunch,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("HASH fail: {0}")]
    Integrity(#[from] IntegrityEngineError),
    #[error("Error writing OBK: {0} (code {code})", code = .0.code())]
    KeyStore(#[from] ObkError),
    #[error("Fatal: {0}")]
    Fatal(#[from] FatalHardwareFault),
}

impl ProvisionError {
    /// Fatal errors must end in the terminal handler, never in a retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProvisionError::Fatal(_))
    }
}

impl From<&ValidationError> for ProvError {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::EncryptedFlag(_) => ProvError::PROVISION_BAD_ENCRYPTED_FLAG,
            ValidationError::Address(_) => ProvError::PROVISION_BAD_ADDRESS,
            ValidationError::Length(_) => ProvError::PROVISION_BAD_LENGTH,
            ValidationError::OutOfRegion(_) => ProvError::PROVISION_ADDRESS_OUT_OF_REGION,
            ValidationError::Truncated { .. } => ProvError::PROVISION_RECORD_TRUNCATED,
            ValidationError::DigestMismatch => ProvError::INTEGRITY_DIGEST_MISMATCH,
            ValidationError::BootUbe(_) => ProvError::PRODUCT_STATE_BOOT_UBE,
            ValidationError::BackwardTransition { .. } => ProvError::PRODUCT_STATE_BACKWARD,
        }
    }
}

impl From<&IntegrityEngineError> for ProvError {
    fn from(err: &IntegrityEngineError) -> Self {
        match err {
            IntegrityEngineError::Deinit => ProvError::INTEGRITY_ENGINE_DEINIT,
            IntegrityEngineError::Init => ProvError::INTEGRITY_ENGINE_INIT,
            IntegrityEngineError::Compute => ProvError::INTEGRITY_ENGINE_COMPUTE,
        }
    }
}

impl From<&CipherError> for ProvError {
    fn from(err: &CipherError) -> Self {
        match err {
            CipherError::Alignment(_) => ProvError::CIPHER_ALIGNMENT,
            CipherError::BufferSize(_) => ProvError::CIPHER_BUFFER_TOO_SMALL,
            CipherError::Deinit => ProvError::CIPHER_DEINIT,
            CipherError::Init => ProvError::CIPHER_INIT,
            CipherError::Process | CipherError::Release => ProvError::CIPHER_PROCESS,
        }
    }
}

impl From<&ObkError> for ProvError {
    fn from(err: &ObkError) -> Self {
        match err {
            ObkError::InvalidRange { .. } => ProvError::OBK_INVALID_RANGE,
            ObkError::CipherDeinit => ProvError::OBK_CIPHER_DEINIT,
            ObkError::CipherInit => ProvError::OBK_CIPHER_INIT,
            ObkError::CipherProcess => ProvError::OBK_CIPHER_PROCESS,
            ObkError::CipherRelease => ProvError::OBK_CIPHER_RELEASE,
            ObkError::Erase => ProvError::OBK_ERASE,
            ObkError::Program(_) => ProvError::OBK_PROGRAM,
            ObkError::Swap => ProvError::OBK_SWAP,
        }
    }
}

impl From<&FatalHardwareFault> for ProvError {
    fn from(err: &FatalHardwareFault) -> Self {
        match err {
            FatalHardwareFault::ProductStateProgram(_) => ProvError::PRODUCT_STATE_PROGRAM,
            FatalHardwareFault::ProductStateLaunch(_) => ProvError::PRODUCT_STATE_LAUNCH,
            FatalHardwareFault::TrustZoneProgram => ProvError::TRUSTZONE_PROGRAM,
            FatalHardwareFault::TrustZoneLaunch => ProvError::TRUSTZONE_LAUNCH,
            FatalHardwareFault::WatermarkProgram(FlashBank::Bank1) => {
                ProvError::WATERMARK_BANK1_PROGRAM
            }
            FatalHardwareFault::WatermarkProgram(FlashBank::Bank2) => {
                ProvError::WATERMARK_BANK2_PROGRAM
            }
            FatalHardwareFault::WatermarkLaunch => ProvError::WATERMARK_LAUNCH,
        }
    }
}

impl From<&ProvisionError> for ProvError {
    fn from(err: &ProvisionError) -> Self {
        match err {
            ProvisionError::Validation(e) => e.into(),
            ProvisionError::Integrity(e) => e.into(),
            ProvisionError::KeyStore(e) => e.into(),
            ProvisionError::Fatal(e) => e.into(),
        }
    }
}
