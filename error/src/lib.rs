/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Numeric error codes reported by the provisioning engine to the
    fatal error handler and to the factory log.

--*/
#![cfg_attr(not(test), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Provisioning error code.
///
/// The upper half-word identifies the component, the lower half-word the
/// failure point inside it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProvError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: ProvError = ProvError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl ProvError {
    /// Only usable from const contexts, a zero value fails the build.
    /// Runtime conversions go through `ProvError::try_from()`.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("ProvError cannot be 0"),
        }
    }

    /// Component identifier (upper 16 bits).
    pub const fn component(&self) -> u16 {
        (self.0.get() >> 16) as u16
    }

    /// Failure point inside the component (lower 16 bits).
    pub const fn point(&self) -> u16 {
        (self.0.get() & 0xffff) as u16
    }

    define_error_constants![
        (
            INTEGRITY_ENGINE_DEINIT,
            0x0001_0001,
            "Hash engine could not be de-initialized"
        ),
        (
            INTEGRITY_ENGINE_INIT,
            0x0001_0002,
            "Hash engine could not be initialized"
        ),
        (
            INTEGRITY_ENGINE_COMPUTE,
            0x0001_0003,
            "Hash computation failed or timed out"
        ),
        (
            INTEGRITY_DIGEST_MISMATCH,
            0x0001_0004,
            "Computed digest does not match the expected digest"
        ),
        (
            CIPHER_ALIGNMENT,
            0x0002_0001,
            "Cipher input is not a whole number of 32-bit words"
        ),
        (CIPHER_DEINIT, 0x0002_0002, "Cipher engine de-init failed"),
        (CIPHER_INIT, 0x0002_0003, "Cipher engine init failed"),
        (
            CIPHER_PROCESS,
            0x0002_0004,
            "Cipher engine encrypt or decrypt failed"
        ),
        (
            CIPHER_BUFFER_TOO_SMALL,
            0x0002_0005,
            "Cipher output buffer is smaller than the input"
        ),
        (
            OBK_INVALID_RANGE,
            0x0003_0001,
            "Key store request is out of bounds or misaligned"
        ),
        (
            OBK_CIPHER_DEINIT,
            0x0003_0002,
            "Key store cipher de-init failed"
        ),
        (OBK_CIPHER_INIT, 0x0003_0003, "Key store cipher init failed"),
        (
            OBK_CIPHER_PROCESS,
            0x0003_0004,
            "Key store encrypt or decrypt failed"
        ),
        (
            OBK_CIPHER_RELEASE,
            0x0003_0005,
            "Key store cipher de-init after processing failed"
        ),
        (
            OBK_ERASE,
            0x0003_0006,
            "Key store alternate bank erase failed"
        ),
        (
            OBK_PROGRAM,
            0x0003_0007,
            "Key store quad-word program failed"
        ),
        (OBK_SWAP, 0x0003_0008, "Key store bank swap failed"),
        (
            PRODUCT_STATE_PROGRAM,
            0x0004_0001,
            "Programming the product state option byte failed"
        ),
        (
            PRODUCT_STATE_LAUNCH,
            0x0004_0002,
            "Option byte launch after a product state change failed"
        ),
        (
            PRODUCT_STATE_BACKWARD,
            0x0004_0003,
            "Requested product state is behind the current one"
        ),
        (
            PRODUCT_STATE_BOOT_UBE,
            0x0004_0004,
            "BOOT_UBE does not select the OEM iRoT"
        ),
        (
            TRUSTZONE_PROGRAM,
            0x0005_0001,
            "Programming the TZEN option byte failed"
        ),
        (
            TRUSTZONE_LAUNCH,
            0x0005_0002,
            "Option byte launch after TZEN change failed"
        ),
        (
            WATERMARK_BANK1_PROGRAM,
            0x0005_0003,
            "Programming the bank 1 secure watermark failed"
        ),
        (
            WATERMARK_BANK2_PROGRAM,
            0x0005_0004,
            "Programming the bank 2 secure watermark failed"
        ),
        (
            WATERMARK_LAUNCH,
            0x0005_0005,
            "Option byte launch after watermark change failed"
        ),
        (
            PROVISION_BAD_ENCRYPTED_FLAG,
            0x0006_0001,
            "Provisioning record is not flagged as encrypted"
        ),
        (
            PROVISION_BAD_ADDRESS,
            0x0006_0002,
            "Provisioning record targets an unexpected address"
        ),
        (
            PROVISION_BAD_LENGTH,
            0x0006_0003,
            "Provisioning record has an unexpected length"
        ),
        (
            PROVISION_RECORD_TRUNCATED,
            0x0006_0004,
            "Provisioning record is shorter than its header declares"
        ),
        (
            PROVISION_ADDRESS_OUT_OF_REGION,
            0x0006_0005,
            "Provisioning record address lies outside the key store"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::ProvError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::ProvError(val)
    }
}

impl From<ProvError> for core::num::NonZeroU32 {
    fn from(val: ProvError) -> Self {
        val.0
    }
}

impl From<ProvError> for u32 {
    fn from(val: ProvError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for ProvError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(ProvError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type ProvResult<T> = Result<T, ProvError>;
