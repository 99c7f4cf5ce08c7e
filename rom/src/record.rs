// Licensed under the Apache-2.0 license

//! Layout of a key store provisioning record.
//!
//! ```text
//! +----------------+---------------+------------------+
//! | ObkHeader (12) | digest (32)   | payload          |
//! +----------------+---------------+------------------+
//!                  |<-------- header.length --------->|
//! ```
//!
//! The digest is the SHA-256 of the payload. Digest and payload are
//! written to the key store together.

use prov_config::{DaConfig, ObkLayout};
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::ValidationError;
use crate::integrity::SHA256_DIGEST_LEN;

pub const OBK_RECORD_ENCRYPTED: u32 = 1;

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ObkHeader {
    /// Absolute destination address in the OBK area.
    pub address: U32<LittleEndian>,
    /// Bytes following the header: digest plus payload.
    pub length: U32<LittleEndian>,
    pub encrypted: U32<LittleEndian>,
}

pub const OBK_HEADER_LEN: usize = core::mem::size_of::<ObkHeader>();

impl ObkHeader {
    pub fn new(address: u32, length: u32) -> Self {
        Self {
            address: U32::new(address),
            length: U32::new(length),
            encrypted: U32::new(OBK_RECORD_ENCRYPTED),
        }
    }
}

/// A record split into its header and whatever bytes follow it.
#[derive(Clone, Copy, Debug)]
pub struct ObkRecord<'a> {
    header: ObkHeader,
    rest: &'a [u8],
}

impl<'a> ObkRecord<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ValidationError> {
        let (header, rest) =
            ObkHeader::read_from_prefix(bytes).map_err(|_| ValidationError::Truncated {
                expected: OBK_HEADER_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self { header, rest })
    }

    pub fn header(&self) -> &ObkHeader {
        &self.header
    }

    pub fn address(&self) -> u32 {
        self.header.address.get()
    }

    pub fn length(&self) -> u32 {
        self.header.length.get()
    }

    /// Offset of the destination relative to the OBK base.
    pub fn offset(&self, layout: &ObkLayout) -> Result<u32, ValidationError> {
        self.address()
            .checked_sub(layout.base)
            .filter(|offset| *offset <= layout.hdpl1_end)
            .ok_or(ValidationError::OutOfRegion(self.address()))
    }

    /// Digest and payload as declared by the header.
    pub fn body(&self) -> Result<&'a [u8], ValidationError> {
        let length = self.length() as usize;
        self.rest
            .get(..length)
            .filter(|body| body.len() >= SHA256_DIGEST_LEN)
            .ok_or(ValidationError::Truncated {
                expected: OBK_HEADER_LEN + length.max(SHA256_DIGEST_LEN),
                actual: OBK_HEADER_LEN + self.rest.len(),
            })
    }

    /// Check the header against the expected DA layout.
    ///
    /// Runs before anything else touches the record, so a rejected record
    /// has no side effect.
    pub fn validate_header(&self, da: &DaConfig, layout: &ObkLayout) -> Result<(), ValidationError> {
        let encrypted = self.header.encrypted.get();
        if encrypted != OBK_RECORD_ENCRYPTED {
            return Err(ValidationError::EncryptedFlag(encrypted));
        }
        if self.address() != da.expected_address {
            return Err(ValidationError::Address(self.address()));
        }
        if self.length() != da.expected_length {
            return Err(ValidationError::Length(self.length()));
        }
        self.offset(layout)?;
        self.body()?;
        Ok(())
    }
}

/// Serialize a record into `out`, returning the number of bytes used.
///
/// The caller supplies the digest so this works without a hash engine.
pub fn encode_record(
    address: u32,
    digest: &[u8; SHA256_DIGEST_LEN],
    payload: &[u8],
    out: &mut [u8],
) -> Option<usize> {
    let length = SHA256_DIGEST_LEN + payload.len();
    let total = OBK_HEADER_LEN + length;
    let out = out.get_mut(..total)?;
    let header = ObkHeader::new(address, u32::try_from(length).ok()?);
    out[..OBK_HEADER_LEN].copy_from_slice(header.as_bytes());
    out[OBK_HEADER_LEN..OBK_HEADER_LEN + SHA256_DIGEST_LEN].copy_from_slice(digest);
    out[OBK_HEADER_LEN + SHA256_DIGEST_LEN..].copy_from_slice(payload);
    Some(total)
}
