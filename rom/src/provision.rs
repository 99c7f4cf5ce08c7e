/*++

Licensed under the Apache-2.0 license.

File Name:

    provision.rs

Abstract:

    Debug authentication (DA) credential provisioning into the OBK area.

--*/

use core::fmt;

use log::{error, info};
use prov_config::ProvisioningConfig;

use crate::cipher::MAX_CIPHER_LEN;
use crate::error::{ProvisionError, ValidationError};
use crate::hil::ProvisioningHal;
use crate::integrity::{IntegrityVerifier, SHA256_DIGEST_LEN};
use crate::obk::KeyStore;
use crate::record::ObkRecord;

/// Bytes per line of the read-back dump.
const DUMP_LINE_LEN: usize = 8;

pub struct DaProvisioner<'a, H: ProvisioningHal + ?Sized> {
    hal: &'a mut H,
    config: ProvisioningConfig,
}

/// Stored DA record as read back from the key store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaReadback {
    pub raw: [u8; MAX_CIPHER_LEN],
    pub decrypted: [u8; MAX_CIPHER_LEN],
    pub len: usize,
}

impl DaReadback {
    pub fn raw(&self) -> &[u8] {
        &self.raw[..self.len]
    }

    pub fn decrypted(&self) -> &[u8] {
        &self.decrypted[..self.len]
    }
}

struct HexLine<'a>(&'a [u8]);

impl fmt::Display for HexLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "0x{:02x}", byte)?;
        }
        Ok(())
    }
}

fn dump(data: &[u8]) {
    for line in data.chunks(DUMP_LINE_LEN) {
        info!("{}", HexLine(line));
    }
}

impl<'a, H: ProvisioningHal + ?Sized> DaProvisioner<'a, H> {
    pub fn new(hal: &'a mut H, config: &ProvisioningConfig) -> Self {
        Self {
            hal,
            config: *config,
        }
    }

    fn key_store(&mut self) -> KeyStore<'_, H> {
        KeyStore::new(&mut *self.hal, self.config.obk, self.config.timing)
    }

    /// Header and digest checks, without touching the key store.
    pub fn validate<'r>(&mut self, record: &ObkRecord<'r>) -> Result<&'r [u8], ProvisionError> {
        record.validate_header(&self.config.da, &self.config.obk)?;
        let body = record.body()?;
        let (digest, payload) = body.split_at(SHA256_DIGEST_LEN);

        info!("Check embedded DA config hash");
        let matches = IntegrityVerifier::new(&mut *self.hal, self.config.timing.hw_timeout_ms)
            .verify(payload, digest)?;
        if !matches {
            error!("Wrong hash");
            return Err(ValidationError::DigestMismatch.into());
        }
        Ok(body)
    }

    /// Commit the DA record and reset the device.
    ///
    /// Returns `Ok(())` only when the key store already holds a record.
    pub fn provision_da(&mut self, record: &[u8]) -> Result<(), ProvisionError> {
        info!("Check provisioning status ...");
        let da_address = self.config.da.expected_address;
        let da_offset = da_address
            .checked_sub(self.config.obk.base)
            .ok_or(ValidationError::OutOfRegion(da_address))?;
        if !self.key_store().is_erased(da_offset)? {
            info!("DA already provisioned !");
            return Ok(());
        }

        info!("Provisioning DA using embedded DA config");
        let record = ObkRecord::parse(record)?;
        let body = self.validate(&record).inspect_err(|err| error!("{}", err))?;

        info!("Provisioning {:02x} {:02x} ...", body[0], body[1]);
        let offset = record.offset(&self.config.obk)?;
        if let Err(err) = self.key_store().write_encrypted(offset, body) {
            error!("Error writing OBK file : {}", err.code());
            return Err(err.into());
        }

        info!("Provisioning done");
        self.hal.reset()
    }

    /// Diagnostic dump of the stored record, raw then decrypted.
    pub fn read_da(&mut self, record: &[u8]) -> Result<DaReadback, ProvisionError> {
        let record = ObkRecord::parse(record)?;
        let offset = record.offset(&self.config.obk)?;
        let len = record.length() as usize;
        if len > MAX_CIPHER_LEN {
            return Err(ValidationError::Length(record.length()).into());
        }

        let mut readback = DaReadback {
            raw: [0; MAX_CIPHER_LEN],
            decrypted: [0; MAX_CIPHER_LEN],
            len,
        };

        info!("Read provisioned DA");
        self.key_store()
            .read_plain(offset, &mut readback.raw[..len])
            .inspect_err(|_| error!("Error OBK_Read"))?;
        dump(readback.raw());

        info!("Decrypt provisioned DA");
        self.key_store()
            .read_and_decrypt(offset, &mut readback.decrypted[..len])
            .inspect_err(|_| error!("Error OBK_Flash_ReadEncrypted"))?;
        dump(readback.decrypted());

        Ok(readback)
    }
}
