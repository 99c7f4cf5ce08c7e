// Licensed under the Apache-2.0 license

//! Hardware interface consumed by the provisioning engine.
//!
//! Each trait covers one peripheral of the part (option byte controller,
//! OBK flash, SAES, HASH and the system control block). The engine is
//! generic over these traits so the same logic runs against the real
//! registers and against the emulated device used in tests.

use core::ops::{Deref, DerefMut};

use bitfield::bitfield;
use prov_config::WatermarkRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalError {
    /// Generic failure condition
    FAIL,
    /// Control register is still locked
    LOCKED,
    /// An invalid parameter was passed
    INVAL,
    /// Parameter passed was too large
    SIZE,
}

bitfield! {
    /// Option status register (`FLASH_OPTSR_CUR`).
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct OptionStatus(u32);
    impl Debug;
    pub u8, product_state, set_product_state: 15, 8;
    pub u8, boot_ube, set_boot_ube: 29, 22;
}

bitfield! {
    /// Second option status register (`FLASH_OPTSR2_CUR`).
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct OptionStatus2(u32);
    impl Debug;
    pub u8, tzen, set_tzen: 31, 24;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashBank {
    Bank1,
    Bank2,
}

/// A single option byte programming request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObProgram {
    ProductState(u8),
    TrustZone(u8),
    SecureWatermark {
        bank: FlashBank,
        range: WatermarkRange,
    },
}

/// Option byte controller.
///
/// Programmed values are pending until `ob_launch` copies them into the
/// current registers.
pub trait OptionByteCtrl {
    /// Unlock the flash control and option byte registers.
    fn ob_unlock(&mut self) -> Result<(), HalError>;

    fn ob_lock(&mut self);

    fn option_status(&self) -> OptionStatus;

    fn option_status2(&self) -> OptionStatus2;

    fn secure_watermark(&self, bank: FlashBank) -> WatermarkRange;

    fn ob_program(&mut self, request: &ObProgram) -> Result<(), HalError>;

    fn ob_launch(&mut self) -> Result<(), HalError>;
}

/// Option-byte key area with an active and an alternate bank.
///
/// Offsets are relative to the start of the area.
pub trait ObkFlash {
    fn obk_unlock(&mut self) -> Result<(), HalError>;

    fn obk_lock(&mut self);

    /// Raw copy out of the active bank.
    fn obk_read(&self, offset: u32, buffer: &mut [u8]) -> Result<(), HalError>;

    /// Erase the whole alternate bank.
    fn obk_erase_alt(&mut self) -> Result<(), HalError>;

    /// Program one quad-word into the alternate bank.
    fn obk_program_alt(&mut self, offset: u32, data: &[u8; 16]) -> Result<(), HalError>;

    /// Activate the alternate bank for the first `key_count` key slots.
    fn obk_swap(&mut self, key_count: u32) -> Result<(), HalError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEpoch {
    NonSecure,
    Secure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySelect {
    /// Derived hardware unique key, never readable by software.
    HardwareUnique,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CipherMode {
    Cbc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CipherConfig {
    pub key: KeySelect,
    pub mode: CipherMode,
    pub iv: [u32; 4],
}

/// Secure AES engine operating on 32-bit words.
pub trait CipherEngine {
    fn select_epoch(&mut self, epoch: KeyEpoch);

    fn cipher_deinit(&mut self) -> Result<(), HalError>;

    fn cipher_init(&mut self, config: &CipherConfig) -> Result<(), HalError>;

    fn encrypt(
        &mut self,
        input: &[u32],
        output: &mut [u32],
        timeout_ms: u32,
    ) -> Result<(), HalError>;

    fn decrypt(
        &mut self,
        input: &[u32],
        output: &mut [u32],
        timeout_ms: u32,
    ) -> Result<(), HalError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
}

pub trait HashEngine {
    fn hash_deinit(&mut self) -> Result<(), HalError>;

    fn hash_init(&mut self, algorithm: HashAlgorithm) -> Result<(), HalError>;

    fn hash_compute(
        &mut self,
        data: &[u8],
        digest: &mut [u8; 32],
        timeout_ms: u32,
    ) -> Result<(), HalError>;
}

pub trait SystemCtrl {
    /// Full system reset. Execution resumes at the next boot.
    fn reset(&mut self) -> !;

    fn delay_ms(&mut self, ms: u32);
}

/// Everything the engine needs from the part.
pub trait ProvisioningHal:
    OptionByteCtrl + ObkFlash + CipherEngine + HashEngine + SystemCtrl
{
}

impl<T> ProvisioningHal for T where
    T: OptionByteCtrl + ObkFlash + CipherEngine + HashEngine + SystemCtrl
{
}

/// Option byte registers held unlocked for the lifetime of the guard.
pub struct ObUnlocked<'a, H: OptionByteCtrl + ?Sized> {
    hal: &'a mut H,
}

impl<'a, H: OptionByteCtrl + ?Sized> ObUnlocked<'a, H> {
    pub fn acquire(hal: &'a mut H) -> Result<Self, HalError> {
        hal.ob_unlock()?;
        Ok(Self { hal })
    }
}

impl<H: OptionByteCtrl + ?Sized> Deref for ObUnlocked<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.hal
    }
}

impl<H: OptionByteCtrl + ?Sized> DerefMut for ObUnlocked<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.hal
    }
}

impl<H: OptionByteCtrl + ?Sized> Drop for ObUnlocked<'_, H> {
    fn drop(&mut self) {
        self.hal.ob_lock();
    }
}

/// OBK area held unlocked for the lifetime of the guard.
pub struct ObkUnlocked<'a, H: ObkFlash + ?Sized> {
    hal: &'a mut H,
}

impl<'a, H: ObkFlash + ?Sized> ObkUnlocked<'a, H> {
    pub fn acquire(hal: &'a mut H) -> Result<Self, HalError> {
        hal.obk_unlock()?;
        Ok(Self { hal })
    }
}

impl<H: ObkFlash + ?Sized> Deref for ObkUnlocked<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.hal
    }
}

impl<H: ObkFlash + ?Sized> DerefMut for ObkUnlocked<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.hal
    }
}

impl<H: ObkFlash + ?Sized> Drop for ObkUnlocked<'_, H> {
    fn drop(&mut self) {
        self.hal.obk_lock();
    }
}
