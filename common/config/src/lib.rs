// Licensed under the Apache-2.0 license

#![cfg_attr(target_os = "none", no_std)]

/// Layout of the option-byte key (OBK) area used for HDPL1 secrets.
///
/// Offsets are relative to `base`. The default matches the STM32H573
/// secure alias of the OBK area.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ObkLayout {
    pub base: u32,
    pub hdpl1_offset: u32,
    /// Last valid offset (inclusive).
    pub hdpl1_end: u32,
    pub prog_unit: u32,
    /// Largest buffer accepted by a single encrypted write.
    pub max_record_size: u32,
    /// Number of key slots the swap activates from the alternate bank.
    pub swap_key_count: u32,
}

impl Default for ObkLayout {
    fn default() -> Self {
        ObkLayout {
            base: 0x0FFD_0000,
            hdpl1_offset: 0x100,
            hdpl1_end: 0x8FF,
            prog_unit: 0x10,
            max_record_size: 0x60,
            swap_key_count: 0x1FF,
        }
    }
}

impl ObkLayout {
    /// Absolute address of an offset inside the area.
    pub const fn address_of(&self, offset: u32) -> u32 {
        self.base + offset
    }

    /// Size of the area in bytes, starting at `base`.
    pub const fn size(&self) -> u32 {
        self.hdpl1_end + 1
    }
}

/// Expected shape of the embedded debug authentication (DA) record.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DaConfig {
    pub expected_address: u32,
    pub expected_length: u32,
}

impl Default for DaConfig {
    fn default() -> Self {
        DaConfig {
            expected_address: 0x0FFD_0100,
            expected_length: 0x60,
        }
    }
}

/// Secure watermark sector range of one flash bank.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatermarkRange {
    pub start: u32,
    pub end: u32,
}

impl WatermarkRange {
    pub const fn new(start: u32, end: u32) -> Self {
        WatermarkRange { start, end }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SecureWatermark {
    pub bank1: WatermarkRange,
    pub bank2: WatermarkRange,
}

impl Default for SecureWatermark {
    fn default() -> Self {
        // Bank 1 fully secure, bank 2 start > end disables the area.
        SecureWatermark {
            bank1: WatermarkRange::new(0x00, 0x7F),
            bank2: WatermarkRange::new(0x7F, 0x00),
        }
    }
}

/// Option byte encodings the engine compares against.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct OptionByteValues {
    pub tzen_enable: u8,
    pub boot_ube_oem_irot: u8,
    pub boot_ube_st_irot: u8,
}

impl Default for OptionByteValues {
    fn default() -> Self {
        OptionByteValues {
            tzen_enable: 0xB4,
            boot_ube_oem_irot: 0xB4,
            boot_ube_st_irot: 0xC3,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Timing {
    /// Polling budget for the cipher, hash and flash engines.
    pub hw_timeout_ms: u32,
    /// Pause between word reads of the key store.
    pub obk_read_delay_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            hw_timeout_ms: 100,
            obk_read_delay_ms: 10,
        }
    }
}

/// Everything the provisioning engine needs to know about the part.
/// These are the defaults that can be overridden by the board integration.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ProvisioningConfig {
    pub obk: ObkLayout,
    pub da: DaConfig,
    pub watermark: SecureWatermark,
    pub option_bytes: OptionByteValues,
    pub timing: Timing,
}

impl ProvisioningConfig {
    #[cfg(not(target_os = "none"))]
    pub fn hash_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();
        map.insert("OBK_BASE".to_string(), format!("0x{:x}", self.obk.base));
        map.insert(
            "OBK_HDPL1_OFFSET".to_string(),
            format!("0x{:x}", self.obk.hdpl1_offset),
        );
        map.insert(
            "OBK_HDPL1_END".to_string(),
            format!("0x{:x}", self.obk.hdpl1_end),
        );
        map.insert(
            "OBK_PROG_UNIT".to_string(),
            format!("0x{:x}", self.obk.prog_unit),
        );
        map.insert(
            "OBK_MAX_RECORD".to_string(),
            format!("0x{:x}", self.obk.max_record_size),
        );
        map.insert(
            "OBK_SWAP_KEYS".to_string(),
            self.obk.swap_key_count.to_string(),
        );
        map.insert(
            "DA_ADDRESS".to_string(),
            format!("0x{:x}", self.da.expected_address),
        );
        map.insert(
            "DA_LENGTH".to_string(),
            format!("0x{:x}", self.da.expected_length),
        );
        map.insert(
            "WM_BANK1".to_string(),
            format!(
                "0x{:x}-0x{:x}",
                self.watermark.bank1.start, self.watermark.bank1.end
            ),
        );
        map.insert(
            "WM_BANK2".to_string(),
            format!(
                "0x{:x}-0x{:x}",
                self.watermark.bank2.start, self.watermark.bank2.end
            ),
        );
        map.insert(
            "TZEN".to_string(),
            format!("0x{:x}", self.option_bytes.tzen_enable),
        );
        map.insert(
            "BOOT_UBE".to_string(),
            format!("0x{:x}", self.option_bytes.boot_ube_oem_irot),
        );
        map
    }
}
