// Licensed under the Apache-2.0 license

use std::sync::Once;

use log::LevelFilter;
use prov_config::{ObkLayout, ProvisioningConfig};
use prov_emulator_periph::{run_until_reset, Boot, DeviceArgs, EmulatedDevice};
use prov_rom_common::record::{encode_record, OBK_HEADER_LEN};
use prov_rom_common::ProductState;
use sha2::{Digest, Sha256};
use simple_logger::SimpleLogger;

pub const DA_ADDRESS: u32 = 0x0FFD_0100;
pub const DA_PAYLOAD_LEN: usize = 0x40;

pub fn init_logger() {
    static LOGGER: Once = Once::new();
    LOGGER.call_once(|| {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
    });
}

/// A DA payload that looks like the output of the provisioning tools.
pub fn da_payload() -> Vec<u8> {
    (0..DA_PAYLOAD_LEN).map(|i| (i as u8).wrapping_mul(13) ^ 0xA5).collect()
}

pub fn record_for(address: u32, payload: &[u8]) -> Vec<u8> {
    let digest: [u8; 32] = Sha256::digest(payload).into();
    let mut out = vec![0u8; OBK_HEADER_LEN + 32 + payload.len()];
    let len = encode_record(address, &digest, payload, &mut out).unwrap();
    out.truncate(len);
    out
}

pub fn da_record() -> Vec<u8> {
    record_for(DA_ADDRESS, &da_payload())
}

/// Offset of the DA slot inside the OBK area.
pub fn da_offset() -> usize {
    (DA_ADDRESS - ObkLayout::default().base) as usize
}

pub fn device_in(state: ProductState) -> EmulatedDevice {
    init_logger();
    EmulatedDevice::new(DeviceArgs {
        product_state: state.code(),
        ..Default::default()
    })
    .unwrap()
}

pub fn config() -> ProvisioningConfig {
    ProvisioningConfig::default()
}

/// Boot `f` repeatedly until a boot returns, collecting the product state
/// seen after every reset.
pub fn boot_until_done<R>(
    dev: &mut EmulatedDevice,
    max_boots: usize,
    mut f: impl FnMut(&mut EmulatedDevice) -> R,
) -> (R, Vec<ProductState>) {
    let mut states = Vec::new();
    for _ in 0..max_boots {
        match run_until_reset(|| f(dev)) {
            Boot::Returned(r) => return (r, states),
            Boot::Reset => states.push(dev.product_state()),
        }
    }
    panic!("device still resetting after {} boots", max_boots);
}
