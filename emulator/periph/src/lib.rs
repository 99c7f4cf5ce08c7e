/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated STM32H573 provisioning
    peripherals.

--*/

mod device;
mod hash;
mod obk;
mod option_bytes;
mod reset;
mod saes;

pub use device::{DeviceArgs, DeviceStats, EmulatedDevice, Faults};
pub use hash::HashAccel;
pub use obk::ObkBanks;
pub use option_bytes::OptionBytes;
pub use reset::{run_until_reset, Boot, DeviceReset};
pub use saes::Saes;
