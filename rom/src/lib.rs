/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Secure provisioning engine: key store, product state and TrustZone
    option bytes.

--*/

#![cfg_attr(not(test), no_std)]

pub mod cipher;
pub mod error;
pub use error::*;
mod flow;
pub use flow::*;
pub mod hil;
pub mod integrity;
pub mod obk;
pub mod product_state;
pub use product_state::{ProductState, ProductStateCtrl};
pub mod provision;
pub mod record;
pub mod trustzone;

#[cfg(test)]
mod fake;

/// DA record embedded at build time, see `build.rs`.
pub static EMBEDDED_DA_CONFIG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/da_config.obk"));

pub trait FatalErrorHandler {
    fn fatal_error(&mut self, code: u32) -> !;
}

static mut FATAL_ERROR_HANDLER: Option<&'static mut dyn FatalErrorHandler> = None;

/// Set the fatal error handler.
///
/// SAFETY: it is important that the passed fatal handler is never used otherwise
/// and no other references exist to it. It is recommended to create a single instance
/// of the struct and pass it in immediatly, and never use it otherwise.
pub fn set_fatal_error_handler(handler: &'static mut dyn FatalErrorHandler) {
    unsafe {
        FATAL_ERROR_HANDLER = Some(handler);
    }
}

#[panic_handler]
#[inline(never)]
#[cfg(all(target_os = "none", not(test)))]
fn provisioning_panic(_: &core::panic::PanicInfo) -> ! {
    fatal_error(0);
}

/// Terminal state. Never returns; without a handler the core spins.
#[inline(never)]
#[allow(clippy::empty_loop)]
pub fn fatal_error(code: u32) -> ! {
    #[allow(static_mut_refs)]
    if let Some(handler) = unsafe { FATAL_ERROR_HANDLER.as_mut() } {
        handler.fatal_error(code);
    } else {
        loop {}
    }
}
