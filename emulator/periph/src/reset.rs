// Licensed under the Apache-2.0 license

//! System reset emulation.
//!
//! A reset unwinds out of the running boot with a [`DeviceReset`] payload.
//! Peripheral state lives outside the unwound frames, so the next call into
//! the engine behaves like the next boot of the part.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// Panic payload raised by [`crate::EmulatedDevice`] on reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceReset {
    pub count: usize,
}

/// Outcome of one emulated boot.
#[derive(Debug, PartialEq, Eq)]
pub enum Boot<R> {
    Returned(R),
    Reset,
}

impl<R> Boot<R> {
    pub fn is_reset(&self) -> bool {
        matches!(self, Boot::Reset)
    }

    pub fn returned(self) -> Option<R> {
        match self {
            Boot::Returned(r) => Some(r),
            Boot::Reset => None,
        }
    }
}

fn install_quiet_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().downcast_ref::<DeviceReset>().is_none() {
                default(info);
            }
        }));
    });
}

/// Run one boot until it returns or resets the device.
///
/// Any other panic is propagated unchanged.
pub fn run_until_reset<R>(boot: impl FnOnce() -> R) -> Boot<R> {
    install_quiet_hook();
    match panic::catch_unwind(AssertUnwindSafe(boot)) {
        Ok(r) => Boot::Returned(r),
        Err(payload) if payload.is::<DeviceReset>() => Boot::Reset,
        Err(payload) => panic::resume_unwind(payload),
    }
}
