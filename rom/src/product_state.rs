/*++

Licensed under the Apache-2.0 license.

File Name:

    product_state.rs

Abstract:

    Product state (device lifecycle) controller.

--*/

use core::convert::Infallible;
use core::fmt;

use log::{error, info, warn};
use prov_config::{OptionByteValues, ProvisioningConfig};

use crate::error::{FatalHardwareFault, ValidationError};
use crate::hil::{ObProgram, ObUnlocked, OptionByteCtrl, SystemCtrl};

/// Encodings of `PRODUCT_STATE` in the option status register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductState {
    Open,
    Provisioning,
    IrotProvisioned,
    TzClosed,
    Closed,
    Locked,
    Regression,
    Unknown(u8),
}

impl From<u8> for ProductState {
    fn from(code: u8) -> Self {
        match code {
            0xED => ProductState::Open,
            0x17 => ProductState::Provisioning,
            0x2E => ProductState::IrotProvisioned,
            0xC6 => ProductState::TzClosed,
            0x72 => ProductState::Closed,
            0x5C => ProductState::Locked,
            0x9A => ProductState::Regression,
            other => ProductState::Unknown(other),
        }
    }
}

impl From<ProductState> for u8 {
    fn from(state: ProductState) -> u8 {
        match state {
            ProductState::Open => 0xED,
            ProductState::Provisioning => 0x17,
            ProductState::IrotProvisioned => 0x2E,
            ProductState::TzClosed => 0xC6,
            ProductState::Closed => 0x72,
            ProductState::Locked => 0x5C,
            ProductState::Regression => 0x9A,
            ProductState::Unknown(code) => code,
        }
    }
}

impl ProductState {
    pub fn code(self) -> u8 {
        self.into()
    }

    /// Position in the forward order. Regression and unknown codes have none.
    pub fn rank(self) -> Option<u8> {
        match self {
            ProductState::Open => Some(0),
            ProductState::Provisioning => Some(1),
            ProductState::IrotProvisioned => Some(2),
            ProductState::TzClosed => Some(3),
            ProductState::Closed => Some(4),
            ProductState::Locked => Some(5),
            ProductState::Regression | ProductState::Unknown(_) => None,
        }
    }

    /// True when moving from `self` to `to` never goes back in the order.
    pub fn allows(self, to: ProductState) -> bool {
        if to == ProductState::Regression {
            return true;
        }
        match (self.rank(), to.rank()) {
            (Some(from), Some(to)) => to >= from,
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    #[cfg(feature = "state-names")]
    pub fn name(self) -> Option<&'static str> {
        match self {
            ProductState::Open => Some("OPEN"),
            ProductState::Provisioning => Some("PROVISIONING"),
            ProductState::IrotProvisioned => Some("PROVISIONED"),
            ProductState::TzClosed => Some("TZ-CLOSED"),
            ProductState::Closed => Some("CLOSED"),
            ProductState::Locked => Some("LOCKED"),
            ProductState::Regression => Some("REGRESSION"),
            ProductState::Unknown(_) => None,
        }
    }

    #[cfg(feature = "state-names")]
    fn label(self) -> Option<&'static str> {
        self.name()
    }

    #[cfg(not(feature = "state-names"))]
    fn label(self) -> Option<&'static str> {
        None
    }
}

impl fmt::Display for ProductState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:02x}", self.code()),
        }
    }
}

pub struct ProductStateCtrl<'a, H: OptionByteCtrl + SystemCtrl + ?Sized> {
    hal: &'a mut H,
    values: OptionByteValues,
}

impl<'a, H: OptionByteCtrl + SystemCtrl + ?Sized> ProductStateCtrl<'a, H> {
    pub fn new(hal: &'a mut H, config: &ProvisioningConfig) -> Self {
        Self {
            hal,
            values: config.option_bytes,
        }
    }

    pub fn get_state(&self) -> ProductState {
        let state = ProductState::from(self.hal.option_status().product_state());
        match state {
            ProductState::Unknown(code) => warn!("Unknown PRODUCT_STATE : 0x{:02x}", code),
            state => info!("PRODUCT_STATE : {}", state),
        }
        state
    }

    /// Program `state` and launch the option bytes.
    ///
    /// Only returns on failure, in which case the option bytes are in an
    /// unknown state.
    pub fn set_state(&mut self, state: ProductState) -> Result<Infallible, FatalHardwareFault> {
        let code = state.code();
        info!("Setting product state to 0x{:02x} ...", code);
        {
            let mut hal = ObUnlocked::acquire(&mut *self.hal)
                .map_err(|_| FatalHardwareFault::ProductStateProgram(code))?;
            hal.ob_program(&ObProgram::ProductState(code)).map_err(|err| {
                error!("Error while setting OB state 0x{:02x} : {:?}", code, err);
                FatalHardwareFault::ProductStateProgram(code)
            })?;
            info!("OB Launch ...");
            hal.ob_launch().map_err(|err| {
                error!("Error while executing OB_Launch : {:?}", err);
                FatalHardwareFault::ProductStateLaunch(code)
            })?;
        }
        self.hal.reset()
    }

    /// Like [`Self::set_state`], but refuses to go back in the order and
    /// treats the current state as already done.
    pub fn transition_to(&mut self, to: ProductState) -> Result<(), TransitionError> {
        let from = self.get_state();
        if from == to {
            info!("Product state already {}", to);
            return Ok(());
        }
        if !from.allows(to) {
            return Err(ValidationError::BackwardTransition { from, to }.into());
        }
        match self.set_state(to)? {}
    }

    /// Move the device to CLOSED.
    ///
    /// Each step resets the device. Call again on the next boot: a device
    /// found in PROVISIONED or later continues straight to CLOSED.
    pub fn close(&mut self) -> Result<(), TransitionError> {
        info!("Close device. Check not already closed");
        let current = self.get_state();
        if current == ProductState::Closed {
            info!("Device already closed");
            return Ok(());
        }
        if !current.allows(ProductState::Closed) {
            return Err(ValidationError::BackwardTransition {
                from: current,
                to: ProductState::Closed,
            }
            .into());
        }

        info!("Close device. Check BOOT_UBE OB set for Flash boot");
        let boot_ube = self.hal.option_status().boot_ube();
        if boot_ube != self.values.boot_ube_oem_irot {
            error!("Boot UBE not set properly : 0x{:02x}", boot_ube);
            return Err(ValidationError::BootUbe(boot_ube).into());
        }
        info!("Boot UBE set properly : 0x{:02x}", boot_ube);

        if current.rank() < ProductState::IrotProvisioned.rank() {
            info!("Move to iROT Provisioned ...");
            match self.set_state(ProductState::IrotProvisioned)? {}
        }
        info!("Move to Closed ...");
        match self.set_state(ProductState::Closed)? {}
    }

    pub fn regression(&mut self) -> Result<Infallible, FatalHardwareFault> {
        info!("Launching regression ...");
        self.set_state(ProductState::Regression)
    }
}

/// Outcome of a refused or failed guarded transition.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fatal(#[from] FatalHardwareFault),
}

impl From<TransitionError> for crate::error::ProvisionError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Validation(e) => e.into(),
            TransitionError::Fatal(e) => e.into(),
        }
    }
}
