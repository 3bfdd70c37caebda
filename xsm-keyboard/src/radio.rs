//! WWAN (3G) radio control through firmware methods

use tracing::info;
use xsm_transport::protocol::method;
use xsm_transport::TransportExt;

use crate::device::DeviceHandle;
use crate::error::KeyboardError;

pub struct Wwan {
    device: DeviceHandle,
}

impl Wwan {
    pub fn new(device: DeviceHandle) -> Self {
        Self { device }
    }

    /// rfkill-style block: blocked turns the radio off
    pub fn set_blocked(&self, blocked: bool) -> Result<(), KeyboardError> {
        self.device
            .with_io(|io| io.send_method(method::SET_3G, !blocked as u32))?;
        info!("wwan {}", if blocked { "blocked" } else { "unblocked" });
        Ok(())
    }

    /// Hand radio power control to the BIOS (true) or take it back
    pub fn bios_control(&self, enabled: bool) -> Result<(), KeyboardError> {
        Ok(self
            .device
            .with_io(|io| io.send_method(method::TALK_BIOS_3G, enabled as u32))?)
    }

    pub fn powered(&self) -> Result<bool, KeyboardError> {
        let state = self
            .device
            .with_io(|io| io.call_method(method::GET_POWER_STATE_FOR_3G, 0))?;
        Ok(state != 0)
    }
}
