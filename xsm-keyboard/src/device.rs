//! Lock-guarded device core shared by the controller, animation engine,
//! hotkey poller and sensor readers
//!
//! One mutex guards both the backlight state and every bus transaction, so
//! the firmware never sees two interleaved calls and state never drifts from
//! what was last acknowledged.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::warn;
use xsm_transport::{DeviceCommand, Transport, TransportError, TransportInfo};

use crate::ops::{ops_for, BacklightOps};
use crate::profile::CapabilityProfile;
use crate::state::BacklightState;

/// Maximum bounded retries per transaction
pub const MAX_RETRIES: u8 = 3;

/// Bus access with optional bounded retry
pub struct DeviceIo {
    bus: Arc<dyn Transport>,
    retries: u8,
    kb_opcode: u8,
}

impl DeviceIo {
    pub fn new(bus: Arc<dyn Transport>, profile: &CapabilityProfile, retries: u8) -> Self {
        Self {
            bus,
            retries: retries.min(MAX_RETRIES),
            kb_opcode: profile.command_opcode,
        }
    }

    /// Send one backlight argument word
    pub fn kb_led(&self, argument: u32) -> Result<(), TransportError> {
        self.execute(DeviceCommand::send(self.kb_opcode, argument))
            .map(|_| ())
    }
}

impl Transport for DeviceIo {
    fn execute(&self, command: DeviceCommand) -> Result<u32, TransportError> {
        let mut attempt = 0;
        loop {
            match self.bus.execute(command) {
                Ok(value) => return Ok(value),
                Err(e @ (TransportError::DeviceNotFound(_) | TransportError::Unsupported(_))) => {
                    return Err(e)
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("{command} failed ({e}), retry {attempt}/{}", self.retries);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn info(&self) -> &TransportInfo {
        self.bus.info()
    }

    fn is_available(&self) -> bool {
        self.bus.is_available()
    }
}

/// Everything behind the device lock
pub struct DeviceCore {
    pub(crate) io: DeviceIo,
    pub(crate) state: BacklightState,
    pub(crate) ops: Arc<dyn BacklightOps>,
}

impl DeviceCore {
    pub fn io(&self) -> &DeviceIo {
        &self.io
    }

    pub fn state(&self) -> &BacklightState {
        &self.state
    }
}

/// Cloneable handle to the lock-guarded device core
#[derive(Clone)]
pub struct DeviceHandle {
    core: Arc<Mutex<DeviceCore>>,
    profile: CapabilityProfile,
}

impl DeviceHandle {
    pub fn new(bus: Arc<dyn Transport>, profile: CapabilityProfile, retries: u8) -> Self {
        let core = DeviceCore {
            io: DeviceIo::new(bus, &profile, retries),
            state: BacklightState::new(&profile),
            ops: ops_for(profile),
        };
        Self {
            core: Arc::new(Mutex::new(core)),
            profile,
        }
    }

    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }

    /// Hold the device lock. Never keep the guard across a call that joins
    /// the animation worker.
    pub fn lock(&self) -> MutexGuard<'_, DeviceCore> {
        self.core.lock()
    }

    /// Run `f` with exclusive bus access
    pub fn with_io<R>(&self, f: impl FnOnce(&DeviceIo) -> R) -> R {
        f(&self.core.lock().io)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> BacklightState {
        self.core.lock().state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xsm_transport::mock::MockBus;
    use xsm_transport::TransportExt;

    #[test]
    fn test_bounded_retry_recovers_transient_failure() {
        let bus = Arc::new(MockBus::new());
        bus.fail_once(|_| true);
        let io = DeviceIo::new(bus.clone(), &CapabilityProfile::FULL_COLOR, 1);

        io.kb_led(0xF400_00FF).unwrap();
        assert_eq!(bus.commands().len(), 2);
        assert_eq!(bus.kb_led_arguments(), vec![0xF400_00FF]);
    }

    #[test]
    fn test_no_retry_by_default() {
        let bus = Arc::new(MockBus::new());
        bus.fail_once(|_| true);
        let io = DeviceIo::new(bus.clone(), &CapabilityProfile::FULL_COLOR, 0);

        assert!(io.kb_led(0xF400_00FF).is_err());
        assert_eq!(bus.commands().len(), 1);
    }

    #[test]
    fn test_missing_device_is_not_retried() {
        let bus = Arc::new(MockBus::new());
        bus.set_available(false);
        let io = DeviceIo::new(bus.clone(), &CapabilityProfile::FULL_COLOR, 3);

        assert!(io.read_register(0x07).is_err());
        assert_eq!(bus.commands().len(), 1);
    }
}
