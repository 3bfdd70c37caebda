//! Airplane-mode LED on EC register 0xD9
//!
//! Reads are synchronous. Writes go through the deferred [`WorkQueue`] so
//! callers on the hotkey path never block on the EC.

use std::sync::Arc;

use tracing::{debug, warn};
use xsm_transport::protocol::ec;
use xsm_transport::{TransportError, TransportExt};

use crate::device::{DeviceHandle, DeviceIo};
use crate::error::KeyboardError;
use crate::work_queue::WorkQueue;

pub struct AirplaneLed {
    device: DeviceHandle,
    queue: Arc<WorkQueue>,
    invert: bool,
}

impl AirplaneLed {
    pub fn new(device: DeviceHandle, queue: Arc<WorkQueue>, invert: bool) -> Self {
        Self {
            device,
            queue,
            invert,
        }
    }

    pub fn get(&self) -> Result<bool, KeyboardError> {
        let invert = self.invert;
        Ok(self.device.with_io(|io| read_led(io, invert))?)
    }

    /// Queue an LED update; returns before the EC is written
    pub fn set(&self, on: bool) -> Result<(), KeyboardError> {
        let device = self.device.clone();
        let invert = self.invert;
        self.queue.enqueue(move || {
            if let Err(e) = device.with_io(|io| write_led(io, invert, on)) {
                warn!("airplane LED write failed: {e}");
            }
        })
    }

    /// Queue an LED flip based on its state when the job runs
    pub fn toggle(&self) -> Result<(), KeyboardError> {
        let device = self.device.clone();
        let invert = self.invert;
        self.queue.enqueue(move || {
            let result = device.with_io(|io| {
                let on = read_led(io, invert)?;
                write_led(io, invert, !on)
            });
            if let Err(e) = result {
                warn!("airplane LED toggle failed: {e}");
            }
        })
    }

    /// Wait for queued LED writes to land
    pub fn flush(&self) -> Result<(), KeyboardError> {
        self.queue.flush()
    }
}

fn read_led(io: &DeviceIo, invert: bool) -> Result<bool, TransportError> {
    let lit = io.read_register(ec::AIRPLANE_LED)? & ec::AIRPLANE_LED_BIT != 0;
    Ok(lit != invert)
}

fn write_led(io: &DeviceIo, invert: bool, on: bool) -> Result<(), TransportError> {
    let byte = io.read_register(ec::AIRPLANE_LED)?;
    let value = if on != invert {
        byte | ec::AIRPLANE_LED_BIT
    } else {
        byte & !ec::AIRPLANE_LED_BIT
    };
    debug!("airplane LED {} (0x{byte:02X} -> 0x{value:02X})", if on { "on" } else { "off" });
    io.write_register(ec::AIRPLANE_LED, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CapabilityProfile;
    use xsm_transport::mock::MockBus;

    fn led(invert: bool) -> (Arc<MockBus>, AirplaneLed) {
        let bus = Arc::new(MockBus::new());
        let device = DeviceHandle::new(bus.clone(), CapabilityProfile::FULL_COLOR, 0);
        let queue = Arc::new(WorkQueue::new("test-led").unwrap());
        (bus, AirplaneLed::new(device, queue, invert))
    }

    #[test]
    fn test_set_preserves_other_bits() {
        let (bus, led) = led(false);
        bus.set_register(ec::AIRPLANE_LED, 0x05);
        led.set(true).unwrap();
        led.flush().unwrap();
        assert_eq!(bus.register(ec::AIRPLANE_LED), 0x45);
        assert!(led.get().unwrap());

        led.set(false).unwrap();
        led.flush().unwrap();
        assert_eq!(bus.register(ec::AIRPLANE_LED), 0x05);
    }

    #[test]
    fn test_inverted_led() {
        let (bus, led) = led(true);
        assert!(led.get().unwrap());
        led.toggle().unwrap();
        led.flush().unwrap();
        assert_eq!(bus.register(ec::AIRPLANE_LED), 0x40);
        assert!(!led.get().unwrap());
    }
}
