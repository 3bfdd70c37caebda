//! Airplane hotkey polling thread
//!
//! Some models never push the airplane hotkey event; the press only shows up
//! as a bit in EC register 0xDB. The poller reads and clears that bit at a
//! fixed rate and reports presses through the shared [`PressCounter`].

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};
use xsm_transport::protocol::ec;
use xsm_transport::{TransportError, TransportExt};

use crate::airplane::AirplaneLed;
use crate::device::DeviceHandle;
use crate::error::KeyboardError;
use crate::events::{InputSink, PressCounter, ReportOutcome, Watermark};

pub const MIN_POLL_HZ: u32 = 1;
pub const MAX_POLL_HZ: u32 = 20;
pub const DEFAULT_POLL_HZ: u32 = 5;

pub fn clamp_frequency(hz: u32) -> u32 {
    hz.clamp(MIN_POLL_HZ, MAX_POLL_HZ)
}

pub struct HotkeyPoller {
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    frequency: u32,
}

impl HotkeyPoller {
    pub fn start(
        device: DeviceHandle,
        counter: Arc<PressCounter>,
        sink: Arc<dyn InputSink>,
        led: Arc<AirplaneLed>,
        frequency: u32,
    ) -> Result<Self, KeyboardError> {
        let frequency = clamp_frequency(frequency);
        let period = Duration::from_millis(1000 / frequency as u64);

        // drop any press latched before we started listening
        device.with_io(|io| take_press(io))?;

        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("xsm-polld".into())
            .spawn(move || {
                info!("hotkey poller started at {frequency} Hz");
                let mut watermark = Watermark::default();
                loop {
                    if counter.push_active() {
                        info!("push notifications active, poller exiting");
                        break;
                    }
                    match device.with_io(|io| take_press(io)) {
                        Ok(true) => {
                            debug!("airplane hotkey pressed");
                            match counter.try_report(&mut watermark, sink.as_ref()) {
                                ReportOutcome::Reported => {
                                    if let Err(e) = led.toggle() {
                                        warn!("airplane LED toggle not queued: {e}");
                                    }
                                }
                                ReportOutcome::Suppressed => {
                                    info!("another listener reports airplane presses, poller exiting");
                                    break;
                                }
                            }
                        }
                        Ok(false) => {}
                        Err(e) => warn!("hotkey poll failed: {e}"),
                    }
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("hotkey poller exiting");
            })
            .map_err(|e| KeyboardError::Internal(format!("failed to spawn hotkey poller: {e}")))?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            frequency,
        })
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// False once stopped or after the thread exited on its own
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("hotkey poller panicked");
            }
        }
    }
}

impl Drop for HotkeyPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read and clear the hotkey latch; true when a press was pending
fn take_press<T: TransportExt + ?Sized>(io: &T) -> Result<bool, TransportError> {
    let byte = io.read_register(ec::AIRPLANE_HOTKEY)?;
    if byte & ec::AIRPLANE_HOTKEY_BIT == 0 {
        return Ok(false);
    }
    io.write_register(ec::AIRPLANE_HOTKEY, byte & !ec::AIRPLANE_HOTKEY_BIT)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_clamp() {
        assert_eq!(clamp_frequency(0), 1);
        assert_eq!(clamp_frequency(5), 5);
        assert_eq!(clamp_frequency(100), 20);
    }
}
