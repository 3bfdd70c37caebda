//! Hotkey event dispatch and airplane press de-duplication
//!
//! Two producers can observe the same airplane-mode press: the firmware push
//! notification and the EC polling thread. Both report through one
//! [`PressCounter`]; each keeps its own [`Watermark`], and a listener that
//! finds the global count ahead of its watermark knows another listener
//! already reported the press.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use xsm_transport::protocol::{event, method};
use xsm_transport::TransportExt;

use crate::controller::BacklightController;
use crate::error::KeyboardError;

/// Destination for synthesized input events
pub trait InputSink: Send + Sync {
    /// One press-and-release of the rfkill key
    fn emit_rfkill(&self);
}

/// Sink that only logs, for hosts without an input device
#[derive(Debug, Default)]
pub struct LogSink;

impl InputSink for LogSink {
    fn emit_rfkill(&self) {
        info!("KEY_RFKILL");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    BrightnessDown,
    BrightnessUp,
    /// Next color or next mode, depending on `cycle_colors`
    Cycle,
    TogglePower,
    Airplane,
}

impl HotkeyAction {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            event::BRIGHTNESS_DOWN => Some(HotkeyAction::BrightnessDown),
            event::BRIGHTNESS_UP => Some(HotkeyAction::BrightnessUp),
            event::CYCLE => Some(HotkeyAction::Cycle),
            event::TOGGLE => Some(HotkeyAction::TogglePower),
            event::AIRPLANE => Some(HotkeyAction::Airplane),
            _ => None,
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HotkeyAction::BrightnessDown => "brightness-down",
            HotkeyAction::BrightnessUp => "brightness-up",
            HotkeyAction::Cycle => "cycle",
            HotkeyAction::TogglePower => "toggle",
            HotkeyAction::Airplane => "airplane",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Reported,
    /// Another listener already reported presses this one has not seen
    Suppressed,
}

/// Per-listener count of reported presses
#[derive(Debug, Default)]
pub struct Watermark {
    seen: u64,
}

impl Watermark {
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

/// Global airplane press counter shared by every listener
#[derive(Debug, Default)]
pub struct PressCounter {
    reported: Mutex<u64>,
    push_active: AtomicBool,
}

impl PressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one rfkill press unless another listener got ahead of `watermark`.
    ///
    /// A suppressed listener catches up to the global count so its next
    /// press is reported normally.
    pub fn try_report(&self, watermark: &mut Watermark, sink: &dyn InputSink) -> ReportOutcome {
        let mut reported = self.reported.lock();
        if *reported > watermark.seen {
            debug!(
                "airplane press suppressed (global {}, listener {})",
                *reported, watermark.seen
            );
            watermark.seen = *reported;
            return ReportOutcome::Suppressed;
        }
        sink.emit_rfkill();
        *reported += 1;
        watermark.seen = *reported;
        ReportOutcome::Reported
    }

    pub fn reported(&self) -> u64 {
        *self.reported.lock()
    }

    /// Firmware push notifications are delivering airplane presses
    pub fn push_active(&self) -> bool {
        self.push_active.load(Ordering::Acquire)
    }

    pub fn mark_push_active(&self) {
        self.push_active.store(true, Ordering::Release);
    }
}

// ============================================================================
// EventDispatcher
// ============================================================================

pub struct EventDispatcher {
    controller: Arc<BacklightController>,
    counter: Arc<PressCounter>,
    sink: Arc<dyn InputSink>,
    push_watermark: Mutex<Watermark>,
    cycle_colors: bool,
}

impl EventDispatcher {
    pub fn new(controller: Arc<BacklightController>, sink: Arc<dyn InputSink>, cycle_colors: bool) -> Self {
        Self {
            controller,
            counter: Arc::new(PressCounter::new()),
            sink,
            push_watermark: Mutex::new(Watermark::default()),
            cycle_colors,
        }
    }

    pub fn counter(&self) -> Arc<PressCounter> {
        Arc::clone(&self.counter)
    }

    pub fn sink(&self) -> Arc<dyn InputSink> {
        Arc::clone(&self.sink)
    }

    /// Firmware notification entry point. Only [`event::NOTIFY_VALUE`]
    /// carries an event, which is then fetched with `GET_EVENT`.
    pub fn on_notify(&self, value: u32) -> Result<Option<HotkeyAction>, KeyboardError> {
        if value != event::NOTIFY_VALUE {
            info!("unexpected notification 0x{value:02X}");
            return Ok(None);
        }
        let code = self
            .controller
            .device()
            .with_io(|io| io.call_method(method::GET_EVENT, 0))?;
        debug!("event 0x{code:02X} received");
        self.on_hardware_event(code)
    }

    /// Map an event code to its controller operation
    pub fn on_hardware_event(&self, code: u32) -> Result<Option<HotkeyAction>, KeyboardError> {
        let Some(action) = HotkeyAction::from_code(code) else {
            warn!("ignoring unknown event code 0x{code:02X}");
            return Ok(None);
        };
        debug!("hotkey {action}");

        match action {
            HotkeyAction::BrightnessDown => self.controller.decrement_brightness()?,
            HotkeyAction::BrightnessUp => self.controller.increment_brightness()?,
            HotkeyAction::Cycle if self.cycle_colors => self.controller.next_color()?,
            HotkeyAction::Cycle => self.controller.next_mode()?,
            HotkeyAction::TogglePower => {
                self.controller.toggle_power()?;
            }
            HotkeyAction::Airplane => {
                if !self.counter.push_active() {
                    info!("airplane hotkey delivered by firmware, polling no longer needed");
                    self.counter.mark_push_active();
                }
                let mut watermark = self.push_watermark.lock();
                self.counter.try_report(&mut watermark, self.sink.as_ref());
            }
        }
        Ok(Some(action))
    }
}
