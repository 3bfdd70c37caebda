//! Keyboard backlight control for Clevo XSM laptops
//!
//! This crate owns the backlight state machine and everything that drives
//! it:
//!
//! - [`BacklightController`]: the single state-transition API (power,
//!   brightness, color, mode) used by hotkeys, attributes and the CLI
//! - [`AnimationEngine`]: host-driven wave/breathe/blink effects
//! - [`EventDispatcher`] and [`HotkeyPoller`]: hotkey handling with
//!   airplane press de-duplication
//! - [`Thermal`], [`Wwan`], [`AirplaneLed`]: the remaining EC and firmware
//!   helpers, served through the same device lock
//!
//! Per-model command encodings live behind [`BacklightOps`], selected once
//! from a [`CapabilityProfile`].

pub mod airplane;
pub mod animation;
pub mod controller;
pub mod device;
pub mod error;
pub mod events;
pub mod led;
pub mod ops;
pub mod poller;
pub mod profile;
pub mod radio;
pub mod state;
pub mod thermal;
pub mod work_queue;

pub use airplane::AirplaneLed;
pub use animation::{AnimationEngine, EffectEvent, EffectKind, StartOutcome};
pub use controller::{BacklightController, ControllerOptions, EffectPolicy, LedEffect};
pub use device::{DeviceHandle, DeviceIo, MAX_RETRIES};
pub use error::KeyboardError;
pub use events::{EventDispatcher, HotkeyAction, InputSink, LogSink, PressCounter, ReportOutcome, Watermark};
pub use led::{BacklightMode, RgbColor, ZoneColor, PALETTE};
pub use ops::BacklightOps;
pub use poller::HotkeyPoller;
pub use profile::{family_for_model, known_models, CapabilityProfile, ColorModel, ProfileFamily};
pub use radio::Wwan;
pub use state::{BacklightState, InitialState, Power};
pub use thermal::{FanMode, PowerProfile, SensorReadings, Thermal};
pub use work_queue::WorkQueue;
