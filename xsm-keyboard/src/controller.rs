//! Backlight controller: the one state-transition API
//!
//! Hotkeys, the attribute layer and the CLI all enter here. Every operation
//! validates first, then talks to the device under its lock, and commits
//! state only after the bus acknowledged.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use xsm_transport::protocol::method;
use xsm_transport::{Transport, TransportExt};

use crate::animation::{AnimationEngine, EffectKind, StartOutcome, DEFAULT_WAVE_INTERVAL_MS};
use crate::device::DeviceHandle;
use crate::error::KeyboardError;
use crate::led::{BacklightMode, ZoneColor};
use crate::profile::CapabilityProfile;
use crate::state::{BacklightState, InitialState, Power};

/// How direct commands interact with a running host effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectPolicy {
    /// Direct writes race the animation; the next tick overrides them
    Race,
    /// Direct color, brightness and power commands stop the effect first
    #[default]
    StopEffect,
}

impl fmt::Display for EffectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EffectPolicy::Race => "race",
            EffectPolicy::StopEffect => "stop_effect",
        })
    }
}

impl FromStr for EffectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "race" => Ok(EffectPolicy::Race),
            "stop_effect" | "stop" => Ok(EffectPolicy::StopEffect),
            other => Err(format!("unknown effect policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Bounded retries per transaction (0 = fire once)
    pub retries: u8,
    pub policy: EffectPolicy,
    pub wave_interval_ms: u64,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            retries: 0,
            policy: EffectPolicy::default(),
            wave_interval_ms: DEFAULT_WAVE_INTERVAL_MS,
        }
    }
}

/// Host effect selector exposed as a numeric attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LedEffect {
    Static = 0,
    Wave = 1,
    Breath = 2,
    Blink = 3,
}

impl LedEffect {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(LedEffect::Static),
            1 => Some(LedEffect::Wave),
            2 => Some(LedEffect::Breath),
            3 => Some(LedEffect::Blink),
            _ => None,
        }
    }

    pub fn effect_kind(self) -> Option<EffectKind> {
        match self {
            LedEffect::Static => None,
            LedEffect::Wave => Some(EffectKind::Wave),
            LedEffect::Breath => Some(EffectKind::Breathe),
            LedEffect::Blink => Some(EffectKind::Blink),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LedEffect::Static => "static",
            LedEffect::Wave => "wave",
            LedEffect::Breath => "breath",
            LedEffect::Blink => "blink",
        }
    }
}

impl From<Option<EffectKind>> for LedEffect {
    fn from(kind: Option<EffectKind>) -> Self {
        match kind {
            None => LedEffect::Static,
            Some(EffectKind::Wave) => LedEffect::Wave,
            Some(EffectKind::Breathe) => LedEffect::Breath,
            Some(EffectKind::Blink) => LedEffect::Blink,
        }
    }
}

impl fmt::Display for LedEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LedEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            return Self::from_index(n).ok_or_else(|| format!("effect index {n} out of range (0-3)"));
        }
        match s.to_ascii_lowercase().as_str() {
            "static" | "none" | "off" => Ok(LedEffect::Static),
            "wave" => Ok(LedEffect::Wave),
            "breath" | "breathe" => Ok(LedEffect::Breath),
            "blink" => Ok(LedEffect::Blink),
            other => Err(format!("unknown effect '{other}'")),
        }
    }
}

// ============================================================================
// BacklightController
// ============================================================================

pub struct BacklightController {
    device: DeviceHandle,
    engine: AnimationEngine,
    /// Held across effect start and stop so the mode bookkeeping matches
    /// the engine
    effect_gate: Mutex<()>,
    policy: EffectPolicy,
}

impl BacklightController {
    pub fn new(bus: Arc<dyn Transport>, profile: CapabilityProfile, options: ControllerOptions) -> Self {
        let device = DeviceHandle::new(bus, profile, options.retries);
        let engine = AnimationEngine::new(device.clone());
        engine.set_wave_interval_ms(options.wave_interval_ms);
        Self {
            device,
            engine,
            effect_gate: Mutex::new(()),
            policy: options.policy,
        }
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    pub fn engine(&self) -> &AnimationEngine {
        &self.engine
    }

    pub fn profile(&self) -> &CapabilityProfile {
        self.device.profile()
    }

    pub fn policy(&self) -> EffectPolicy {
        self.policy
    }

    pub fn snapshot(&self) -> BacklightState {
        self.device.snapshot()
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Confirm the firmware interface answers
    pub fn probe(&self) -> Result<u32, KeyboardError> {
        self.device
            .with_io(|io| io.call_method(method::GET_AP, 0))
            .map_err(|e| KeyboardError::DeviceUnavailable(format!("GET_AP probe failed: {e}")))
    }

    /// Probe the device and apply the startup configuration
    pub fn init(&self, initial: &InitialState) -> Result<(), KeyboardError> {
        self.probe()?;
        let profile = *self.profile();
        let colors = profile.resolve_zone_colors(&initial.colors)?;
        let brightness = profile.clamp_level(initial.brightness);

        let mut core = self.device.lock();
        let core = &mut *core;
        core.ops
            .init(&core.io, &mut core.state, initial.power, &colors, brightness)?;
        info!(
            "{} backlight initialized: power {}, brightness {}, colors {}",
            profile.family,
            initial.power,
            brightness,
            format_colors(&colors)
        );
        Ok(())
    }

    /// Re-apply the backlight after the platform woke up
    pub fn resume(&self) -> Result<(), KeyboardError> {
        self.device
            .with_io(|io| io.call_method(method::GET_AP, 0))?;
        let (power, mode) = {
            let core = self.device.lock();
            (core.state.power, core.state.mode)
        };
        if power.is_on() {
            debug!("resume: re-applying {mode}");
            self.set_mode(mode)?;
        }
        Ok(())
    }

    /// Stop effects and leave the hardware in its last commanded state
    pub fn shutdown(&self) {
        if let Some(kind) = self.engine.halt() {
            info!("{kind} effect halted for shutdown");
        }
    }

    // ── Power ──────────────────────────────────────────────────────────

    /// Switch the backlight. Only the Off to On transition restores the
    /// saved colors; turning on a lit keyboard changes nothing.
    pub fn set_power(&self, power: Power) -> Result<(), KeyboardError> {
        if power.is_on() && self.snapshot().power.is_on() {
            debug!("backlight already on");
            return Ok(());
        }
        self.settle_effect()?;

        let mut core = self.device.lock();
        let core = &mut *core;
        match power {
            Power::Off => {
                let mut next = core.state.clone();
                next.saved_colors = next.zone_colors.clone();
                core.ops.set_state(&core.io, &next, Power::Off)?;
                next.power = Power::Off;
                core.state = next;
            }
            Power::On if core.state.power.is_on() => return Ok(()),
            Power::On => {
                core.ops.set_state(&core.io, &core.state, Power::On)?;
                core.state.power = Power::On;
                core.state.zone_colors = core.state.saved_colors.clone();
            }
        }
        info!("backlight {power}");
        Ok(())
    }

    pub fn toggle_power(&self) -> Result<Power, KeyboardError> {
        let next = self.device.lock().state.power.toggled();
        self.set_power(next)?;
        Ok(next)
    }

    // ── Brightness ─────────────────────────────────────────────────────

    /// Set brightness, clamped to the profile's range. 0 is brightest.
    pub fn set_brightness(&self, level: u32) -> Result<u8, KeyboardError> {
        self.ensure_on()?;
        let level = self.profile().clamp_level(level);
        self.settle_effect()?;

        let mut core = self.device.lock();
        let core = &mut *core;
        core.ops.set_brightness(&core.io, &mut core.state, level)?;
        Ok(level)
    }

    /// One step dimmer, stopping at the dimmest level
    pub fn increment_brightness(&self) -> Result<(), KeyboardError> {
        let state = self.snapshot();
        if !state.power.is_on() || state.brightness >= self.profile().max_level() {
            return Ok(());
        }
        self.set_brightness(state.brightness as u32 + 1).map(|_| ())
    }

    /// One step brighter, stopping at level 0
    pub fn decrement_brightness(&self) -> Result<(), KeyboardError> {
        let state = self.snapshot();
        if !state.power.is_on() || state.brightness == 0 {
            return Ok(());
        }
        self.set_brightness(state.brightness as u32 - 1).map(|_| ())
    }

    // ── Color ──────────────────────────────────────────────────────────

    /// Set one color for every zone, or one color per zone
    pub fn set_color(&self, colors: &[ZoneColor]) -> Result<(), KeyboardError> {
        self.ensure_on()?;
        let colors = self.profile().resolve_zone_colors(colors)?;
        self.settle_effect()?;

        let mut core = self.device.lock();
        let core = &mut *core;
        core.ops.set_color(&core.io, &mut core.state, &colors)
    }

    /// Advance zone 0 to the next palette entry and apply it everywhere
    pub fn next_color(&self) -> Result<(), KeyboardError> {
        let state = self.snapshot();
        if !state.power.is_on() {
            return Ok(());
        }
        let profile = self.profile();
        let next = state
            .zone_colors
            .first()
            .and_then(|c| profile.palette_slot(*c))
            .map(|slot| (slot + 1) % profile.palette_len())
            .unwrap_or(0);
        self.set_color(&[ZoneColor::Index(next as u8)])
    }

    // ── Mode ───────────────────────────────────────────────────────────

    /// Trigger a firmware effect, go back to custom colors, or start the
    /// host-driven wave
    pub fn set_mode(&self, mode: BacklightMode) -> Result<(), KeyboardError> {
        self.ensure_on()?;
        if mode == BacklightMode::Wave {
            return self.start_effect(EffectKind::Wave).map(|_| ());
        }
        self.stop_effect()?;

        let mut core = self.device.lock();
        let core = &mut *core;
        core.ops.set_mode(&core.io, &mut core.state, mode)?;
        info!("mode {mode}");
        Ok(())
    }

    pub fn next_mode(&self) -> Result<(), KeyboardError> {
        let state = self.snapshot();
        if !state.power.is_on() {
            return Ok(());
        }
        self.set_mode(state.mode.next())
    }

    // ── Host effects ───────────────────────────────────────────────────

    pub fn start_effect(&self, kind: EffectKind) -> Result<StartOutcome, KeyboardError> {
        self.ensure_on()?;
        let _gate = self.effect_gate.lock();
        if self.engine.active() != Some(kind) {
            let mut core = self.device.lock();
            let core = &mut *core;
            if core.state.mode.is_firmware_native() {
                core.ops
                    .set_mode(&core.io, &mut core.state, BacklightMode::Custom)?;
            }
        }

        let outcome = self.engine.start(kind)?;
        let mut core = self.device.lock();
        match kind {
            EffectKind::Wave => core.state.mode = BacklightMode::Wave,
            _ if core.state.mode == BacklightMode::Wave => core.state.mode = BacklightMode::Custom,
            _ => {}
        }
        Ok(outcome)
    }

    /// Stop any host effect; the keyboard is left at full brightness
    pub fn stop_effect(&self) -> Result<Option<EffectKind>, KeyboardError> {
        let _gate = self.effect_gate.lock();
        let result = self.engine.stop();
        let mut core = self.device.lock();
        if core.state.mode == BacklightMode::Wave {
            core.state.mode = BacklightMode::Custom;
        }
        result
    }

    pub fn led_effect(&self) -> LedEffect {
        self.engine.active().into()
    }

    pub fn set_led_effect(&self, effect: LedEffect) -> Result<(), KeyboardError> {
        match effect.effect_kind() {
            Some(kind) => self.start_effect(kind).map(|_| ()),
            None => {
                if self.stop_effect()?.is_none() && self.snapshot().power.is_on() {
                    let mut core = self.device.lock();
                    let core = &mut *core;
                    core.ops.set_brightness(&core.io, &mut core.state, 0)?;
                }
                Ok(())
            }
        }
    }

    pub fn wave_interval_ms(&self) -> u64 {
        self.engine.wave_interval_ms()
    }

    pub fn set_wave_interval_ms(&self, ms: u64) -> u64 {
        self.engine.set_wave_interval_ms(ms)
    }

    pub fn wave_period_ms(&self) -> u64 {
        self.engine.wave_period_ms()
    }

    pub fn set_wave_period_ms(&self, period_ms: u64) -> u64 {
        self.engine.set_wave_period_ms(period_ms)
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn ensure_on(&self) -> Result<(), KeyboardError> {
        if self.device.lock().state.power.is_on() {
            Ok(())
        } else {
            Err(KeyboardError::PoweredOff)
        }
    }

    /// Apply the effect policy ahead of a direct command
    fn settle_effect(&self) -> Result<(), KeyboardError> {
        match self.policy {
            EffectPolicy::Race => Ok(()),
            EffectPolicy::StopEffect => self.stop_effect().map(|_| ()),
        }
    }
}

fn format_colors(colors: &[ZoneColor]) -> String {
    colors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::RgbColor;
    use xsm_transport::mock::MockBus;
    use xsm_transport::protocol::kb;

    fn controller(profile: CapabilityProfile) -> (Arc<MockBus>, BacklightController) {
        let bus = Arc::new(MockBus::new());
        let ctl = BacklightController::new(bus.clone(), profile, ControllerOptions::default());
        ctl.init(&InitialState::default()).unwrap();
        bus.clear_log();
        (bus, ctl)
    }

    #[test]
    fn test_probe_failure_is_device_unavailable() {
        let bus = Arc::new(MockBus::new());
        bus.set_available(false);
        let ctl = BacklightController::new(bus, CapabilityProfile::FULL_COLOR, ControllerOptions::default());
        assert!(matches!(
            ctl.init(&InitialState::default()),
            Err(KeyboardError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_init_clamps_and_expands() {
        let bus = Arc::new(MockBus::new());
        let ctl = BacklightController::new(bus.clone(), CapabilityProfile::FULL_COLOR, ControllerOptions::default());
        let initial = InitialState {
            power: Power::On,
            brightness: 42,
            colors: vec![ZoneColor::Rgb(RgbColor::RED)],
        };
        ctl.init(&initial).unwrap();

        let state = ctl.snapshot();
        assert_eq!(state.brightness, 9);
        assert_eq!(state.zone_colors, vec![ZoneColor::Rgb(RgbColor::RED); 3]);
        assert_eq!(state.mode, BacklightMode::Custom);
        assert_eq!(bus.kb_led_arguments()[0], kb::STATE | kb::STATE_ON);
    }

    #[test]
    fn test_brightness_encoding() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        for level in 0..10u32 {
            assert_eq!(ctl.set_brightness(level).unwrap(), level as u8);
            assert_eq!(ctl.snapshot().brightness, level as u8);
        }
        let expected: Vec<u32> = (0..10).map(|l| kb::BRIGHTNESS | (0xFF - l * 0x19)).collect();
        assert_eq!(bus.kb_led_arguments(), expected);
    }

    #[test]
    fn test_failed_brightness_leaves_state() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_brightness(4).unwrap();
        bus.fail_once(|_| true);
        assert!(ctl.set_brightness(6).is_err());
        assert_eq!(ctl.snapshot().brightness, 4);
    }

    #[test]
    fn test_increment_clamps_and_decrement_floors() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.decrement_brightness().unwrap();
        assert!(bus.commands().is_empty());

        ctl.set_brightness(9).unwrap();
        bus.clear_log();
        ctl.increment_brightness().unwrap();
        assert!(bus.commands().is_empty());
        assert_eq!(ctl.snapshot().brightness, 9);

        ctl.decrement_brightness().unwrap();
        assert_eq!(ctl.snapshot().brightness, 8);
    }

    #[test]
    fn test_commands_while_off() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_power(Power::Off).unwrap();
        bus.clear_log();

        assert!(matches!(ctl.set_brightness(2), Err(KeyboardError::PoweredOff)));
        assert!(matches!(
            ctl.set_color(&[ZoneColor::Rgb(RgbColor::RED)]),
            Err(KeyboardError::PoweredOff)
        ));
        ctl.increment_brightness().unwrap();
        ctl.next_mode().unwrap();
        ctl.next_color().unwrap();
        assert!(bus.commands().is_empty());
    }

    #[test]
    fn test_power_round_trip() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        let colors = [
            ZoneColor::Rgb(RgbColor::RED),
            ZoneColor::Rgb(RgbColor::GREEN),
            ZoneColor::Rgb(RgbColor::PURPLE),
        ];
        ctl.set_color(&colors).unwrap();
        ctl.set_power(Power::Off).unwrap();
        assert_eq!(ctl.snapshot().power, Power::Off);
        assert_eq!(ctl.snapshot().saved_colors, colors.to_vec());

        bus.clear_log();
        assert_eq!(ctl.toggle_power().unwrap(), Power::On);
        let state = ctl.snapshot();
        assert_eq!(state.zone_colors, colors.to_vec());
        assert_eq!(&bus.kb_led_arguments()[..3], &[0xF000_FF00, 0xF100_00FF, 0xF2FF_8000]);
    }

    #[test]
    fn test_power_on_while_on_keeps_colors() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_color(&[ZoneColor::Rgb(RgbColor::RED)]).unwrap();
        bus.clear_log();

        ctl.set_power(Power::On).unwrap();
        assert!(bus.kb_led_arguments().is_empty());
        let state = ctl.snapshot();
        assert_eq!(state.power, Power::On);
        assert_eq!(state.zone_colors, vec![ZoneColor::Rgb(RgbColor::RED); 3]);
    }

    #[test]
    fn test_concurrent_effect_changes_keep_mode_consistent() {
        let (_bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_wave_interval_ms(10);
        std::thread::scope(|s| {
            for worker in 0..4 {
                let ctl = &ctl;
                s.spawn(move || {
                    for round in 0..5 {
                        match (worker + round) % 3 {
                            0 => ctl.start_effect(EffectKind::Wave).map(|_| ()).unwrap(),
                            1 => ctl.start_effect(EffectKind::Blink).map(|_| ()).unwrap(),
                            _ => ctl.stop_effect().map(|_| ()).unwrap(),
                        }
                    }
                });
            }
        });

        let wave_running = ctl.engine().active() == Some(EffectKind::Wave);
        assert_eq!(ctl.snapshot().mode == BacklightMode::Wave, wave_running);
        ctl.stop_effect().unwrap();
        assert_ne!(ctl.snapshot().mode, BacklightMode::Wave);
    }

    #[test]
    fn test_failed_power_off_keeps_state() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        bus.fail_once(|_| true);
        assert!(ctl.set_power(Power::Off).is_err());
        assert_eq!(ctl.snapshot().power, Power::On);
    }

    #[test]
    fn test_set_color_rejects_bad_input() {
        let (bus, ctl) = controller(CapabilityProfile::EIGHT_COLOR);
        assert!(matches!(
            ctl.set_color(&[ZoneColor::Rgb(RgbColor::ORANGE)]),
            Err(KeyboardError::InvalidArgument(_))
        ));
        assert!(matches!(
            ctl.set_color(&[ZoneColor::Index(1), ZoneColor::Index(2)]),
            Err(KeyboardError::InvalidArgument(_))
        ));
        assert!(bus.commands().is_empty());
    }

    #[test]
    fn test_set_color_forces_custom() {
        let (_bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_mode(BacklightMode::Dance).unwrap();
        ctl.set_color(&[ZoneColor::Index(3)]).unwrap();
        assert_eq!(ctl.snapshot().mode, BacklightMode::Custom);
    }

    #[test]
    fn test_next_color_walks_palette() {
        let (_bus, ctl) = controller(CapabilityProfile::EIGHT_COLOR);
        // default blue is palette slot 1
        ctl.next_color().unwrap();
        assert_eq!(ctl.snapshot().zone_colors, vec![ZoneColor::Index(2); 3]);

        ctl.set_color(&[ZoneColor::Index(7)]).unwrap();
        ctl.next_color().unwrap();
        assert_eq!(ctl.snapshot().zone_colors, vec![ZoneColor::Index(0); 3]);
    }

    #[test]
    fn test_next_color_restarts_for_unnamed_rgb() {
        let (_bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_color(&[ZoneColor::Rgb(RgbColor::new(1, 2, 3))]).unwrap();
        ctl.next_color().unwrap();
        assert_eq!(ctl.snapshot().zone_colors, vec![ZoneColor::Rgb(RgbColor::BLACK); 3]);
    }

    #[test]
    fn test_wave_mode_uses_engine() {
        let (_bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_mode(BacklightMode::Wave).unwrap();
        assert_eq!(ctl.snapshot().mode, BacklightMode::Wave);
        assert_eq!(ctl.led_effect(), LedEffect::Wave);

        ctl.set_mode(BacklightMode::Cycle).unwrap();
        assert!(!ctl.engine().is_running());
        assert_eq!(ctl.snapshot().mode, BacklightMode::Cycle);
    }

    #[test]
    fn test_host_effect_replaces_firmware_effect() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_mode(BacklightMode::Tempo).unwrap();
        bus.clear_log();

        ctl.start_effect(EffectKind::Blink).unwrap();
        assert_eq!(ctl.snapshot().mode, BacklightMode::Custom);
        assert_eq!(bus.kb_led_arguments()[0], kb::MODE_RESET);
        ctl.shutdown();
    }

    #[test]
    fn test_static_selector_writes_max_brightness() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_brightness(7).unwrap();
        bus.clear_log();

        ctl.set_led_effect(LedEffect::Static).unwrap();
        assert_eq!(bus.kb_led_arguments(), vec![0xF400_00FF]);
        assert_eq!(ctl.snapshot().brightness, 0);
    }

    #[test]
    fn test_stop_policy_ends_effect_before_direct_write() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.start_effect(EffectKind::Breathe).unwrap();
        ctl.set_brightness(3).unwrap();

        assert!(!ctl.engine().is_running());
        assert_eq!(bus.kb_led_arguments().last(), Some(&(kb::BRIGHTNESS | 0xB4)));
        assert_eq!(ctl.snapshot().brightness, 3);
    }

    #[test]
    fn test_resume_reapplies_mode() {
        let (bus, ctl) = controller(CapabilityProfile::FULL_COLOR);
        ctl.set_mode(BacklightMode::Flash).unwrap();
        bus.clear_log();

        ctl.resume().unwrap();
        let methods: Vec<_> = bus.commands().iter().map(|c| c.opcode).collect();
        assert_eq!(methods[0], xsm_transport::Opcode::Method(method::GET_AP));
        assert_eq!(bus.kb_led_arguments(), vec![kb::MODE_RESET, kb::MODE_FLASH]);
    }

    #[test]
    fn test_led_effect_parse() {
        assert_eq!("2".parse::<LedEffect>().unwrap(), LedEffect::Breath);
        assert_eq!("blink".parse::<LedEffect>().unwrap(), LedEffect::Blink);
        assert!("4".parse::<LedEffect>().is_err());
        assert_eq!("race".parse::<EffectPolicy>().unwrap(), EffectPolicy::Race);
        assert_eq!("stop-effect".parse::<EffectPolicy>().unwrap(), EffectPolicy::StopEffect);
    }
}
