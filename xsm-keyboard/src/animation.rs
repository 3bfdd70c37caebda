//! Host-driven backlight animations
//!
//! One worker thread per running effect. Each tick takes the device lock,
//! writes one frame straight to the bus (no state bookkeeping) and releases
//! the lock before sleeping. Stopping signals the worker and joins it, so no
//! tick can run after [`AnimationEngine::stop`] returns.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use xsm_transport::TransportError;

use crate::device::{DeviceCore, DeviceHandle};
use crate::error::KeyboardError;
use crate::led::RgbColor;

// ── Timing ─────────────────────────────────────────────────────────────

pub const WAVE_STEPS: usize = 19;
/// Triangular ramp, brightest → dimmest → brightest
const WAVE_LEVELS: [u8; WAVE_STEPS] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0];
/// Step at which the wave switches color (dimmest point)
const WAVE_COLOR_STEP: usize = 9;

pub const WAVE_PALETTE: [RgbColor; 11] = [
    RgbColor::BLUE,
    RgbColor::CYAN,
    RgbColor::GREEN,
    RgbColor::YELLOW,
    RgbColor::ORANGE,
    RgbColor::RED,
    RgbColor::PINK,
    RgbColor::MAGENTA,
    RgbColor::PURPLE,
    RgbColor::TEAL,
    RgbColor::WHITE,
];

const BREATHE_LEVELS: [u8; 18] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 8, 7, 6, 5, 4, 3, 2, 1];

/// Dimmest level used by the host effects
const DIM_LEVEL: u8 = 9;

pub const DEFAULT_WAVE_INTERVAL_MS: u64 = 40;
pub const MIN_WAVE_INTERVAL_MS: u64 = 10;
pub const MIN_WAVE_PERIOD_MS: u64 = 200;
pub const BREATHE_INTERVAL_MS: u64 = 100;
pub const BLINK_INTERVAL_MS: u64 = 500;

// ── Types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Wave,
    Breathe,
    Blink,
}

impl EffectKind {
    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Wave => "wave",
            EffectKind::Breathe => "breathe",
            EffectKind::Blink => "blink",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wave" => Ok(EffectKind::Wave),
            "breathe" | "breath" => Ok(EffectKind::Breathe),
            "blink" => Ok(EffectKind::Blink),
            other => Err(format!("unknown effect '{other}'")),
        }
    }
}

/// Lifecycle notifications published by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectEvent {
    Started(EffectKind),
    Stopped(EffectKind),
    /// A running effect was stopped to make room for another
    Preempted {
        previous: EffectKind,
        next: EffectKind,
    },
}

/// Result of [`AnimationEngine::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    Preempted(EffectKind),
}

/// Per-run frame counter
struct EffectTimer {
    kind: EffectKind,
    step: usize,
    blink_dim: bool,
}

impl EffectTimer {
    fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            step: 0,
            blink_dim: true,
        }
    }

    fn tick(&mut self, core: &DeviceCore, wave_color: &AtomicUsize) -> Result<(), TransportError> {
        let (ops, io, state) = (&core.ops, &core.io, &core.state);
        match self.kind {
            EffectKind::Wave => {
                let step = self.step;
                self.step = (step + 1) % WAVE_STEPS;
                let level = WAVE_LEVELS[step];
                ops.write_brightness(io, state, level)?;
                if step == WAVE_COLOR_STEP {
                    let idx = (wave_color.load(Ordering::Relaxed) + 1) % WAVE_PALETTE.len();
                    wave_color.store(idx, Ordering::Relaxed);
                    ops.write_frame_color(io, state, WAVE_PALETTE[idx], level)?;
                }
            }
            EffectKind::Breathe => {
                let step = self.step;
                self.step = (step + 1) % BREATHE_LEVELS.len();
                ops.write_brightness(io, state, BREATHE_LEVELS[step])?;
            }
            EffectKind::Blink => {
                let level = if self.blink_dim { DIM_LEVEL } else { 0 };
                self.blink_dim = !self.blink_dim;
                ops.write_brightness(io, state, level)?;
            }
        }
        Ok(())
    }

    fn interval(&self, wave_interval_ms: &AtomicU64) -> Duration {
        Duration::from_millis(match self.kind {
            EffectKind::Wave => wave_interval_ms.load(Ordering::Relaxed),
            EffectKind::Breathe => BREATHE_INTERVAL_MS,
            EffectKind::Blink => BLINK_INTERVAL_MS,
        })
    }
}

struct Worker {
    kind: EffectKind,
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Signal and wait for the in-flight tick to finish
    fn shutdown(self) -> EffectKind {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            warn!("{} effect worker panicked", self.kind);
        }
        self.kind
    }
}

// ============================================================================
// AnimationEngine
// ============================================================================

pub struct AnimationEngine {
    device: DeviceHandle,
    wave_interval_ms: Arc<AtomicU64>,
    /// Survives restarts so a resumed wave continues its color sequence
    wave_color: Arc<AtomicUsize>,
    worker: Mutex<Option<Worker>>,
    events: broadcast::Sender<EffectEvent>,
}

impl AnimationEngine {
    pub fn new(device: DeviceHandle) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            device,
            wave_interval_ms: Arc::new(AtomicU64::new(DEFAULT_WAVE_INTERVAL_MS)),
            wave_color: Arc::new(AtomicUsize::new(0)),
            worker: Mutex::new(None),
            events,
        }
    }

    /// Subscribe to start/stop/preempt notifications
    pub fn subscribe(&self) -> broadcast::Receiver<EffectEvent> {
        self.events.subscribe()
    }

    pub fn active(&self) -> Option<EffectKind> {
        self.worker.lock().as_ref().map(|w| w.kind)
    }

    pub fn is_running(&self) -> bool {
        self.active().is_some()
    }

    /// Start `kind`, stopping any other running effect first.
    ///
    /// Must not be called while holding the device lock.
    pub fn start(&self, kind: EffectKind) -> Result<StartOutcome, KeyboardError> {
        let mut slot = self.worker.lock();

        let mut outcome = StartOutcome::Started;
        if let Some(current) = slot.as_ref().map(|w| w.kind) {
            if current == kind {
                return Ok(StartOutcome::AlreadyRunning);
            }
            if let Some(worker) = slot.take() {
                worker.shutdown();
            }
            self.restore_brightness()?;
            warn!("{current} effect preempted by {kind}");
            let _ = self.events.send(EffectEvent::Preempted {
                previous: current,
                next: kind,
            });
            outcome = StartOutcome::Preempted(current);
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let mut timer = EffectTimer::new(kind);
        let device = self.device.clone();
        let interval = Arc::clone(&self.wave_interval_ms);
        let wave_color = Arc::clone(&self.wave_color);

        let handle = std::thread::Builder::new()
            .name(format!("xsm-effect-{kind}"))
            .spawn(move || {
                debug!("{kind} effect worker started");
                loop {
                    {
                        let core = device.lock();
                        if let Err(e) = timer.tick(&core, &wave_color) {
                            warn!("{kind} frame failed: {e}");
                        }
                    }
                    match stop_rx.recv_timeout(timer.interval(&interval)) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("{kind} effect worker stopped");
            })
            .map_err(|e| KeyboardError::Internal(format!("failed to spawn effect worker: {e}")))?;

        *slot = Some(Worker {
            kind,
            stop_tx,
            handle,
        });
        info!("{kind} effect started");
        let _ = self.events.send(EffectEvent::Started(kind));
        Ok(outcome)
    }

    /// Stop the running effect and leave the keyboard at full brightness.
    ///
    /// Returns the stopped effect, or `None` when idle. Must not be called
    /// while holding the device lock.
    pub fn stop(&self) -> Result<Option<EffectKind>, KeyboardError> {
        let Some(kind) = self.halt() else {
            return Ok(None);
        };
        let restored = self.restore_brightness();
        info!("{kind} effect stopped");
        let _ = self.events.send(EffectEvent::Stopped(kind));
        restored.map(|_| Some(kind))
    }

    /// Stop the worker without touching the hardware
    pub fn halt(&self) -> Option<EffectKind> {
        let worker = self.worker.lock().take()?;
        Some(worker.shutdown())
    }

    fn restore_brightness(&self) -> Result<(), KeyboardError> {
        let mut core = self.device.lock();
        let core = &mut *core;
        core.ops.write_brightness(&core.io, &core.state, 0)?;
        core.state.brightness = 0;
        Ok(())
    }

    // ── Wave timing ────────────────────────────────────────────────────

    pub fn wave_interval_ms(&self) -> u64 {
        self.wave_interval_ms.load(Ordering::Relaxed)
    }

    /// Set the wave tick interval; returns the clamped value in effect
    pub fn set_wave_interval_ms(&self, ms: u64) -> u64 {
        let ms = ms.max(MIN_WAVE_INTERVAL_MS);
        self.wave_interval_ms.store(ms, Ordering::Relaxed);
        ms
    }

    /// Duration of one full brightness ramp
    pub fn wave_period_ms(&self) -> u64 {
        self.wave_interval_ms() * WAVE_STEPS as u64
    }

    /// Set the interval from a full-ramp period; returns the new interval
    pub fn set_wave_period_ms(&self, period_ms: u64) -> u64 {
        let period = period_ms.max(MIN_WAVE_PERIOD_MS);
        self.set_wave_interval_ms(period / WAVE_STEPS as u64)
    }

    /// Current wave palette position
    pub fn wave_color_index(&self) -> usize {
        self.wave_color.load(Ordering::Relaxed)
    }
}

impl Drop for AnimationEngine {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CapabilityProfile;
    use xsm_transport::mock::MockBus;
    use xsm_transport::protocol::kb;

    fn engine() -> (Arc<MockBus>, AnimationEngine) {
        let bus = Arc::new(MockBus::new());
        let device = DeviceHandle::new(bus.clone(), CapabilityProfile::FULL_COLOR, 0);
        (bus, AnimationEngine::new(device))
    }

    fn brightness_args(bus: &MockBus) -> Vec<u32> {
        bus.kb_led_arguments()
            .into_iter()
            .filter(|a| a & 0xFF00_0000 == kb::BRIGHTNESS)
            .collect()
    }

    /// Wait until the bus has seen at least `count` brightness frames
    fn collect_frames(bus: &MockBus, count: usize, timeout: Duration) -> Vec<u32> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let frames = brightness_args(bus);
            if frames.len() >= count || std::time::Instant::now() >= deadline {
                return frames.into_iter().take(count).collect();
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_wave_interval_clamps() {
        let (_bus, engine) = engine();
        assert_eq!(engine.wave_interval_ms(), 40);
        assert_eq!(engine.wave_period_ms(), 760);
        assert_eq!(engine.set_wave_interval_ms(3), 10);
        assert_eq!(engine.set_wave_period_ms(50), 10);
        assert_eq!(engine.set_wave_period_ms(1900), 100);
        assert_eq!(engine.wave_period_ms(), 1900);
    }

    #[test]
    fn test_first_tick_is_immediate() {
        let (bus, engine) = engine();
        engine.set_wave_interval_ms(10_000);
        assert_eq!(engine.start(EffectKind::Wave).unwrap(), StartOutcome::Started);
        assert!(bus.wait_for(Duration::from_secs(2), |c| c.argument == 0xF400_00FF));
        engine.halt();
    }

    #[test]
    fn test_wave_ramp_and_color_change() {
        let (bus, engine) = engine();
        engine.set_wave_interval_ms(10);
        engine.start(EffectKind::Wave).unwrap();
        // the first color change happens on the tenth tick
        assert!(bus.wait_for(Duration::from_secs(5), |c| c.argument == 0xF0FF_00FF));
        engine.halt();

        let ramp: Vec<u32> = brightness_args(&bus).into_iter().take(10).collect();
        let expected: Vec<u32> = (0..10).map(|l| kb::BRIGHTNESS | (0xFF - l * 0x19)).collect();
        assert_eq!(ramp, expected);
        assert_eq!(engine.wave_color_index(), 1);
    }

    #[test]
    fn test_stop_restores_full_brightness_and_joins() {
        let (bus, engine) = engine();
        engine.set_wave_interval_ms(10);
        engine.start(EffectKind::Wave).unwrap();
        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(engine.stop().unwrap(), Some(EffectKind::Wave));
        assert!(!engine.is_running());
        let count = bus.commands().len();
        assert_eq!(brightness_args(&bus).last(), Some(&0xF400_00FF));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(bus.commands().len(), count, "no tick may run after stop");
        assert_eq!(engine.stop().unwrap(), None);
    }

    #[test]
    fn test_start_preempts_other_effect() {
        let (_bus, engine) = engine();
        let mut events = engine.subscribe();

        engine.start(EffectKind::Blink).unwrap();
        assert_eq!(engine.start(EffectKind::Blink).unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(
            engine.start(EffectKind::Breathe).unwrap(),
            StartOutcome::Preempted(EffectKind::Blink)
        );
        assert_eq!(engine.active(), Some(EffectKind::Breathe));
        engine.halt();

        assert_eq!(events.try_recv().unwrap(), EffectEvent::Started(EffectKind::Blink));
        assert_eq!(
            events.try_recv().unwrap(),
            EffectEvent::Preempted {
                previous: EffectKind::Blink,
                next: EffectKind::Breathe
            }
        );
        assert_eq!(events.try_recv().unwrap(), EffectEvent::Started(EffectKind::Breathe));
    }

    #[test]
    fn test_breathe_ramps_and_wraps_without_hold() {
        let (bus, engine) = engine();
        engine.start(EffectKind::Breathe).unwrap();
        // 18 frames per cycle at 100 ms, plus the first frame of the next
        let frames = collect_frames(&bus, 19, Duration::from_secs(10));
        engine.halt();

        let expected: Vec<u32> = BREATHE_LEVELS
            .iter()
            .chain(std::iter::once(&0))
            .map(|&l| kb::BRIGHTNESS | (0xFF - l as u32 * 0x19))
            .collect();
        assert_eq!(frames, expected);
    }

    #[test]
    fn test_blink_alternates_dim_and_bright() {
        let (bus, engine) = engine();
        engine.start(EffectKind::Blink).unwrap();
        let frames = collect_frames(&bus, 3, Duration::from_secs(5));
        engine.halt();
        assert_eq!(
            frames,
            vec![kb::BRIGHTNESS | 0x1E, kb::BRIGHTNESS | 0xFF, kb::BRIGHTNESS | 0x1E]
        );
    }

    #[test]
    fn test_failed_frames_do_not_stop_the_effect() {
        let (bus, engine) = engine();
        engine.set_wave_interval_ms(10);
        bus.fail_once(|c| c.argument == 0xF400_00FF);
        engine.start(EffectKind::Wave).unwrap();
        assert!(bus.wait_for(Duration::from_secs(5), |c| c.argument == kb::BRIGHTNESS | 0xE6));
        engine.halt();
    }
}
