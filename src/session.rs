//! One open keyboard: bus, controller, hotkey plumbing and EC helpers
//!
//! A `Session` is what the CLI and the daemon hold. It owns the background
//! workers (airplane LED queue, optional hotkey poller, animation engine)
//! and stops all of them on [`Session::shutdown`] or drop.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use xsm_keyboard::{
    AirplaneLed, BacklightController, EventDispatcher, HotkeyAction, HotkeyPoller, KeyboardError, LogSink, Power,
    Thermal, WorkQueue, Wwan,
};
use xsm_transport::{AcpiCallWmi, DeviceChannel, EcRegisterFile, Transport};

use crate::config::{BacklightConfig, BusConfig, Config};

/// Open whichever buses are present and route between them
pub fn open_bus(config: &BusConfig) -> anyhow::Result<Arc<dyn Transport>> {
    let wmi = match AcpiCallWmi::open(&config.acpi_call, config.wmbb_method.clone()) {
        Ok(wmi) => Some(Arc::new(wmi) as Arc<dyn Transport>),
        Err(e) => {
            warn!("firmware method bus unavailable: {e}");
            None
        }
    };
    let ec = match EcRegisterFile::open_first(config.ec_paths.as_slice()) {
        Ok(ec) => Some(Arc::new(ec) as Arc<dyn Transport>),
        Err(e) => {
            warn!("EC register bus unavailable: {e}");
            None
        }
    };
    if wmi.is_none() && ec.is_none() {
        bail!("no usable bus: load acpi_call and ec_sys (write_support=1), or check [bus] in the config");
    }
    let channel = DeviceChannel::new(wmi, ec);
    info!("opened {}", channel.info().path);
    Ok(Arc::new(channel))
}

pub struct Session {
    config: Config,
    bus: Arc<dyn Transport>,
    controller: Arc<BacklightController>,
    dispatcher: Arc<EventDispatcher>,
    airplane: Arc<AirplaneLed>,
    thermal: Thermal,
    wwan: Wwan,
    poller: Mutex<Option<HotkeyPoller>>,
}

impl Session {
    /// Open the real buses described by `config.bus` and initialize
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let bus = open_bus(&config.bus)?;
        Self::with_bus(config, bus)
    }

    /// Initialize the backlight on an already-open bus
    pub fn with_bus(config: &Config, bus: Arc<dyn Transport>) -> anyhow::Result<Self> {
        let profile = config.profile()?;
        debug!("using {} profile", profile.family);

        let controller = Arc::new(BacklightController::new(
            bus.clone(),
            profile,
            config.controller_options(),
        ));
        controller
            .init(&config.initial_state())
            .context("initializing keyboard backlight")?;

        let device = controller.device().clone();
        let queue = Arc::new(WorkQueue::new("xsm-airplane")?);
        let airplane = Arc::new(AirplaneLed::new(device.clone(), queue, config.hotkeys.led_invert));
        let dispatcher = Arc::new(EventDispatcher::new(
            controller.clone(),
            Arc::new(LogSink),
            config.backlight.cycle_colors,
        ));

        Ok(Self {
            config: config.clone(),
            bus,
            controller,
            dispatcher,
            airplane,
            thermal: Thermal::new(device.clone()),
            wwan: Wwan::new(device),
            poller: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &Arc<dyn Transport> {
        &self.bus
    }

    pub fn controller(&self) -> &Arc<BacklightController> {
        &self.controller
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn airplane(&self) -> &AirplaneLed {
        &self.airplane
    }

    pub fn thermal(&self) -> &Thermal {
        &self.thermal
    }

    pub fn wwan(&self) -> &Wwan {
        &self.wwan
    }

    // ── Hotkeys ────────────────────────────────────────────────────────

    /// Start polling for airplane presses if `[hotkeys] poll` is set.
    /// Returns whether a poller is running afterwards.
    pub fn start_poller(&self) -> Result<bool, KeyboardError> {
        let mut slot = self.poller.lock();
        if slot.as_ref().is_some_and(|p| p.is_running()) {
            return Ok(true);
        }
        if !self.config.hotkeys.poll || self.dispatcher.counter().push_active() {
            return Ok(false);
        }
        let poller = HotkeyPoller::start(
            self.controller.device().clone(),
            self.dispatcher.counter(),
            self.dispatcher.sink(),
            self.airplane.clone(),
            self.config.hotkeys.poll_freq,
        )?;
        *slot = Some(poller);
        Ok(true)
    }

    pub fn poller_running(&self) -> bool {
        self.poller.lock().as_ref().is_some_and(|p| p.is_running())
    }

    pub fn stop_poller(&self) {
        if let Some(mut poller) = self.poller.lock().take() {
            poller.stop();
        }
    }

    /// Feed a pushed event code to the dispatcher
    pub fn handle_event(&self, code: u32) -> Result<Option<HotkeyAction>, KeyboardError> {
        let action = self.dispatcher.on_hardware_event(code)?;
        if self.dispatcher.counter().push_active() {
            self.stop_poller();
        }
        Ok(action)
    }

    /// Feed a raw notify value (0xD0 means "read the event code")
    pub fn handle_notify(&self, value: u32) -> Result<Option<HotkeyAction>, KeyboardError> {
        let action = self.dispatcher.on_notify(value)?;
        if self.dispatcher.counter().push_active() {
            self.stop_poller();
        }
        Ok(action)
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Current backlight state in config form
    pub fn backlight_config(&self) -> BacklightConfig {
        let state = self.controller.snapshot();
        let colors = match state.power {
            Power::On => state.zone_colors,
            Power::Off => state.saved_colors,
        };
        BacklightConfig {
            power: state.power,
            brightness: state.brightness as u32,
            colors,
            ..self.config.backlight.clone()
        }
    }

    /// Write the current backlight state back to the config file so the
    /// next session starts from it
    pub fn persist(&self, path: &Path) -> anyhow::Result<()> {
        let mut config = self.config.clone();
        config.backlight = self.backlight_config();
        if config == self.config {
            return Ok(());
        }
        config.save(path)?;
        debug!("saved backlight state to {}", path.display());
        Ok(())
    }

    /// Stop the poller and any effect, and drain pending LED writes
    pub fn shutdown(&self) {
        self.stop_poller();
        self.controller.shutdown();
        if let Err(e) = self.airplane.flush() {
            warn!("pending airplane LED writes lost: {e}");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
