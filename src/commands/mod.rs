//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `backlight`: power, brightness, color and mode (status, on, off, ...)
//! - `effect`: host effects and wave timing (effect, interval, period)
//! - `system`: airplane LED, sensors, fan, power profile, WWAN, attributes
//! - `daemon`: hotkey event injection and the foreground hotkey service

pub mod backlight;
pub mod daemon;
pub mod effect;
pub mod system;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use xsm_driver::{Config, Session};
use xsm_transport::mock::MockBus;
use xsm_transport::Transport;

/// Result type for command handlers
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Options shared by every command
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub dry_run: bool,
    pub save: bool,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>, dry_run: bool, no_save: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = config_path.unwrap_or_else(Config::default_path);
        let config = Config::load(&config_path)?;
        Ok(Self {
            config,
            config_path,
            dry_run,
            save: !no_save && !dry_run,
        })
    }
}

/// Open a session, run `f` with it, then shut it down.
///
/// With `persist`, the resulting backlight state is written back to the
/// config file when `f` succeeded. In dry-run mode the commands the mock
/// bus received are printed afterwards.
pub fn with_session<F>(ctx: &Context, persist: bool, f: F) -> CommandResult
where
    F: FnOnce(&Session) -> CommandResult,
{
    let mock = ctx.dry_run.then(|| Arc::new(MockBus::new()));
    let session = match &mock {
        Some(bus) => Session::with_bus(&ctx.config, bus.clone() as Arc<dyn Transport>)?,
        None => Session::open(&ctx.config)?,
    };

    let result = f(&session);
    session.shutdown();

    if result.is_ok() && persist && ctx.save {
        if let Err(e) = session.persist(&ctx.config_path) {
            warn!("could not save backlight state: {e}");
        }
    }
    if let Some(bus) = mock {
        println!("\nCommands sent (dry run):");
        for command in bus.commands() {
            println!("  {command}");
        }
    }
    result
}

/// Set up a Ctrl-C handler that sets the given flag to false when triggered.
/// Returns the Arc<AtomicBool> for use in the main loop.
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}

/// Block until Ctrl-C, checking the flag every `tick`
pub fn wait_for_interrupt(running: &AtomicBool, tick: Duration) {
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(tick);
    }
}

/// Unsigned integer, decimal or `0x` hex
pub fn parse_code(value: &str) -> Result<u32, Box<dyn std::error::Error>> {
    let value = value.trim();
    let code = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16)?,
        None => value.parse()?,
    };
    Ok(code)
}
