// CLI definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use xsm_driver::Attribute;
use xsm_keyboard::{BacklightMode, FanMode, LedEffect, PowerProfile, ZoneColor};

#[derive(Parser)]
#[command(name = "xsmctl")]
#[command(author, version, about = "Clevo XSM keyboard backlight, hotkey and fan control")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: ~/.config/clevo-xsm/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Talk to an in-memory bus and print the commands that would be sent
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Do not write the resulting backlight state back to the config file
    #[arg(long, global = true)]
    pub no_save: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Backlight ===
    /// Show backlight state, active effect and wave timing
    #[command(visible_aliases = ["st", "s"])]
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Turn the backlight on, restoring the saved colors
    On,

    /// Turn the backlight off
    Off,

    /// Toggle backlight power
    #[command(visible_alias = "t")]
    Toggle,

    /// Get or set brightness (0 = brightest)
    #[command(visible_aliases = ["bright", "b"])]
    Brightness {
        /// New level; out-of-range values clamp to the dimmest level
        level: Option<u32>,
    },

    /// One step brighter
    Up,

    /// One step dimmer
    Down,

    /// Get or set zone colors: one for all zones, or one per zone
    #[command(visible_alias = "c")]
    Color {
        /// Palette names (blue, red, cyan...) or #RRGGBB
        colors: Vec<ZoneColor>,
    },

    /// Get or set the backlight mode
    #[command(visible_alias = "m")]
    Mode {
        /// Mode name (custom, breathe, cycle, wave, ...) or index 0-7
        mode: Option<BacklightMode>,
    },

    /// Advance to the next mode in hotkey order
    #[command(visible_alias = "nm")]
    NextMode,

    /// Advance to the next palette color
    #[command(visible_alias = "nc")]
    NextColor,

    /// Re-apply the backlight after suspend (for a system sleep hook)
    Resume,

    // === Host effects ===
    /// Run a host-driven effect in the foreground until Ctrl-C
    #[command(visible_aliases = ["fx", "e"])]
    Effect {
        /// static, wave, breath or blink
        effect: LedEffect,
    },

    /// Get or set the wave tick interval in milliseconds (min 10)
    #[command(visible_alias = "int")]
    Interval { ms: Option<u64> },

    /// Get or set the full wave cycle period in milliseconds (min 200)
    #[command(visible_alias = "per")]
    Period { ms: Option<u64> },

    // === Hotkeys ===
    /// Inject a hotkey event code (e.g. 0x81) as if the firmware pushed it
    #[command(visible_alias = "ev")]
    Event {
        /// Event code, decimal or 0x-prefixed hex
        code: String,
        /// Treat CODE as a raw notify value (0xD0 reads the code from firmware)
        #[arg(long)]
        notify: bool,
    },

    /// Get or set the airplane-mode LED
    #[command(visible_aliases = ["airplane", "ap"])]
    AirplaneLed { state: Option<Switch> },

    // === System ===
    /// Show fan speeds and temperatures
    #[command(visible_aliases = ["sens", "temp"])]
    Sensors {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Get or set fan control mode (auto, max, custom)
    Fan { mode: Option<FanMode> },

    /// Get or set the power profile (performance, entertainment, power_saving, quiet)
    #[command(visible_alias = "pp")]
    Profile { profile: Option<PowerProfile> },

    /// Get WWAN radio power, or block/unblock it
    Wwan {
        state: Option<Switch>,
        /// Hand radio power control to the BIOS (on) or take it back (off)
        #[arg(long, value_name = "SWITCH")]
        bios: Option<Switch>,
    },

    // === Attributes ===
    /// Read one attribute, or all of them
    Get { attribute: Option<Attribute> },

    /// Write an attribute
    Set {
        attribute: Attribute,
        /// Value; several words are joined with spaces (for kb_color)
        #[arg(required = true, num_args = 1..)]
        value: Vec<String>,
    },

    // === Services ===
    /// Poll hotkeys in the foreground until Ctrl-C
    #[command(visible_alias = "d")]
    Daemon {
        /// Skip the airplane hotkey poller even if enabled in the config
        #[arg(long)]
        no_poll: bool,
    },

    /// Print the effective configuration
    #[command(visible_alias = "cfg")]
    Config {
        /// Also write it to the config file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}
