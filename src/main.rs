//! Clevo XSM control CLI
//!
//! Keyboard backlight, host effects, hotkeys, fans and radios from the
//! command line.

use clap::Parser;
use xsm_keyboard::Power;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::{backlight, daemon, effect, system, CommandResult, Context};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CommandResult {
    let ctx = Context::load(cli.config, cli.dry_run, cli.no_save)?;

    match cli.command {
        None | Some(Commands::Status { json: false }) => backlight::status(&ctx, false),
        Some(Commands::Status { json: true }) => backlight::status(&ctx, true),

        // === Backlight ===
        Some(Commands::On) => backlight::set_power(&ctx, Power::On),
        Some(Commands::Off) => backlight::set_power(&ctx, Power::Off),
        Some(Commands::Toggle) => backlight::toggle(&ctx),
        Some(Commands::Brightness { level }) => backlight::brightness(&ctx, level),
        Some(Commands::Up) => backlight::step_brightness(&ctx, true),
        Some(Commands::Down) => backlight::step_brightness(&ctx, false),
        Some(Commands::Color { colors }) => backlight::color(&ctx, &colors),
        Some(Commands::Mode { mode }) => backlight::mode(&ctx, mode),
        Some(Commands::NextMode) => backlight::next_mode(&ctx),
        Some(Commands::NextColor) => backlight::next_color(&ctx),
        Some(Commands::Resume) => backlight::resume(&ctx),

        // === Host effects ===
        Some(Commands::Effect { effect }) => effect::run(&ctx, effect),
        Some(Commands::Interval { ms }) => effect::interval(&ctx, ms),
        Some(Commands::Period { ms }) => effect::period(&ctx, ms),

        // === Hotkeys ===
        Some(Commands::Event { code, notify }) => daemon::event(&ctx, &code, notify),
        Some(Commands::AirplaneLed { state }) => system::airplane_led(&ctx, state),

        // === System ===
        Some(Commands::Sensors { json }) => system::sensors(&ctx, json),
        Some(Commands::Fan { mode }) => system::fan(&ctx, mode),
        Some(Commands::Profile { profile }) => system::profile(&ctx, profile),
        Some(Commands::Wwan { state, bios }) => system::wwan(&ctx, state, bios),

        // === Attributes ===
        Some(Commands::Get { attribute }) => system::get(&ctx, attribute),
        Some(Commands::Set { attribute, value }) => system::set(&ctx, attribute, &value),

        // === Services ===
        Some(Commands::Daemon { no_poll }) => daemon::run(&ctx, no_poll),
        Some(Commands::Config { write }) => system::config(&ctx, write),
    }
}
