//! Backlight power, brightness, color and mode handlers.

use serde::Serialize;
use xsm_driver::Session;
use xsm_keyboard::{BacklightMode, BacklightState, LedEffect, Power, ProfileFamily, ZoneColor};

use super::{with_session, CommandResult, Context};

#[derive(Serialize)]
struct Status {
    family: ProfileFamily,
    zone_count: u8,
    max_brightness: u8,
    #[serde(flatten)]
    state: BacklightState,
    effect: LedEffect,
    wave_interval_ms: u64,
    wave_period_ms: u64,
}

fn status_of(session: &Session) -> Status {
    let controller = session.controller();
    let profile = controller.profile();
    Status {
        family: profile.family,
        zone_count: profile.zone_count,
        max_brightness: profile.max_level(),
        state: controller.snapshot(),
        effect: controller.led_effect(),
        wave_interval_ms: controller.wave_interval_ms(),
        wave_period_ms: controller.wave_period_ms(),
    }
}

fn join_colors(colors: &[ZoneColor]) -> String {
    colors.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

/// Show backlight state
pub fn status(ctx: &Context, json: bool) -> CommandResult {
    with_session(ctx, false, |session| {
        let status = status_of(session);
        if json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }
        println!("Keyboard Backlight ({}, {} zones)", status.family, status.zone_count);
        println!("  Power:      {}", status.state.power);
        println!("  Brightness: {}/{} (0 = brightest)", status.state.brightness, status.max_brightness);
        println!("  Mode:       {} ({})", status.state.mode, status.state.mode.index());
        println!("  Colors:     {}", join_colors(&status.state.zone_colors));
        if status.state.power == Power::Off {
            println!("  Saved:      {}", join_colors(&status.state.saved_colors));
        }
        println!("  Effect:     {}", status.effect);
        println!(
            "  Wave:       {} ms/step, {} ms/cycle",
            status.wave_interval_ms, status.wave_period_ms
        );
        Ok(())
    })
}

/// Set backlight power
pub fn set_power(ctx: &Context, power: Power) -> CommandResult {
    with_session(ctx, true, |session| {
        session.controller().set_power(power)?;
        println!("Backlight {power}");
        Ok(())
    })
}

/// Toggle backlight power
pub fn toggle(ctx: &Context) -> CommandResult {
    with_session(ctx, true, |session| {
        let power = session.controller().toggle_power()?;
        println!("Backlight {power}");
        Ok(())
    })
}

/// Get or set brightness
pub fn brightness(ctx: &Context, level: Option<u32>) -> CommandResult {
    let Some(level) = level else {
        return with_session(ctx, false, |session| {
            let controller = session.controller();
            println!(
                "Brightness: {}/{}",
                controller.snapshot().brightness,
                controller.profile().max_level()
            );
            Ok(())
        });
    };
    with_session(ctx, true, |session| {
        let applied = session.controller().set_brightness(level)?;
        if applied as u32 != level {
            println!("Brightness {level} out of range, clamped to {applied}");
        } else {
            println!("Brightness set to {applied}");
        }
        Ok(())
    })
}

/// One step brighter (`up`) or dimmer
pub fn step_brightness(ctx: &Context, up: bool) -> CommandResult {
    with_session(ctx, true, |session| {
        let controller = session.controller();
        // level 0 is brightest
        if up {
            controller.decrement_brightness()?;
        } else {
            controller.increment_brightness()?;
        }
        println!("Brightness: {}", controller.snapshot().brightness);
        Ok(())
    })
}

/// Get or set zone colors
pub fn color(ctx: &Context, colors: &[ZoneColor]) -> CommandResult {
    if colors.is_empty() {
        return with_session(ctx, false, |session| {
            println!("Colors: {}", join_colors(&session.controller().snapshot().zone_colors));
            Ok(())
        });
    }
    with_session(ctx, true, |session| {
        session.controller().set_color(colors)?;
        println!("Colors: {}", join_colors(&session.controller().snapshot().zone_colors));
        Ok(())
    })
}

/// Advance to the next palette color
pub fn next_color(ctx: &Context) -> CommandResult {
    with_session(ctx, true, |session| {
        session.controller().next_color()?;
        println!("Colors: {}", join_colors(&session.controller().snapshot().zone_colors));
        Ok(())
    })
}

/// Get or set the backlight mode
pub fn mode(ctx: &Context, mode: Option<BacklightMode>) -> CommandResult {
    let Some(mode) = mode else {
        return with_session(ctx, false, |session| {
            let mode = session.controller().snapshot().mode;
            println!("Mode: {mode} ({})", mode.index());
            println!("Available:");
            for m in BacklightMode::ALL {
                println!("  {} {m}", m.index());
            }
            Ok(())
        });
    };
    if mode == BacklightMode::Wave {
        // host-driven; stays alive only while this process runs
        return super::effect::run(ctx, LedEffect::Wave);
    }
    with_session(ctx, true, |session| {
        session.controller().set_mode(mode)?;
        println!("Mode set to {mode}");
        Ok(())
    })
}

/// Advance to the next mode in hotkey order
pub fn next_mode(ctx: &Context) -> CommandResult {
    with_session(ctx, true, |session| {
        session.controller().next_mode()?;
        println!("Mode: {}", session.controller().snapshot().mode);
        Ok(())
    })
}

/// Re-apply the current mode after the platform woke up
pub fn resume(ctx: &Context) -> CommandResult {
    with_session(ctx, false, |session| {
        session.controller().resume()?;
        println!("Backlight re-applied");
        Ok(())
    })
}
