//! Host effect and wave timing handlers.

use std::time::Duration;

use tracing::info;
use xsm_keyboard::{EffectEvent, LedEffect};

use super::{setup_interrupt_handler, wait_for_interrupt, with_session, CommandResult, Context};

/// Run a host effect until Ctrl-C, or select static
pub fn run(ctx: &Context, effect: LedEffect) -> CommandResult {
    with_session(ctx, false, |session| {
        let controller = session.controller();
        controller.set_led_effect(effect)?;
        if effect == LedEffect::Static {
            println!("Host effects stopped");
            return Ok(());
        }

        let mut events = controller.engine().subscribe();
        let running = setup_interrupt_handler();
        println!("Running {effect} effect. Press Ctrl-C to stop.");
        wait_for_interrupt(&running, Duration::from_millis(100));

        while let Ok(event) = events.try_recv() {
            if let EffectEvent::Preempted { previous, next } = event {
                info!("{previous} was preempted by {next}");
            }
        }
        if let Some(kind) = controller.stop_effect()? {
            println!("\n{kind} stopped");
        }
        Ok(())
    })
}

/// Get or set the wave tick interval
pub fn interval(ctx: &Context, ms: Option<u64>) -> CommandResult {
    let mut applied = None;
    with_session(ctx, false, |session| {
        let controller = session.controller();
        match ms {
            Some(ms) => {
                let set = controller.set_wave_interval_ms(ms);
                println!("Wave interval set to {set} ms ({} ms/cycle)", controller.wave_period_ms());
                applied = Some(set);
            }
            None => println!("Wave interval: {} ms", controller.wave_interval_ms()),
        }
        Ok(())
    })?;
    save_wave_interval(ctx, applied)
}

/// Get or set the full wave cycle period
pub fn period(ctx: &Context, ms: Option<u64>) -> CommandResult {
    let mut applied = None;
    with_session(ctx, false, |session| {
        let controller = session.controller();
        match ms {
            Some(ms) => {
                let interval = controller.set_wave_period_ms(ms);
                println!(
                    "Wave period set to {} ms ({interval} ms/step)",
                    controller.wave_period_ms()
                );
                applied = Some(interval);
            }
            None => println!("Wave period: {} ms", controller.wave_period_ms()),
        }
        Ok(())
    })?;
    save_wave_interval(ctx, applied)
}

// Timing lives in the engine of this process only; keep it for the next run.
fn save_wave_interval(ctx: &Context, interval_ms: Option<u64>) -> CommandResult {
    let Some(interval_ms) = interval_ms else {
        return Ok(());
    };
    if !ctx.save || ctx.config.backlight.wave_interval_ms == interval_ms {
        return Ok(());
    }
    let mut config = ctx.config.clone();
    config.backlight.wave_interval_ms = interval_ms;
    config.save(&ctx.config_path)?;
    Ok(())
}
