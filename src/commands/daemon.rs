//! Hotkey event injection and the foreground hotkey service.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::info;
use xsm_keyboard::poller::clamp_frequency;

use super::{parse_code, setup_interrupt_handler, with_session, CommandResult, Context};

/// Feed one event code (or raw notify value) through the dispatcher
pub fn event(ctx: &Context, code: &str, notify: bool) -> CommandResult {
    let code = parse_code(code)?;
    with_session(ctx, true, |session| {
        let action = if notify {
            session.handle_notify(code)?
        } else {
            session.handle_event(code)?
        };
        match action {
            Some(action) => {
                session.airplane().flush()?;
                let state = session.controller().snapshot();
                println!(
                    "{action}: power {}, brightness {}, mode {}",
                    state.power, state.brightness, state.mode
                );
            }
            None => println!("Event 0x{code:02X} ignored"),
        }
        Ok(())
    })
}

/// Run the hotkey poller until Ctrl-C
pub fn run(ctx: &Context, no_poll: bool) -> CommandResult {
    with_session(ctx, true, |session| {
        let running = setup_interrupt_handler();

        let polling = !no_poll && session.start_poller()?;
        if polling {
            println!(
                "Polling airplane hotkey at {} Hz. Press Ctrl-C to stop.",
                clamp_frequency(session.config().hotkeys.poll_freq)
            );
        } else {
            println!("Hotkey polling disabled. Press Ctrl-C to stop.");
        }

        let mut was_polling = polling;
        while running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(250));
            let now_polling = session.poller_running();
            if was_polling && !now_polling {
                info!("hotkey poller handed over to push notifications");
            }
            was_polling = now_polling;
        }

        println!("\nStopping...");
        session.stop_poller();
        println!(
            "{} airplane press(es) reported",
            session.dispatcher().counter().reported()
        );
        Ok(())
    })
}
