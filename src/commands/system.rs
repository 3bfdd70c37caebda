//! Airplane LED, sensors, fan, power profile, WWAN, attribute and config
//! handlers.

use xsm_driver::attributes::{self, Attribute};
use xsm_keyboard::{FanMode, PowerProfile};

use super::{with_session, CommandResult, Context};
use crate::cli::Switch;

/// Get or set the airplane-mode LED
pub fn airplane_led(ctx: &Context, state: Option<Switch>) -> CommandResult {
    with_session(ctx, false, |session| {
        let led = session.airplane();
        if let Some(state) = state {
            led.set(state.is_on())?;
            led.flush()?;
        }
        println!("Airplane LED: {}", if led.get()? { "on" } else { "off" });
        Ok(())
    })
}

/// Show fan speeds and temperatures
pub fn sensors(ctx: &Context, json: bool) -> CommandResult {
    with_session(ctx, false, |session| {
        let readings = session.thermal().readings()?;
        if json {
            println!("{}", serde_json::to_string_pretty(&readings)?);
            return Ok(());
        }
        println!("CPU fan:  {} RPM", readings.cpu_fan_rpm);
        println!("GPU fan:  {} RPM", readings.gpu_fan_rpm);
        println!("CPU temp: {} °C", readings.cpu_temp);
        println!("GPU temp: {} °C", readings.gpu_temp);
        Ok(())
    })
}

/// Get or set fan control mode
pub fn fan(ctx: &Context, mode: Option<FanMode>) -> CommandResult {
    with_session(ctx, false, |session| {
        let thermal = session.thermal();
        if let Some(mode) = mode {
            thermal.set_fan_mode(mode)?;
        }
        let mode = thermal.fan_mode();
        println!("Fan control: {mode} ({})", mode.index());
        Ok(())
    })
}

/// Get or set the power profile
pub fn profile(ctx: &Context, profile: Option<PowerProfile>) -> CommandResult {
    with_session(ctx, false, |session| {
        let thermal = session.thermal();
        match profile {
            Some(profile) => {
                thermal.set_power_profile(profile)?;
                println!("Power profile set to {profile} (fan {})", thermal.fan_mode());
            }
            None => {
                println!("Power profile: {}", thermal.power_profile());
                println!("Available:");
                for p in PowerProfile::ALL {
                    println!("  {} {p}", p.index());
                }
            }
        }
        Ok(())
    })
}

/// Get WWAN power, or block/unblock the radio
pub fn wwan(ctx: &Context, state: Option<Switch>, bios: Option<Switch>) -> CommandResult {
    with_session(ctx, false, |session| {
        let wwan = session.wwan();
        if let Some(bios) = bios {
            wwan.bios_control(bios.is_on())?;
            println!("WWAN BIOS control {}", if bios.is_on() { "enabled" } else { "disabled" });
        }
        if let Some(state) = state {
            wwan.set_blocked(!state.is_on())?;
        }
        println!("WWAN: {}", if wwan.powered()? { "powered" } else { "off" });
        Ok(())
    })
}

/// Read one attribute, or every attribute
pub fn get(ctx: &Context, attribute: Option<Attribute>) -> CommandResult {
    with_session(ctx, false, |session| {
        match attribute {
            Some(attr) => println!("{}", attributes::read(session, attr)?),
            None => {
                for attr in Attribute::ALL {
                    match attributes::read(session, attr) {
                        Ok(value) => println!("{:<18} {value}", attr.name()),
                        Err(e) => println!("{:<18} <error: {e}>", attr.name()),
                    }
                }
            }
        }
        Ok(())
    })
}

/// Write an attribute
pub fn set(ctx: &Context, attribute: Attribute, value: &[String]) -> CommandResult {
    let value = value.join(" ");
    with_session(ctx, true, |session| {
        attributes::write(session, attribute, &value)?;
        if attribute == Attribute::AirplaneLed {
            session.airplane().flush()?;
        }
        println!("{attribute} = {}", attributes::read(session, attribute)?);
        Ok(())
    })
}

/// Print the effective configuration, optionally writing it out
pub fn config(ctx: &Context, write: bool) -> CommandResult {
    println!("# {}", ctx.config_path.display());
    print!("{}", toml::to_string_pretty(&ctx.config)?);
    if write {
        ctx.config.save(&ctx.config_path)?;
        println!("\nWrote {}", ctx.config_path.display());
    }
    Ok(())
}
