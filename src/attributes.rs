//! Named attributes in the style of the driver's sysfs files
//!
//! Each attribute maps onto exactly one controller or helper operation.
//! Reads format the current state; writes parse the value, run the
//! operation and hand its error back unchanged, so a failed write can be
//! turned into a non-zero exit status.

use std::fmt;
use std::str::FromStr;

use xsm_keyboard::{BacklightMode, EffectKind, FanMode, KeyboardError, LedEffect, Power, PowerProfile, ZoneColor};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Brightness,
    State,
    Color,
    Mode,
    Wave,
    WaveInterval,
    WavePeriod,
    LedMode,
    AirplaneLed,
    FanControl,
    PowerProfile,
    Fan1Input,
    Fan2Input,
    Temp1Input,
    Temp2Input,
    Wwan,
}

impl Attribute {
    pub const ALL: [Attribute; 16] = [
        Attribute::Brightness,
        Attribute::State,
        Attribute::Color,
        Attribute::Mode,
        Attribute::Wave,
        Attribute::WaveInterval,
        Attribute::WavePeriod,
        Attribute::LedMode,
        Attribute::AirplaneLed,
        Attribute::FanControl,
        Attribute::PowerProfile,
        Attribute::Fan1Input,
        Attribute::Fan2Input,
        Attribute::Temp1Input,
        Attribute::Temp2Input,
        Attribute::Wwan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Brightness => "kb_brightness",
            Attribute::State => "kb_state",
            Attribute::Color => "kb_color",
            Attribute::Mode => "kb_mode",
            Attribute::Wave => "kb_wave",
            Attribute::WaveInterval => "kb_wave_interval",
            Attribute::WavePeriod => "kb_wave_period",
            Attribute::LedMode => "kb_led_mode",
            Attribute::AirplaneLed => "airplane_led",
            Attribute::FanControl => "fan_control",
            Attribute::PowerProfile => "power_profile",
            Attribute::Fan1Input => "fan1_input",
            Attribute::Fan2Input => "fan2_input",
            Attribute::Temp1Input => "temp1_input",
            Attribute::Temp2Input => "temp2_input",
            Attribute::Wwan => "wwan",
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            Attribute::Fan1Input | Attribute::Fan2Input | Attribute::Temp1Input | Attribute::Temp2Input
        )
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = KeyboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s || a.name().strip_prefix("kb_") == Some(s))
            .ok_or_else(|| KeyboardError::InvalidArgument(format!("unknown attribute '{s}'")))
    }
}

/// Read an attribute, formatted without a trailing newline
pub fn read(session: &Session, attr: Attribute) -> Result<String, KeyboardError> {
    let controller = session.controller();
    let value = match attr {
        Attribute::Brightness => controller.snapshot().brightness.to_string(),
        Attribute::State => (controller.snapshot().power.is_on() as u8).to_string(),
        Attribute::Color => controller
            .snapshot()
            .zone_colors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" "),
        Attribute::Mode => controller.snapshot().mode.index().to_string(),
        Attribute::Wave => ((controller.engine().active() == Some(EffectKind::Wave)) as u8).to_string(),
        Attribute::WaveInterval => controller.wave_interval_ms().to_string(),
        Attribute::WavePeriod => controller.wave_period_ms().to_string(),
        Attribute::LedMode => {
            let effect = controller.led_effect();
            format!("{} ({effect})", effect.index())
        }
        Attribute::AirplaneLed => (session.airplane().get()? as u8).to_string(),
        Attribute::FanControl => {
            let mode = session.thermal().fan_mode();
            format!("{} ({mode})", mode.index())
        }
        Attribute::PowerProfile => {
            let profile = session.thermal().power_profile();
            format!("{} ({profile})", profile.index())
        }
        Attribute::Fan1Input => session.thermal().fan_rpm(0)?.to_string(),
        Attribute::Fan2Input => session.thermal().fan_rpm(1)?.to_string(),
        // hwmon reports millidegrees
        Attribute::Temp1Input => (session.thermal().cpu_temp()? as u32 * 1000).to_string(),
        Attribute::Temp2Input => (session.thermal().gpu_temp()? as u32 * 1000).to_string(),
        Attribute::Wwan => (session.wwan().powered()? as u8).to_string(),
    };
    Ok(value)
}

/// Parse `value` and apply it through the matching operation
pub fn write(session: &Session, attr: Attribute, value: &str) -> Result<(), KeyboardError> {
    let controller = session.controller();
    let value = value.trim();
    match attr {
        Attribute::Brightness => {
            controller.set_brightness(parse_uint(value)?)?;
        }
        Attribute::State => {
            controller.set_power(Power::from(parse_uint(value)? != 0))?;
        }
        Attribute::Color => {
            controller.set_color(&parse_colors(value, controller.profile().zone_count as usize)?)?;
        }
        Attribute::Mode => {
            controller.set_mode(BacklightMode::from_index(parse_uint(value)?))?;
        }
        Attribute::Wave => {
            if parse_uint(value)? != 0 {
                controller.start_effect(EffectKind::Wave)?;
            } else if controller.engine().active() == Some(EffectKind::Wave) {
                controller.stop_effect()?;
            }
        }
        Attribute::WaveInterval => {
            controller.set_wave_interval_ms(parse_uint(value)? as u64);
        }
        Attribute::WavePeriod => {
            controller.set_wave_period_ms(parse_uint(value)? as u64);
        }
        Attribute::LedMode => {
            controller.set_led_effect(value.parse::<LedEffect>().map_err(KeyboardError::InvalidArgument)?)?;
        }
        Attribute::AirplaneLed => {
            session.airplane().set(parse_uint(value)? != 0)?;
        }
        Attribute::FanControl => {
            session
                .thermal()
                .set_fan_mode(value.parse::<FanMode>().map_err(KeyboardError::InvalidArgument)?)?;
        }
        Attribute::PowerProfile => {
            session
                .thermal()
                .set_power_profile(value.parse::<PowerProfile>().map_err(KeyboardError::InvalidArgument)?)?;
        }
        Attribute::Wwan => {
            session.wwan().set_blocked(parse_uint(value)? == 0)?;
        }
        Attribute::Fan1Input | Attribute::Fan2Input | Attribute::Temp1Input | Attribute::Temp2Input => {
            return Err(KeyboardError::NotSupported(format!("{attr} is read-only")));
        }
    }
    Ok(())
}

/// Unsigned integer, decimal or `0x` hex
fn parse_uint(value: &str) -> Result<u32, KeyboardError> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| KeyboardError::InvalidArgument(format!("expected an unsigned integer, got '{value}'")))
}

/// One color for every zone, or one per zone. A trailing extra-zone color
/// is ignored on keyboards without that zone.
fn parse_colors(value: &str, zone_count: usize) -> Result<Vec<ZoneColor>, KeyboardError> {
    let mut colors = value
        .split_whitespace()
        .map(|s| s.parse::<ZoneColor>().map_err(KeyboardError::InvalidArgument))
        .collect::<Result<Vec<_>, _>>()?;
    if colors.len() == 4 && zone_count == 3 {
        colors.truncate(3);
    }
    Ok(colors)
}
