//! In-memory model of the commanded backlight

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::led::{BacklightMode, ZoneColor};
use crate::profile::CapabilityProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    Off,
    On,
}

impl Power {
    pub fn is_on(self) -> bool {
        self == Power::On
    }

    pub fn toggled(self) -> Self {
        match self {
            Power::On => Power::Off,
            Power::Off => Power::On,
        }
    }
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on {
            Power::On
        } else {
            Power::Off
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Power::On => "on",
            Power::Off => "off",
        })
    }
}

impl FromStr for Power {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "1" | "true" => Ok(Power::On),
            "off" | "0" | "false" => Ok(Power::Off),
            other => Err(format!("expected on/off, got '{other}'")),
        }
    }
}

/// What the keyboard backlight is currently commanded to be.
///
/// `zone_colors` and `saved_colors` always hold exactly `zone_count`
/// entries in the profile's native color form. `brightness` 0 is the
/// brightest level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacklightState {
    pub power: Power,
    pub zone_colors: Vec<ZoneColor>,
    pub brightness: u8,
    pub mode: BacklightMode,
    /// Colors restored on the next transition to `On`
    pub saved_colors: Vec<ZoneColor>,
}

impl BacklightState {
    /// Power-on defaults for a profile: all zones blue, brightest, custom
    pub fn new(profile: &CapabilityProfile) -> Self {
        let default = profile
            .resolve_color(ZoneColor::default_color())
            .unwrap_or(ZoneColor::default_color());
        let colors = vec![default; profile.zone_count as usize];
        Self {
            power: Power::On,
            zone_colors: colors.clone(),
            brightness: 0,
            mode: BacklightMode::Custom,
            saved_colors: colors,
        }
    }
}

/// Startup configuration applied by `init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialState {
    pub power: Power,
    /// Clamped to the profile's range
    pub brightness: u32,
    /// One color for every zone, or one per zone
    pub colors: Vec<ZoneColor>,
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            power: Power::On,
            brightness: 0,
            colors: vec![ZoneColor::default_color()],
        }
    }
}
