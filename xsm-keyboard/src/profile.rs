//! Backlight capability profiles
//!
//! A profile is the static description of a laptop family's backlight
//! addressing scheme. It is chosen once at startup (from configuration or a
//! model name) and never changes afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xsm_transport::protocol::method;

use crate::error::KeyboardError;
use crate::led::{palette_position, ZoneColor, PALETTE, PALETTE3_LEN};

/// How zone colors are expressed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorModel {
    /// 24-bit RGB per zone
    RgbDirect,
    /// 3-bit palette index per zone
    PaletteIndexed,
}

/// Brightness level → raw byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessEncoding {
    /// `max - level * step`: level 0 is brightest
    Inverted { max: u8, step: u8 },
    /// Level is sent as-is
    Direct,
}

impl BrightnessEncoding {
    pub fn raw(&self, level: u8) -> u8 {
        match *self {
            BrightnessEncoding::Inverted { max, step } => max.saturating_sub(level.saturating_mul(step)),
            BrightnessEncoding::Direct => level,
        }
    }
}

/// Command family, one per `BacklightOps` implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileFamily {
    FullColor,
    FullColorExtra,
    EightColor,
}

impl ProfileFamily {
    pub fn name(self) -> &'static str {
        match self {
            ProfileFamily::FullColor => "full-color",
            ProfileFamily::FullColorExtra => "full-color-extra",
            ProfileFamily::EightColor => "eight-color",
        }
    }
}

impl fmt::Display for ProfileFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfileFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "full-color" | "full" => Ok(ProfileFamily::FullColor),
            "full-color-extra" | "full-extra" => Ok(ProfileFamily::FullColorExtra),
            "eight-color" | "8-color" => Ok(ProfileFamily::EightColor),
            other => Err(format!("unknown profile family '{other}'")),
        }
    }
}

/// Immutable per-model backlight description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityProfile {
    pub family: ProfileFamily,
    pub zone_count: u8,
    pub color_model: ColorModel,
    pub brightness_levels: u8,
    pub brightness_encoding: BrightnessEncoding,
    /// Firmware method carrying every backlight command
    pub command_opcode: u8,
    pub has_extra_zone: bool,
}

impl CapabilityProfile {
    pub const FULL_COLOR: Self = Self {
        family: ProfileFamily::FullColor,
        zone_count: 3,
        color_model: ColorModel::RgbDirect,
        brightness_levels: 10,
        brightness_encoding: BrightnessEncoding::Inverted {
            max: 0xFF,
            step: 0x19,
        },
        command_opcode: method::SET_KB_LED,
        has_extra_zone: false,
    };

    pub const FULL_COLOR_EXTRA: Self = Self {
        family: ProfileFamily::FullColorExtra,
        zone_count: 4,
        has_extra_zone: true,
        ..Self::FULL_COLOR
    };

    pub const EIGHT_COLOR: Self = Self {
        family: ProfileFamily::EightColor,
        zone_count: 3,
        color_model: ColorModel::PaletteIndexed,
        brightness_levels: 11,
        brightness_encoding: BrightnessEncoding::Direct,
        command_opcode: method::SET_KB_LED,
        has_extra_zone: false,
    };

    pub fn for_family(family: ProfileFamily) -> Self {
        match family {
            ProfileFamily::FullColor => Self::FULL_COLOR,
            ProfileFamily::FullColorExtra => Self::FULL_COLOR_EXTRA,
            ProfileFamily::EightColor => Self::EIGHT_COLOR,
        }
    }

    /// Highest valid brightness level (dimmest)
    pub fn max_level(&self) -> u8 {
        self.brightness_levels.saturating_sub(1)
    }

    pub fn clamp_level(&self, level: u32) -> u8 {
        level.min(self.max_level() as u32) as u8
    }

    pub fn raw_brightness(&self, level: u8) -> u8 {
        self.brightness_encoding.raw(level)
    }

    /// Number of entries `next_color` cycles through
    pub fn palette_len(&self) -> usize {
        match self.color_model {
            ColorModel::RgbDirect => PALETTE.len(),
            ColorModel::PaletteIndexed => PALETTE3_LEN,
        }
    }

    /// Validate a color and convert it to the form this profile stores
    pub fn resolve_color(&self, color: ZoneColor) -> Result<ZoneColor, KeyboardError> {
        match (self.color_model, color) {
            (ColorModel::RgbDirect, ZoneColor::Rgb(_)) => Ok(color),
            (ColorModel::RgbDirect, ZoneColor::Index(i)) => color
                .rgb()
                .map(ZoneColor::Rgb)
                .ok_or_else(|| KeyboardError::InvalidArgument(format!("palette index {i} out of range"))),
            (ColorModel::PaletteIndexed, ZoneColor::Index(i)) if (i as usize) < PALETTE3_LEN => Ok(color),
            (ColorModel::PaletteIndexed, ZoneColor::Rgb(c)) => palette_position(c)
                .filter(|i| (*i as usize) < PALETTE3_LEN)
                .map(ZoneColor::Index)
                .ok_or_else(|| {
                    KeyboardError::InvalidArgument(format!("{c} is not one of the 8 palette colors"))
                }),
            (ColorModel::PaletteIndexed, ZoneColor::Index(i)) => Err(KeyboardError::InvalidArgument(
                format!("palette index {i} exceeds the 8-color palette"),
            )),
        }
    }

    /// Expand one color to every zone, or validate a full per-zone list
    pub fn resolve_zone_colors(&self, colors: &[ZoneColor]) -> Result<Vec<ZoneColor>, KeyboardError> {
        let zones = self.zone_count as usize;
        let expanded: Vec<ZoneColor> = match colors.len() {
            1 => vec![colors[0]; zones],
            n if n == zones => colors.to_vec(),
            n => {
                return Err(KeyboardError::InvalidArgument(format!(
                    "expected 1 or {zones} colors, got {n}"
                )))
            }
        };
        expanded.into_iter().map(|c| self.resolve_color(c)).collect()
    }

    /// Palette position of a stored color, used for cycling
    pub fn palette_slot(&self, color: ZoneColor) -> Option<usize> {
        let slot = match color {
            ZoneColor::Index(i) => i as usize,
            ZoneColor::Rgb(c) => palette_position(c)? as usize,
        };
        (slot < self.palette_len()).then_some(slot)
    }
}

// ── Model table ────────────────────────────────────────────────────────

/// Known product names and the family each one uses
const MODELS: &[(&str, ProfileFamily)] = &[
    ("P870DM", ProfileFamily::FullColorExtra),
    ("P7xxDM(-G)", ProfileFamily::FullColorExtra),
    ("P7xxDM2(-G)", ProfileFamily::FullColorExtra),
    ("P750ZM", ProfileFamily::FullColorExtra),
    ("P5 Pro", ProfileFamily::FullColorExtra),
    ("P5 Pro SE", ProfileFamily::FullColorExtra),
    ("Deimos/Phobos 1x15S", ProfileFamily::FullColorExtra),
    ("P17SM-A", ProfileFamily::FullColorExtra),
    ("N85_N87,HJ,HJ1,HK1", ProfileFamily::FullColorExtra),
    ("P370SM-A", ProfileFamily::FullColor),
    ("P15SM1-A", ProfileFamily::FullColor),
    ("P15SM-A", ProfileFamily::FullColor),
    ("P65_67RSRP", ProfileFamily::FullColor),
    ("P65xRP", ProfileFamily::FullColor),
    ("P95_HP,HR,HQ", ProfileFamily::FullColor),
    ("N85_N87", ProfileFamily::FullColor),
    ("P775DM3(-G)", ProfileFamily::FullColor),
    ("P15 23", ProfileFamily::FullColor),
    ("P17SM", ProfileFamily::EightColor),
    ("P15SM", ProfileFamily::EightColor),
    ("P150EM", ProfileFamily::EightColor),
    ("P15xEMx", ProfileFamily::EightColor),
];

/// Look up a product name (exact match, case-insensitive)
pub fn family_for_model(model: &str) -> Option<ProfileFamily> {
    let model = model.trim();
    MODELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(model))
        .map(|(_, family)| *family)
}

pub fn known_models() -> impl Iterator<Item = (&'static str, ProfileFamily)> {
    MODELS.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::RgbColor;

    #[test]
    fn test_inverted_encoding_formula() {
        let p = CapabilityProfile::FULL_COLOR;
        for level in 0..p.brightness_levels {
            assert_eq!(p.raw_brightness(level) as u32, 0xFF - level as u32 * 0x19);
        }
        assert_eq!(p.raw_brightness(0), 0xFF);
        assert_eq!(p.raw_brightness(9), 0x06);
        assert_eq!(p.clamp_level(200), 9);
    }

    #[test]
    fn test_extra_zone_profile() {
        let p = CapabilityProfile::FULL_COLOR_EXTRA;
        assert_eq!(p.zone_count, 4);
        assert!(p.has_extra_zone);
        assert_eq!(p.brightness_levels, 10);
    }

    #[test]
    fn test_resolve_rgb_profile() {
        let p = CapabilityProfile::FULL_COLOR;
        let colors = p.resolve_zone_colors(&[ZoneColor::Index(5)]).unwrap();
        assert_eq!(colors, vec![ZoneColor::Rgb(RgbColor::CYAN); 3]);
        assert!(p.resolve_zone_colors(&[ZoneColor::Index(1); 2]).is_err());
        assert!(p.resolve_color(ZoneColor::Index(13)).is_err());
    }

    #[test]
    fn test_resolve_palette_profile() {
        let p = CapabilityProfile::EIGHT_COLOR;
        assert_eq!(
            p.resolve_color(ZoneColor::Rgb(RgbColor::GREEN)).unwrap(),
            ZoneColor::Index(4)
        );
        // orange is a named color but not part of the 3-bit palette
        assert!(p.resolve_color(ZoneColor::Index(8)).is_err());
        assert!(p.resolve_color(ZoneColor::Rgb(RgbColor::new(1, 2, 3))).is_err());
    }

    #[test]
    fn test_model_table() {
        assert_eq!(family_for_model("p870dm"), Some(ProfileFamily::FullColorExtra));
        assert_eq!(family_for_model("P150EM"), Some(ProfileFamily::EightColor));
        assert_eq!(family_for_model("N85_N87"), Some(ProfileFamily::FullColor));
        assert_eq!(family_for_model("ThinkPad"), None);
        assert_eq!("8-color".parse::<ProfileFamily>(), Ok(ProfileFamily::EightColor));
    }
}
