//! Backlight color and mode types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// RGB color value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    /// Create a new RGB color
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB`
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        Some(Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8))
    }

    /// Nearest entry of the 3-bit palette (bit0 blue, bit1 red, bit2 green)
    pub fn to_palette3(self) -> u8 {
        let bit = |channel: u8, mask: u8| if channel >= 0x80 { mask } else { 0 };
        bit(self.b, 0b001) | bit(self.r, 0b010) | bit(self.g, 0b100)
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const BLUE: Self = Self::new(0, 0, 0xFF);
    pub const RED: Self = Self::new(0xFF, 0, 0);
    pub const MAGENTA: Self = Self::new(0xFF, 0, 0xFF);
    pub const GREEN: Self = Self::new(0, 0xFF, 0);
    pub const CYAN: Self = Self::new(0, 0xFF, 0xFF);
    pub const YELLOW: Self = Self::new(0xFF, 0xFF, 0);
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF);
    pub const ORANGE: Self = Self::new(0xFF, 0x80, 0);
    pub const PURPLE: Self = Self::new(0x80, 0, 0xFF);
    pub const PINK: Self = Self::new(0xFF, 0, 0x80);
    pub const TEAL: Self = Self::new(0, 0x80, 0x80);
    pub const LIME: Self = Self::new(0x80, 0xFF, 0);
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

// ── Named palette ──────────────────────────────────────────────────────

/// Named colors, in firmware index order. The first
/// [`PALETTE3_LEN`] entries are the 8-color family's 3-bit palette.
pub const PALETTE: [(&str, RgbColor); 13] = [
    ("black", RgbColor::BLACK),
    ("blue", RgbColor::BLUE),
    ("red", RgbColor::RED),
    ("magenta", RgbColor::MAGENTA),
    ("green", RgbColor::GREEN),
    ("cyan", RgbColor::CYAN),
    ("yellow", RgbColor::YELLOW),
    ("white", RgbColor::WHITE),
    ("orange", RgbColor::ORANGE),
    ("purple", RgbColor::PURPLE),
    ("pink", RgbColor::PINK),
    ("teal", RgbColor::TEAL),
    ("lime", RgbColor::LIME),
];

pub const PALETTE3_LEN: usize = 8;

/// Index of the default zone color (blue)
pub const DEFAULT_COLOR_INDEX: u8 = 1;

pub fn palette_index(name: &str) -> Option<u8> {
    PALETTE
        .iter()
        .position(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|i| i as u8)
}

pub fn palette_position(color: RgbColor) -> Option<u8> {
    PALETTE.iter().position(|(_, c)| *c == color).map(|i| i as u8)
}

// ── Zone color ─────────────────────────────────────────────────────────

/// Color of one zone: direct RGB or a named-palette index.
///
/// State always holds the form native to the profile's color model;
/// see `CapabilityProfile::resolve_color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneColor {
    Rgb(RgbColor),
    Index(u8),
}

impl ZoneColor {
    pub const fn default_color() -> Self {
        ZoneColor::Index(DEFAULT_COLOR_INDEX)
    }

    /// RGB value, if this is an RGB color or a valid palette index
    pub fn rgb(&self) -> Option<RgbColor> {
        match *self {
            ZoneColor::Rgb(c) => Some(c),
            ZoneColor::Index(i) => PALETTE.get(i as usize).map(|(_, c)| *c),
        }
    }

    /// Palette name when the color has one
    pub fn name(&self) -> Option<&'static str> {
        let idx = match *self {
            ZoneColor::Rgb(c) => palette_position(c)?,
            ZoneColor::Index(i) => i,
        };
        PALETTE.get(idx as usize).map(|(n, _)| *n)
    }
}

impl From<RgbColor> for ZoneColor {
    fn from(c: RgbColor) -> Self {
        ZoneColor::Rgb(c)
    }
}

impl fmt::Display for ZoneColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name(), self) {
            (Some(name), _) => f.write_str(name),
            (None, ZoneColor::Rgb(c)) => write!(f, "{c}"),
            (None, ZoneColor::Index(i)) => write!(f, "index{i}"),
        }
    }
}

impl FromStr for ZoneColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(idx) = palette_index(s) {
            return Ok(ZoneColor::Index(idx));
        }
        RgbColor::from_hex(s)
            .map(ZoneColor::Rgb)
            .ok_or_else(|| format!("unknown color '{s}' (use a palette name or #RRGGBB)"))
    }
}

impl Serialize for ZoneColor {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ZoneColor {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Mode ───────────────────────────────────────────────────────────────

/// Backlight effect mode. Discriminants are the attribute-layer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BacklightMode {
    RandomColor = 0,
    Custom = 1,
    Breathe = 2,
    Cycle = 3,
    Wave = 4,
    Dance = 5,
    Tempo = 6,
    Flash = 7,
}

impl BacklightMode {
    pub const ALL: [BacklightMode; 8] = [
        BacklightMode::RandomColor,
        BacklightMode::Custom,
        BacklightMode::Breathe,
        BacklightMode::Cycle,
        BacklightMode::Wave,
        BacklightMode::Dance,
        BacklightMode::Tempo,
        BacklightMode::Flash,
    ];

    /// Hotkey cycling order
    const CYCLE_ORDER: [BacklightMode; 8] = [
        BacklightMode::RandomColor,
        BacklightMode::Dance,
        BacklightMode::Tempo,
        BacklightMode::Flash,
        BacklightMode::Wave,
        BacklightMode::Breathe,
        BacklightMode::Cycle,
        BacklightMode::Custom,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Mode from attribute index, clamped to the last mode
    pub fn from_index(index: u32) -> Self {
        Self::ALL[(index as usize).min(Self::ALL.len() - 1)]
    }

    pub fn name(self) -> &'static str {
        match self {
            BacklightMode::RandomColor => "random_color",
            BacklightMode::Custom => "custom",
            BacklightMode::Breathe => "breathe",
            BacklightMode::Cycle => "cycle",
            BacklightMode::Wave => "wave",
            BacklightMode::Dance => "dance",
            BacklightMode::Tempo => "tempo",
            BacklightMode::Flash => "flash",
        }
    }

    /// Next mode in hotkey order
    pub fn next(self) -> Self {
        let pos = Self::CYCLE_ORDER
            .iter()
            .position(|m| *m == self)
            .unwrap_or(0);
        Self::CYCLE_ORDER[(pos + 1) % Self::CYCLE_ORDER.len()]
    }

    /// Effect run entirely by firmware after one trigger command
    pub fn is_firmware_native(self) -> bool {
        !matches!(self, BacklightMode::Custom | BacklightMode::Wave)
    }
}

impl fmt::Display for BacklightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BacklightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(idx) = s.parse::<u32>() {
            return Ok(Self::from_index(idx));
        }
        let normalized = s.to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == normalized || (normalized == "random" && *m == Self::RandomColor))
            .ok_or_else(|| format!("unknown mode '{s}'"))
    }
}
