//! Per-family backlight command encodings
//!
//! Each family turns the same abstract operations into its own firmware
//! argument words. Operations that change state update it only after the
//! bus acknowledged; the `write_*` methods are the animation engine's direct
//! path and never touch state.

use std::sync::Arc;

use tracing::warn;
use xsm_transport::protocol::kb;
use xsm_transport::TransportError;

use crate::device::DeviceIo;
use crate::error::KeyboardError;
use crate::led::{BacklightMode, RgbColor, ZoneColor};
use crate::profile::{CapabilityProfile, ProfileFamily};
use crate::state::{BacklightState, Power};

pub trait BacklightOps: Send + Sync {
    fn family(&self) -> ProfileFamily;

    /// Apply startup power/colors/brightness and fill in `state`
    fn init(
        &self,
        io: &DeviceIo,
        state: &mut BacklightState,
        power: Power,
        colors: &[ZoneColor],
        brightness: u8,
    ) -> Result<(), KeyboardError>;

    /// Hardware side of a power transition. On restores `saved_colors` at the
    /// current brightness; Off blanks the keyboard. State is left to the caller.
    fn set_state(&self, io: &DeviceIo, state: &BacklightState, power: Power) -> Result<(), KeyboardError>;

    /// `colors` are already resolved, one per zone
    fn set_color(&self, io: &DeviceIo, state: &mut BacklightState, colors: &[ZoneColor]) -> Result<(), KeyboardError>;

    fn set_brightness(&self, io: &DeviceIo, state: &mut BacklightState, level: u8) -> Result<(), KeyboardError>;

    fn set_mode(&self, io: &DeviceIo, state: &mut BacklightState, mode: BacklightMode) -> Result<(), KeyboardError>;

    /// Animation frame: brightness only
    fn write_brightness(&self, io: &DeviceIo, state: &BacklightState, level: u8) -> Result<(), TransportError>;

    /// Animation frame: one color on the left, center and right zones
    fn write_frame_color(
        &self,
        io: &DeviceIo,
        state: &BacklightState,
        color: RgbColor,
        level: u8,
    ) -> Result<(), TransportError>;
}

pub fn ops_for(profile: CapabilityProfile) -> Arc<dyn BacklightOps> {
    match profile.family {
        ProfileFamily::FullColor | ProfileFamily::FullColorExtra => Arc::new(FullColorOps { profile }),
        ProfileFamily::EightColor => Arc::new(EightColorOps { profile }),
    }
}

/// Firmware trigger word for a native effect, full-color encoding
fn native_mode_word(mode: BacklightMode) -> Option<u32> {
    Some(match mode {
        BacklightMode::RandomColor => kb::MODE_RANDOM_COLOR,
        BacklightMode::Breathe => kb::MODE_BREATHE,
        BacklightMode::Cycle => kb::MODE_CYCLE,
        BacklightMode::Wave => kb::MODE_WAVE,
        BacklightMode::Dance => kb::MODE_DANCE,
        BacklightMode::Tempo => kb::MODE_TEMPO,
        BacklightMode::Flash => kb::MODE_FLASH,
        BacklightMode::Custom => return None,
    })
}

// ============================================================================
// Full-color (RGB per zone, optional extra zone)
// ============================================================================

pub struct FullColorOps {
    profile: CapabilityProfile,
}

impl FullColorOps {
    /// Zones this model addresses: left, center, right, plus extra when present
    fn zones(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.profile.zone_count).filter(move |z| *z < 3 || self.profile.has_extra_zone)
    }

    fn zone_word(zone: u8, color: ZoneColor) -> u32 {
        let c = color.rgb().unwrap_or(RgbColor::BLACK);
        kb::zone_color(zone, c.r, c.g, c.b)
    }

    fn brightness_word(&self, level: u8) -> u32 {
        kb::BRIGHTNESS | self.profile.raw_brightness(level) as u32
    }

    /// Send every zone, stopping at the first failure
    fn send_all_zones(&self, io: &DeviceIo, colors: &[ZoneColor]) -> Result<(), TransportError> {
        for zone in self.zones() {
            let color = colors.get(zone as usize).copied().unwrap_or(ZoneColor::Rgb(RgbColor::BLACK));
            io.kb_led(Self::zone_word(zone, color))?;
        }
        Ok(())
    }

    fn send_blank(&self, io: &DeviceIo) -> Result<(), TransportError> {
        for zone in self.zones() {
            io.kb_led(Self::zone_word(zone, ZoneColor::Rgb(RgbColor::BLACK)))?;
        }
        Ok(())
    }
}

impl BacklightOps for FullColorOps {
    fn family(&self) -> ProfileFamily {
        self.profile.family
    }

    fn init(
        &self,
        io: &DeviceIo,
        state: &mut BacklightState,
        power: Power,
        colors: &[ZoneColor],
        brightness: u8,
    ) -> Result<(), KeyboardError> {
        // the firmware stays enabled; "off" is expressed as black zones
        io.kb_led(kb::STATE | kb::STATE_ON)?;
        match power {
            Power::On => self.send_all_zones(io, colors)?,
            Power::Off => self.send_blank(io)?,
        }
        io.kb_led(self.brightness_word(brightness))?;

        state.power = power;
        state.zone_colors = colors.to_vec();
        state.saved_colors = colors.to_vec();
        state.brightness = brightness;
        state.mode = BacklightMode::Custom;
        Ok(())
    }

    fn set_state(&self, io: &DeviceIo, state: &BacklightState, power: Power) -> Result<(), KeyboardError> {
        match power {
            Power::On => {
                self.send_all_zones(io, &state.saved_colors)?;
                io.kb_led(self.brightness_word(state.brightness))?;
            }
            Power::Off => self.send_blank(io)?,
        }
        Ok(())
    }

    fn set_color(&self, io: &DeviceIo, state: &mut BacklightState, colors: &[ZoneColor]) -> Result<(), KeyboardError> {
        let mut written = 0;
        let mut failures = Vec::new();

        for zone in self.zones() {
            let Some(&color) = colors.get(zone as usize) else {
                continue;
            };
            match io.kb_led(Self::zone_word(zone, color)) {
                Ok(()) => {
                    state.zone_colors[zone as usize] = color;
                    written += 1;
                }
                Err(e) => {
                    warn!("zone {zone} color write failed: {e}");
                    failures.push(e);
                }
            }
        }

        if written > 0 {
            state.mode = BacklightMode::Custom;
        }
        let failed = failures.len();
        match failures.into_iter().next() {
            None => Ok(()),
            Some(source) if written == 0 => Err(KeyboardError::CommunicationFailure(source)),
            Some(source) => Err(KeyboardError::PartialWrite {
                written,
                failed,
                source,
            }),
        }
    }

    fn set_brightness(&self, io: &DeviceIo, state: &mut BacklightState, level: u8) -> Result<(), KeyboardError> {
        io.kb_led(self.brightness_word(level))?;
        state.brightness = level;
        Ok(())
    }

    fn set_mode(&self, io: &DeviceIo, state: &mut BacklightState, mode: BacklightMode) -> Result<(), KeyboardError> {
        io.kb_led(kb::MODE_RESET)?;
        match native_mode_word(mode) {
            Some(word) => io.kb_led(word)?,
            None => {
                self.send_all_zones(io, &state.zone_colors)?;
                io.kb_led(self.brightness_word(state.brightness))?;
            }
        }
        state.mode = mode;
        Ok(())
    }

    fn write_brightness(&self, io: &DeviceIo, _state: &BacklightState, level: u8) -> Result<(), TransportError> {
        io.kb_led(self.brightness_word(level))
    }

    fn write_frame_color(
        &self,
        io: &DeviceIo,
        _state: &BacklightState,
        color: RgbColor,
        _level: u8,
    ) -> Result<(), TransportError> {
        for zone in 0..self.profile.zone_count.min(3) {
            io.kb_led(kb::zone_color(zone, color.r, color.g, color.b))?;
        }
        Ok(())
    }
}

// ============================================================================
// 8-color (3-bit palette, one word for all zones)
// ============================================================================

pub struct EightColorOps {
    profile: CapabilityProfile,
}

impl EightColorOps {
    fn nibble(color: ZoneColor) -> u32 {
        match color {
            ZoneColor::Index(i) => (i & 0x7) as u32,
            ZoneColor::Rgb(c) => c.to_palette3() as u32,
        }
    }

    /// `L C R` nibbles in the low 12 bits
    fn zone_bits(colors: &[ZoneColor]) -> u32 {
        let at = |i: usize| colors.get(i).copied().map(Self::nibble).unwrap_or(0);
        at(2) << 8 | at(1) << 4 | at(0)
    }

    fn color_word(colors: &[ZoneColor], level: u8) -> u32 {
        kb::EIGHT_COLOR | (level as u32) << 12 | Self::zone_bits(colors)
    }

    fn brightness_word(&self, colors: &[ZoneColor], level: u8) -> u32 {
        kb::EIGHT_BRIGHTNESS | (self.profile.raw_brightness(level) as u32) << 12 | Self::zone_bits(colors)
    }

    fn apply_mode(
        &self,
        io: &DeviceIo,
        colors: &[ZoneColor],
        level: u8,
        mode: BacklightMode,
    ) -> Result<(), TransportError> {
        io.kb_led(kb::EIGHT_MODE_RESET)?;
        match mode {
            BacklightMode::Custom => {
                io.kb_led(Self::color_word(colors, level))?;
                io.kb_led(self.brightness_word(colors, level))
            }
            BacklightMode::Breathe => io.kb_led(kb::EIGHT_MODE_BREATHE),
            BacklightMode::Cycle => io.kb_led(kb::EIGHT_MODE_CYCLE),
            other => match native_mode_word(other) {
                Some(word) => io.kb_led(word),
                None => Ok(()),
            },
        }
    }
}

impl BacklightOps for EightColorOps {
    fn family(&self) -> ProfileFamily {
        ProfileFamily::EightColor
    }

    fn init(
        &self,
        io: &DeviceIo,
        state: &mut BacklightState,
        power: Power,
        colors: &[ZoneColor],
        brightness: u8,
    ) -> Result<(), KeyboardError> {
        io.kb_led(kb::EIGHT_OFF)?;
        if power.is_on() {
            io.kb_led(Self::color_word(colors, brightness))?;
            io.kb_led(self.brightness_word(colors, brightness))?;
            self.apply_mode(io, colors, brightness, BacklightMode::Custom)?;
        }

        state.power = power;
        state.zone_colors = colors.to_vec();
        state.saved_colors = colors.to_vec();
        state.brightness = brightness;
        state.mode = BacklightMode::Custom;
        Ok(())
    }

    /// On re-applies the current mode while Off sends a dedicated word; the
    /// firmware expects exactly this pairing.
    fn set_state(&self, io: &DeviceIo, state: &BacklightState, power: Power) -> Result<(), KeyboardError> {
        match power {
            Power::On => self.apply_mode(io, &state.saved_colors, state.brightness, state.mode)?,
            Power::Off => io.kb_led(kb::EIGHT_OFF)?,
        }
        Ok(())
    }

    fn set_color(&self, io: &DeviceIo, state: &mut BacklightState, colors: &[ZoneColor]) -> Result<(), KeyboardError> {
        io.kb_led(Self::color_word(colors, state.brightness))?;
        state.zone_colors = colors.to_vec();
        state.mode = BacklightMode::Custom;
        Ok(())
    }

    fn set_brightness(&self, io: &DeviceIo, state: &mut BacklightState, level: u8) -> Result<(), KeyboardError> {
        io.kb_led(self.brightness_word(&state.zone_colors, level))?;
        state.brightness = level;
        Ok(())
    }

    fn set_mode(&self, io: &DeviceIo, state: &mut BacklightState, mode: BacklightMode) -> Result<(), KeyboardError> {
        self.apply_mode(io, &state.zone_colors, state.brightness, mode)?;
        state.mode = mode;
        Ok(())
    }

    fn write_brightness(&self, io: &DeviceIo, state: &BacklightState, level: u8) -> Result<(), TransportError> {
        io.kb_led(self.brightness_word(&state.zone_colors, level))
    }

    fn write_frame_color(
        &self,
        io: &DeviceIo,
        _state: &BacklightState,
        color: RgbColor,
        level: u8,
    ) -> Result<(), TransportError> {
        let colors = [ZoneColor::Index(color.to_palette3()); 3];
        io.kb_led(Self::color_word(&colors, level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xsm_transport::mock::MockBus;

    fn setup(profile: CapabilityProfile) -> (Arc<MockBus>, DeviceIo, BacklightState, Arc<dyn BacklightOps>) {
        let bus = Arc::new(MockBus::new());
        let io = DeviceIo::new(bus.clone(), &profile, 0);
        (bus, io, BacklightState::new(&profile), ops_for(profile))
    }

    #[test]
    fn test_full_color_zone_words() {
        let (bus, io, mut state, ops) = setup(CapabilityProfile::FULL_COLOR);
        let colors = [
            ZoneColor::Rgb(RgbColor::RED),
            ZoneColor::Rgb(RgbColor::GREEN),
            ZoneColor::Rgb(RgbColor::BLUE),
        ];
        ops.set_color(&io, &mut state, &colors).unwrap();
        assert_eq!(bus.kb_led_arguments(), vec![0xF000_FF00, 0xF100_00FF, 0xF2FF_0000]);
        assert_eq!(state.zone_colors, colors.to_vec());
    }

    #[test]
    fn test_full_color_mode_reset_then_trigger() {
        let (bus, io, mut state, ops) = setup(CapabilityProfile::FULL_COLOR);
        ops.set_mode(&io, &mut state, BacklightMode::Dance).unwrap();
        assert_eq!(bus.kb_led_arguments(), vec![kb::MODE_RESET, kb::MODE_DANCE]);
        assert_eq!(state.mode, BacklightMode::Dance);
    }

    #[test]
    fn test_full_color_custom_mode_resends_colors_and_brightness() {
        let (bus, io, mut state, ops) = setup(CapabilityProfile::FULL_COLOR_EXTRA);
        state.brightness = 2;
        ops.set_mode(&io, &mut state, BacklightMode::Custom).unwrap();
        let args = bus.kb_led_arguments();
        assert_eq!(args.len(), 1 + 4 + 1);
        assert_eq!(args[0], kb::MODE_RESET);
        assert_eq!(args[4], 0xF3FF_0000);
        assert_eq!(args[5], 0xF400_00FF - 2 * 0x19);
    }

    #[test]
    fn test_eight_color_words() {
        let (bus, io, mut state, ops) = setup(CapabilityProfile::EIGHT_COLOR);
        state.brightness = 10;
        let colors = [ZoneColor::Index(2), ZoneColor::Index(4), ZoneColor::Index(1)];
        ops.set_color(&io, &mut state, &colors).unwrap();
        ops.set_brightness(&io, &mut state, 3).unwrap();
        assert_eq!(bus.kb_led_arguments(), vec![0x0201_A142, 0xD201_3142]);
    }

    #[test]
    fn test_eight_color_state_asymmetry() {
        let (bus, io, mut state, ops) = setup(CapabilityProfile::EIGHT_COLOR);
        state.mode = BacklightMode::Cycle;
        ops.set_state(&io, &state, Power::Off).unwrap();
        ops.set_state(&io, &state, Power::On).unwrap();
        assert_eq!(
            bus.kb_led_arguments(),
            vec![kb::EIGHT_OFF, kb::EIGHT_MODE_RESET, kb::EIGHT_MODE_CYCLE]
        );
    }

    #[test]
    fn test_eight_color_frame_color_maps_to_palette() {
        let (bus, io, state, ops) = setup(CapabilityProfile::EIGHT_COLOR);
        ops.write_frame_color(&io, &state, RgbColor::CYAN, 9).unwrap();
        assert_eq!(bus.kb_led_arguments(), vec![0x0201_9555]);
    }
}
