//! Fan tachometers, temperatures, fan control and power profiles
//!
//! Everything here goes through the same device lock as the backlight.

use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;
use xsm_transport::protocol::{ec, kb, method};
use xsm_transport::TransportExt;

use crate::device::{DeviceHandle, DeviceIo};
use crate::error::KeyboardError;

/// Tachometer constant: rpm = `FAN_RPM_FACTOR / raw`
const FAN_RPM_FACTOR: u32 = 2_156_220;
pub const FAN_COUNT: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanMode {
    #[default]
    Auto,
    Max,
    /// Register left as configured by other tools
    Custom,
}

impl FanMode {
    pub fn index(self) -> u8 {
        match self {
            FanMode::Auto => 0,
            FanMode::Max => 1,
            FanMode::Custom => 2,
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FanMode::Auto => "auto",
            FanMode::Max => "max",
            FanMode::Custom => "custom",
        })
    }
}

impl FromStr for FanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "0" => Ok(FanMode::Auto),
            "max" | "1" => Ok(FanMode::Max),
            "custom" | "2" => Ok(FanMode::Custom),
            other => Err(format!("unknown fan mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PowerProfile {
    Performance = 0,
    Entertainment = 1,
    #[default]
    PowerSaving = 2,
    Quiet = 3,
}

impl PowerProfile {
    pub const ALL: [PowerProfile; 4] = [
        PowerProfile::Performance,
        PowerProfile::Entertainment,
        PowerProfile::PowerSaving,
        PowerProfile::Quiet,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PowerProfile::Performance => "performance",
            PowerProfile::Entertainment => "entertainment",
            PowerProfile::PowerSaving => "power_saving",
            PowerProfile::Quiet => "quiet",
        }
    }

    /// Fan behaviour that goes with the profile
    pub fn fan_mode(self) -> FanMode {
        match self {
            PowerProfile::Performance => FanMode::Max,
            _ => FanMode::Auto,
        }
    }
}

impl fmt::Display for PowerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PowerProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase().replace('-', "_");
        if let Ok(n) = s.parse::<usize>() {
            return Self::ALL
                .get(n)
                .copied()
                .ok_or_else(|| format!("power profile {n} out of range (0-3)"));
        }
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown power profile '{s}'"))
    }
}

/// One sensor sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorReadings {
    pub cpu_fan_rpm: u32,
    pub gpu_fan_rpm: u32,
    /// Degrees Celsius
    pub cpu_temp: u8,
    pub gpu_temp: u8,
}

struct ThermalState {
    fan_mode: FanMode,
    profile: PowerProfile,
}

pub struct Thermal {
    device: DeviceHandle,
    state: Mutex<ThermalState>,
}

impl Thermal {
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            device,
            state: Mutex::new(ThermalState {
                fan_mode: FanMode::default(),
                profile: PowerProfile::default(),
            }),
        }
    }

    pub fn fan_rpm(&self, fan: u8) -> Result<u32, KeyboardError> {
        if fan >= FAN_COUNT {
            return Err(KeyboardError::InvalidArgument(format!("no fan {fan}")));
        }
        Ok(self.device.with_io(|io| read_fan(io, fan))?)
    }

    pub fn cpu_temp(&self) -> Result<u8, KeyboardError> {
        Ok(self.device.with_io(|io| io.read_register(ec::CPU_TEMP))?)
    }

    pub fn gpu_temp(&self) -> Result<u8, KeyboardError> {
        Ok(self.device.with_io(|io| io.read_register(ec::GPU_TEMP))?)
    }

    pub fn readings(&self) -> Result<SensorReadings, KeyboardError> {
        let readings = self.device.with_io(|io| {
            Ok::<_, xsm_transport::TransportError>(SensorReadings {
                cpu_fan_rpm: read_fan(io, 0)?,
                gpu_fan_rpm: read_fan(io, 1)?,
                cpu_temp: io.read_register(ec::CPU_TEMP)?,
                gpu_temp: io.read_register(ec::GPU_TEMP)?,
            })
        })?;
        Ok(readings)
    }

    pub fn fan_mode(&self) -> FanMode {
        self.state.lock().fan_mode
    }

    pub fn set_fan_mode(&self, mode: FanMode) -> Result<(), KeyboardError> {
        let value = match mode {
            FanMode::Auto => Some(ec::FAN_AUTO),
            FanMode::Max => Some(ec::FAN_MAX),
            FanMode::Custom => None,
        };
        if let Some(value) = value {
            self.device
                .with_io(|io| io.write_register(ec::FAN_CONTROL, value))?;
        }
        self.state.lock().fan_mode = mode;
        info!("fan mode {mode}");
        Ok(())
    }

    pub fn power_profile(&self) -> PowerProfile {
        self.state.lock().profile
    }

    pub fn set_power_profile(&self, profile: PowerProfile) -> Result<(), KeyboardError> {
        self.device.with_io(|io| {
            io.send_method(method::SET_KB_LED, kb::POWER_PROFILE | profile.index() as u32)
        })?;
        self.state.lock().profile = profile;
        info!("power profile {profile}");
        self.set_fan_mode(profile.fan_mode())
    }
}

fn read_fan(io: &DeviceIo, fan: u8) -> Result<u32, xsm_transport::TransportError> {
    let base = ec::FAN_TACH_BASE + 2 * fan;
    let raw = (io.read_register(base)? as u32) << 8 | io.read_register(base + 1)? as u32;
    Ok(if raw == 0 { 0 } else { FAN_RPM_FACTOR / raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CapabilityProfile;
    use std::sync::Arc;
    use xsm_transport::mock::MockBus;

    fn thermal() -> (Arc<MockBus>, Thermal) {
        let bus = Arc::new(MockBus::new());
        let device = DeviceHandle::new(bus.clone(), CapabilityProfile::FULL_COLOR, 0);
        (bus, Thermal::new(device))
    }

    #[test]
    fn test_fan_rpm_formula() {
        let (bus, thermal) = thermal();
        assert_eq!(thermal.fan_rpm(0).unwrap(), 0);

        bus.set_register(0xD0, 0x02);
        bus.set_register(0xD1, 0x58);
        assert_eq!(thermal.fan_rpm(0).unwrap(), 2_156_220 / 0x258);
        assert!(thermal.fan_rpm(2).is_err());
    }

    #[test]
    fn test_readings() {
        let (bus, thermal) = thermal();
        bus.set_register(ec::CPU_TEMP, 55);
        bus.set_register(ec::GPU_TEMP, 61);
        bus.set_register(0xD3, 0x01);
        let r = thermal.readings().unwrap();
        assert_eq!((r.cpu_temp, r.gpu_temp), (55, 61));
        assert_eq!(r.gpu_fan_rpm, 2_156_220);
    }

    #[test]
    fn test_power_profile_sets_fan() {
        let (bus, thermal) = thermal();
        thermal.set_power_profile(PowerProfile::Performance).unwrap();
        assert_eq!(bus.kb_led_arguments(), vec![0xA300_0000]);
        assert_eq!(bus.register(ec::FAN_CONTROL), 0xFF);
        assert_eq!(thermal.fan_mode(), FanMode::Max);

        thermal.set_power_profile(PowerProfile::Quiet).unwrap();
        assert_eq!(bus.register(ec::FAN_CONTROL), 0x00);
        assert_eq!(thermal.power_profile(), PowerProfile::Quiet);
    }

    #[test]
    fn test_custom_fan_mode_leaves_register() {
        let (bus, thermal) = thermal();
        bus.set_register(ec::FAN_CONTROL, 0x80);
        thermal.set_fan_mode(FanMode::Custom).unwrap();
        assert_eq!(bus.register(ec::FAN_CONTROL), 0x80);
        assert!(bus.register_writes().is_empty());
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("power-saving".parse::<PowerProfile>().unwrap(), PowerProfile::PowerSaving);
        assert_eq!("0".parse::<PowerProfile>().unwrap(), PowerProfile::Performance);
        assert!("turbo".parse::<PowerProfile>().is_err());
    }
}
