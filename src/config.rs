//! Persistent configuration
//!
//! TOML at `~/.config/clevo-xsm/config.toml`. A missing file means defaults;
//! every section and field is optional.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use xsm_keyboard::animation::DEFAULT_WAVE_INTERVAL_MS;
use xsm_keyboard::poller::DEFAULT_POLL_HZ;
use xsm_keyboard::{
    family_for_model, CapabilityProfile, ControllerOptions, EffectPolicy, InitialState, Power, ProfileFamily,
    ZoneColor, MAX_RETRIES,
};
use xsm_transport::protocol::paths;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub backlight: BacklightConfig,
    pub hotkeys: HotkeyConfig,
    pub bus: BusConfig,
}

/// Which capability profile to use
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Explicit family; wins over `model`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<ProfileFamily>,
    /// Product name looked up in the built-in model table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Bounded retries per transaction (0-3)
    pub retries: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacklightConfig {
    pub power: Power,
    /// 0 is brightest
    pub brightness: u32,
    /// One color for all zones, or one per zone
    pub colors: Vec<ZoneColor>,
    /// Cycle hotkey walks colors instead of modes
    pub cycle_colors: bool,
    pub effect_policy: EffectPolicy,
    pub wave_interval_ms: u64,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            power: Power::On,
            brightness: 0,
            colors: vec![ZoneColor::default_color()],
            cycle_colors: true,
            effect_policy: EffectPolicy::default(),
            wave_interval_ms: DEFAULT_WAVE_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Poll the EC for airplane hotkey presses
    pub poll: bool,
    /// Poll rate in Hz (1-20)
    pub poll_freq: u32,
    /// Airplane LED bit is active-low
    pub led_invert: bool,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            poll: true,
            poll_freq: DEFAULT_POLL_HZ,
            led_invert: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// `acpi_call` proc file
    pub acpi_call: PathBuf,
    /// ACPI path of the `WMBB` method
    pub wmbb_method: String,
    /// EC register files, first one that opens wins
    pub ec_paths: Vec<PathBuf>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            acpi_call: PathBuf::from(paths::ACPI_CALL),
            wmbb_method: paths::WMBB_METHOD.to_string(),
            ec_paths: vec![PathBuf::from(paths::EC_SYS_IO), PathBuf::from(paths::EC_DEV)],
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clevo-xsm")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.device.retries > MAX_RETRIES {
            bail!("device.retries must be 0-{MAX_RETRIES}, got {}", self.device.retries);
        }
        if self.backlight.colors.is_empty() {
            bail!("backlight.colors must name at least one color");
        }
        self.profile()?;
        Ok(())
    }

    /// Resolve the capability profile from `family` or `model`
    pub fn profile(&self) -> anyhow::Result<CapabilityProfile> {
        let family = match (&self.device.family, &self.device.model) {
            (Some(family), _) => *family,
            (None, Some(model)) => match family_for_model(model) {
                Some(family) => family,
                None => bail!("unknown model '{model}'; set device.family instead"),
            },
            (None, None) => ProfileFamily::FullColor,
        };
        Ok(CapabilityProfile::for_family(family))
    }

    pub fn initial_state(&self) -> InitialState {
        InitialState {
            power: self.backlight.power,
            brightness: self.backlight.brightness,
            colors: self.backlight.colors.clone(),
        }
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            retries: self.device.retries,
            policy: self.backlight.effect_policy,
            wave_interval_ms: self.backlight.wave_interval_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xsm_keyboard::RgbColor;

    #[test]
    fn test_default_config_serializes() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_str.contains("[backlight]"));
        assert!(toml_str.contains("\"blue\""));
        assert!(toml_str.contains("effect_policy = \"stop_effect\""));
        assert!(toml_str.contains("poll_freq = 5"));
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.device.family = Some(ProfileFamily::EightColor);
        config.backlight.colors = vec![
            ZoneColor::Index(2),
            ZoneColor::Rgb(RgbColor::new(0x12, 0x34, 0x56)),
            ZoneColor::Index(4),
        ];
        config.backlight.power = Power::Off;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
[device]
model = "P15SM"

[backlight]
brightness = 4
effect_policy = "race"
"#,
        )
        .unwrap();
        assert_eq!(parsed.profile().unwrap().family, ProfileFamily::EightColor);
        assert_eq!(parsed.backlight.brightness, 4);
        assert_eq!(parsed.backlight.effect_policy, EffectPolicy::Race);
        assert!(parsed.backlight.cycle_colors);
        assert_eq!(parsed.hotkeys, HotkeyConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.device.retries = 9;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.device.model = Some("Unknown 9000".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("xsm-driver-config-test-missing.toml");
        let _ = std::fs::remove_file(&path);
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("xsm-driver-config-{}", std::process::id()))
            .join("config.toml");
        let mut config = Config::default();
        config.hotkeys.led_invert = true;
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
