//! Protocol constants for Clevo XSM firmware (WMI `WMBB`) and EC registers

/// WMI event GUID; notifications carry [`event::NOTIFY_VALUE`]
pub const WMI_EVENT_GUID: &str = "ABBC0F6B-8EA1-11D1-00A0-C90629100000";
/// WMI method GUID exposing `WMBB`
pub const WMI_METHOD_GUID: &str = "ABBC0F6D-8EA1-11D1-00A0-C90629100000";

/// Firmware method ids passed to `WMBB`
pub mod method {
    pub const GET_EVENT: u8 = 0x01;
    pub const GET_POWER_STATE_FOR_3G: u8 = 0x0A;
    pub const GET_AP: u8 = 0x46;
    pub const SET_3G: u8 = 0x4C;
    pub const SET_KB_LED: u8 = 0x67;
    pub const AIRPLANE_BUTTON: u8 = 0x6D;
    pub const TALK_BIOS_3G: u8 = 0x78;

    /// Human readable method name for logs
    pub fn name(id: u8) -> Option<&'static str> {
        Some(match id {
            GET_EVENT => "GET_EVENT",
            GET_POWER_STATE_FOR_3G => "GET_POWER_STATE_FOR_3G",
            GET_AP => "GET_AP",
            SET_3G => "SET_3G",
            SET_KB_LED => "SET_KB_LED",
            AIRPLANE_BUTTON => "AIRPLANE_BUTTON",
            TALK_BIOS_3G => "TALK_BIOS_3G",
            _ => return None,
        })
    }
}

/// Embedded controller register map
pub mod ec {
    pub const CPU_TEMP: u8 = 0x07;
    pub const GPU_TEMP: u8 = 0xCD;
    pub const FAN_CONTROL: u8 = 0xCE;
    /// Fan `i` tachometer high byte lives at `FAN_TACH_BASE + 2*i`, low byte one after
    pub const FAN_TACH_BASE: u8 = 0xD0;
    pub const AIRPLANE_LED: u8 = 0xD9;
    pub const AIRPLANE_LED_BIT: u8 = 0x40;
    pub const AIRPLANE_HOTKEY: u8 = 0xDB;
    pub const AIRPLANE_HOTKEY_BIT: u8 = 0x40;

    pub const FAN_AUTO: u8 = 0x00;
    pub const FAN_MAX: u8 = 0xFF;
}

/// Hotkey notification values and event codes
pub mod event {
    /// Only notify value that carries a pending event
    pub const NOTIFY_VALUE: u32 = 0xD0;

    pub const BRIGHTNESS_DOWN: u32 = 0x81;
    pub const BRIGHTNESS_UP: u32 = 0x82;
    pub const CYCLE: u32 = 0x83;
    pub const TOGGLE: u32 = 0x9F;
    pub const AIRPLANE: u32 = 0xF4;
}

/// Backlight argument words sent through `SET_KB_LED`
pub mod kb {
    // Full-color family
    pub const ZONE_COLOR: u32 = 0xF000_0000;
    pub const BRIGHTNESS: u32 = 0xF400_0000;
    pub const MODE_RESET: u32 = 0x1000_0000;
    pub const STATE: u32 = 0xE000_0000;
    pub const STATE_ON: u32 = 0x0007_F001;
    pub const STATE_OFF: u32 = 0x0000_3001;

    // 8-color family
    pub const EIGHT_COLOR: u32 = 0x0201_0000;
    pub const EIGHT_BRIGHTNESS: u32 = 0xD201_0000;
    pub const EIGHT_MODE_RESET: u32 = 0x2000_0000;
    pub const EIGHT_OFF: u32 = 0x2201_0000;

    // Firmware-native effects
    pub const MODE_RANDOM_COLOR: u32 = 0x7000_0000;
    pub const MODE_BREATHE: u32 = 0x1002_A000;
    pub const MODE_CYCLE: u32 = 0x3301_0000;
    pub const MODE_DANCE: u32 = 0x8000_0000;
    pub const MODE_TEMPO: u32 = 0x9000_0000;
    pub const MODE_FLASH: u32 = 0xA000_0000;
    pub const MODE_WAVE: u32 = 0xB000_0000;
    pub const EIGHT_MODE_BREATHE: u32 = 0x1201_0000;
    pub const EIGHT_MODE_CYCLE: u32 = 0x3201_0000;

    /// Power profile base; low byte selects the profile
    pub const POWER_PROFILE: u32 = 0xA300_0000;

    /// Full-color zone command: `F<zone> BB RR GG`
    pub fn zone_color(zone: u8, r: u8, g: u8, b: u8) -> u32 {
        ZONE_COLOR | (zone as u32) << 24 | (b as u32) << 16 | (r as u32) << 8 | g as u32
    }
}

/// Default bus locations
pub mod paths {
    pub const ACPI_CALL: &str = "/proc/acpi/call";
    pub const WMBB_METHOD: &str = "\\_SB.WMI.WMBB";
    pub const EC_SYS_IO: &str = "/sys/kernel/debug/ec/ec0/io";
    pub const EC_DEV: &str = "/dev/ec";
}
