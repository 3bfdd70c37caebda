//! Attribute layer and session wiring against the recording mock bus

use std::sync::Arc;

use xsm_driver::attributes::{self, Attribute};
use xsm_driver::{Config, Session};
use xsm_keyboard::{HotkeyAction, KeyboardError, Power, ProfileFamily};
use xsm_transport::mock::MockBus;
use xsm_transport::protocol::{ec, method};
use xsm_transport::{Opcode, Transport};

fn open(config: &Config) -> (Session, Arc<MockBus>) {
    let bus = Arc::new(MockBus::new());
    let session = Session::with_bus(config, bus.clone() as Arc<dyn Transport>).unwrap();
    (session, bus)
}

fn read(session: &Session, attr: Attribute) -> String {
    attributes::read(session, attr).unwrap()
}

#[test]
fn test_init_applies_config() {
    let mut config = Config::default();
    config.backlight.brightness = 4;
    config.backlight.colors = vec!["cyan".parse().unwrap()];
    let (session, bus) = open(&config);

    assert!(bus
        .delivered()
        .iter()
        .any(|c| c.opcode == Opcode::Method(method::GET_AP)));
    assert_eq!(read(&session, Attribute::Color), "cyan cyan cyan");
    assert_eq!(read(&session, Attribute::Brightness), "4");
    assert_eq!(read(&session, Attribute::State), "1");
    assert_eq!(read(&session, Attribute::Mode), "1");
}

#[test]
fn test_init_fails_without_firmware() {
    let bus = Arc::new(MockBus::new());
    bus.fail_when(|c| c.opcode == Opcode::Method(method::GET_AP));
    let result = Session::with_bus(&Config::default(), bus as Arc<dyn Transport>);
    assert!(result.is_err());
}

#[test]
fn test_brightness_attribute() {
    let (session, bus) = open(&Config::default());
    bus.clear_log();

    attributes::write(&session, Attribute::Brightness, "3").unwrap();
    assert_eq!(bus.kb_led_arguments(), vec![0xF400_00B4]);
    assert_eq!(read(&session, Attribute::Brightness), "3");

    // clamps to the dimmest level
    attributes::write(&session, Attribute::Brightness, "0x20").unwrap();
    assert_eq!(read(&session, Attribute::Brightness), "9");

    assert!(matches!(
        attributes::write(&session, Attribute::Brightness, "bright"),
        Err(KeyboardError::InvalidArgument(_))
    ));
}

#[test]
fn test_color_attribute() {
    let (session, bus) = open(&Config::default());
    attributes::write(&session, Attribute::Mode, "2").unwrap();
    assert_eq!(read(&session, Attribute::Mode), "2");

    attributes::write(&session, Attribute::Color, "red green blue").unwrap();
    assert_eq!(read(&session, Attribute::Color), "red green blue");
    assert_eq!(read(&session, Attribute::Mode), "1");

    // extra-zone color is dropped on a 3-zone keyboard
    bus.clear_log();
    attributes::write(&session, Attribute::Color, "white white white red").unwrap();
    assert_eq!(read(&session, Attribute::Color), "white white white");
    assert!(bus.kb_led_arguments().iter().all(|arg| arg >> 24 != 0xF3));

    // unknown names are rejected before any hardware call
    bus.clear_log();
    assert!(matches!(
        attributes::write(&session, Attribute::Color, "red mauve blue"),
        Err(KeyboardError::InvalidArgument(_))
    ));
    assert!(bus.commands().is_empty());
    assert_eq!(read(&session, Attribute::Color), "white white white");
}

#[test]
fn test_state_attribute() {
    let (session, _bus) = open(&Config::default());
    attributes::write(&session, Attribute::Color, "green").unwrap();

    attributes::write(&session, Attribute::State, "0").unwrap();
    assert_eq!(read(&session, Attribute::State), "0");
    assert!(matches!(
        attributes::write(&session, Attribute::Brightness, "2"),
        Err(KeyboardError::PoweredOff)
    ));

    // any non-zero value means on
    attributes::write(&session, Attribute::State, "5").unwrap();
    assert_eq!(read(&session, Attribute::State), "1");
    assert_eq!(read(&session, Attribute::Color), "green green green");
}

#[test]
fn test_wave_timing_attributes() {
    let (session, _bus) = open(&Config::default());
    assert_eq!(read(&session, Attribute::WaveInterval), "40");
    assert_eq!(read(&session, Attribute::WavePeriod), "760");

    attributes::write(&session, Attribute::WavePeriod, "1000").unwrap();
    assert_eq!(read(&session, Attribute::WaveInterval), "52");
    assert_eq!(read(&session, Attribute::WavePeriod), "988");

    attributes::write(&session, Attribute::WavePeriod, "50").unwrap();
    assert_eq!(read(&session, Attribute::WaveInterval), "10");

    attributes::write(&session, Attribute::WaveInterval, "3").unwrap();
    assert_eq!(read(&session, Attribute::WaveInterval), "10");
}

#[test]
fn test_led_mode_and_wave_attributes() {
    let (session, bus) = open(&Config::default());
    assert_eq!(read(&session, Attribute::LedMode), "0 (static)");

    attributes::write(&session, Attribute::LedMode, "wave").unwrap();
    assert_eq!(read(&session, Attribute::LedMode), "1 (wave)");
    assert_eq!(read(&session, Attribute::Wave), "1");
    assert_eq!(read(&session, Attribute::Mode), "4");

    attributes::write(&session, Attribute::LedMode, "3").unwrap();
    assert_eq!(read(&session, Attribute::LedMode), "3 (blink)");
    assert_eq!(read(&session, Attribute::Wave), "0");

    // kb_wave 0 leaves a non-wave effect alone
    attributes::write(&session, Attribute::Wave, "0").unwrap();
    assert_eq!(read(&session, Attribute::LedMode), "3 (blink)");

    bus.clear_log();
    attributes::write(&session, Attribute::LedMode, "static").unwrap();
    assert_eq!(read(&session, Attribute::LedMode), "0 (static)");
    assert_eq!(bus.kb_led_arguments().last(), Some(&0xF400_00FF));

    assert!(matches!(
        attributes::write(&session, Attribute::LedMode, "7"),
        Err(KeyboardError::InvalidArgument(_))
    ));
}

#[test]
fn test_sensor_attributes() {
    let (session, bus) = open(&Config::default());
    bus.set_register(ec::FAN_TACH_BASE, 0x03);
    bus.set_register(ec::FAN_TACH_BASE + 1, 0xE8);
    bus.set_register(ec::CPU_TEMP, 45);
    bus.set_register(ec::GPU_TEMP, 60);

    assert_eq!(read(&session, Attribute::Fan1Input), "2156");
    assert_eq!(read(&session, Attribute::Fan2Input), "0");
    assert_eq!(read(&session, Attribute::Temp1Input), "45000");
    assert_eq!(read(&session, Attribute::Temp2Input), "60000");

    assert!(matches!(
        attributes::write(&session, Attribute::Fan1Input, "1000"),
        Err(KeyboardError::NotSupported(_))
    ));
}

#[test]
fn test_fan_and_power_profile_attributes() {
    let (session, bus) = open(&Config::default());
    assert_eq!(read(&session, Attribute::FanControl), "0 (auto)");
    assert_eq!(read(&session, Attribute::PowerProfile), "2 (power_saving)");

    attributes::write(&session, Attribute::FanControl, "max").unwrap();
    assert_eq!(bus.register(ec::FAN_CONTROL), 0xFF);
    assert_eq!(read(&session, Attribute::FanControl), "1 (max)");

    attributes::write(&session, Attribute::PowerProfile, "quiet").unwrap();
    assert_eq!(bus.kb_led_arguments().last(), Some(&0xA300_0003));
    assert_eq!(bus.register(ec::FAN_CONTROL), 0x00);
    assert_eq!(read(&session, Attribute::PowerProfile), "3 (quiet)");

    attributes::write(&session, Attribute::PowerProfile, "0").unwrap();
    assert_eq!(read(&session, Attribute::FanControl), "1 (max)");

    assert!(attributes::write(&session, Attribute::PowerProfile, "turbo").is_err());
}

#[test]
fn test_airplane_led_attribute() {
    let (session, bus) = open(&Config::default());
    bus.set_register(ec::AIRPLANE_LED, 0x01);

    attributes::write(&session, Attribute::AirplaneLed, "1").unwrap();
    session.airplane().flush().unwrap();
    assert_eq!(bus.register(ec::AIRPLANE_LED), 0x41);
    assert_eq!(read(&session, Attribute::AirplaneLed), "1");

    attributes::write(&session, Attribute::AirplaneLed, "0").unwrap();
    session.airplane().flush().unwrap();
    assert_eq!(bus.register(ec::AIRPLANE_LED), 0x01);
}

#[test]
fn test_wwan_attribute() {
    let (session, bus) = open(&Config::default());
    bus.set_method_result(method::GET_POWER_STATE_FOR_3G, 1);
    assert_eq!(read(&session, Attribute::Wwan), "1");

    bus.clear_log();
    attributes::write(&session, Attribute::Wwan, "0").unwrap();
    let sent = bus.delivered();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].opcode, Opcode::Method(method::SET_3G));
    assert_eq!(sent[0].argument, 0);
}

#[test]
fn test_eight_color_profile_attributes() {
    let mut config = Config::default();
    config.device.family = Some(ProfileFamily::EightColor);
    let (session, _bus) = open(&config);

    attributes::write(&session, Attribute::Brightness, "10").unwrap();
    assert_eq!(read(&session, Attribute::Brightness), "10");
    attributes::write(&session, Attribute::Color, "red green blue").unwrap();
    assert_eq!(read(&session, Attribute::Color), "red green blue");
}

#[test]
fn test_hotkey_events_through_session() {
    let (session, _bus) = open(&Config::default());

    assert_eq!(session.handle_event(0x82).unwrap(), Some(HotkeyAction::BrightnessUp));
    assert_eq!(read(&session, Attribute::Brightness), "1");

    assert_eq!(session.handle_event(0x83).unwrap(), Some(HotkeyAction::Cycle));
    assert_eq!(read(&session, Attribute::Color), "red red red");

    assert_eq!(session.handle_event(0x9F).unwrap(), Some(HotkeyAction::TogglePower));
    assert_eq!(session.controller().snapshot().power, Power::Off);

    assert_eq!(session.handle_notify(0x42).unwrap(), None);
}

#[test]
fn test_push_airplane_event_stops_poller() {
    let mut config = Config::default();
    config.hotkeys.poll_freq = 20;
    let (session, _bus) = open(&config);

    assert!(session.start_poller().unwrap());
    assert!(session.poller_running());

    assert_eq!(session.handle_event(0xF4).unwrap(), Some(HotkeyAction::Airplane));
    assert!(!session.poller_running());
    assert_eq!(session.dispatcher().counter().reported(), 1);

    // push delivery owns the hotkey from now on
    assert!(!session.start_poller().unwrap());
}

#[test]
fn test_polling_disabled_in_config() {
    let mut config = Config::default();
    config.hotkeys.poll = false;
    let (session, _bus) = open(&config);
    assert!(!session.start_poller().unwrap());
}

#[test]
fn test_persist_backlight_state() {
    let dir = std::env::temp_dir().join(format!("xsm-driver-persist-{}", std::process::id()));
    let path = dir.join("config.toml");
    let (session, _bus) = open(&Config::default());

    attributes::write(&session, Attribute::Color, "magenta").unwrap();
    attributes::write(&session, Attribute::Brightness, "6").unwrap();
    attributes::write(&session, Attribute::State, "0").unwrap();
    session.persist(&path).unwrap();

    let saved = Config::load(&path).unwrap();
    assert_eq!(saved.backlight.power, Power::Off);
    assert_eq!(saved.backlight.brightness, 6);
    let colors: Vec<String> = saved.backlight.colors.iter().map(ToString::to_string).collect();
    assert_eq!(colors, vec!["magenta", "magenta", "magenta"]);

    // the saved state comes back on the next start
    let (next, _bus) = open(&saved);
    assert_eq!(read(&next, Attribute::State), "0");
    attributes::write(&next, Attribute::State, "1").unwrap();
    assert_eq!(read(&next, Attribute::Color), "magenta magenta magenta");

    let _ = std::fs::remove_dir_all(dir);
}
