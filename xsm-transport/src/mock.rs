//! In-memory bus for tests and dry runs
//!
//! `MockBus` answers both firmware method calls and EC register accesses,
//! records every attempted transaction in order, and can be told to fail
//! selected commands.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::protocol::method;
use crate::types::{BusKind, DeviceCommand, Direction, Opcode, TransportInfo};
use crate::Transport;

type Matcher = Box<dyn Fn(&DeviceCommand) -> bool + Send>;

struct FailureRule {
    matcher: Matcher,
    /// `None` fails forever
    remaining: Option<usize>,
}

struct Entry {
    command: DeviceCommand,
    delivered: bool,
}

struct MockState {
    log: Vec<Entry>,
    registers: [u8; 256],
    method_results: HashMap<u8, u32>,
    rules: Vec<FailureRule>,
    available: bool,
}

/// Recording bus with an emulated 256-byte EC register file
pub struct MockBus {
    state: Mutex<MockState>,
    info: TransportInfo,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                log: Vec::new(),
                registers: [0; 256],
                method_results: HashMap::new(),
                rules: Vec::new(),
                available: true,
            }),
            info: TransportInfo {
                bus: BusKind::Mock,
                path: "mock".into(),
            },
        }
    }

    // ── Failure injection ──────────────────────────────────────────────

    /// Fail every command matching `matcher` until [`clear_failures`](Self::clear_failures)
    pub fn fail_when(&self, matcher: impl Fn(&DeviceCommand) -> bool + Send + 'static) {
        self.state.lock().rules.push(FailureRule {
            matcher: Box::new(matcher),
            remaining: None,
        });
    }

    /// Fail only the next command matching `matcher`
    pub fn fail_once(&self, matcher: impl Fn(&DeviceCommand) -> bool + Send + 'static) {
        self.state.lock().rules.push(FailureRule {
            matcher: Box::new(matcher),
            remaining: Some(1),
        });
    }

    pub fn clear_failures(&self) {
        self.state.lock().rules.clear();
    }

    /// Simulate the bus disappearing (every command fails with `DeviceNotFound`)
    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    // ── Emulated device ────────────────────────────────────────────────

    pub fn set_register(&self, register: u8, value: u8) {
        self.state.lock().registers[register as usize] = value;
    }

    pub fn register(&self, register: u8) -> u8 {
        self.state.lock().registers[register as usize]
    }

    /// Result returned by queries of `method` (default 0)
    pub fn set_method_result(&self, method: u8, value: u32) {
        self.state.lock().method_results.insert(method, value);
    }

    // ── Inspection ─────────────────────────────────────────────────────

    /// Every attempted command, including failed ones
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.lock().log.iter().map(|e| e.command).collect()
    }

    /// Commands the emulated device accepted
    pub fn delivered(&self) -> Vec<DeviceCommand> {
        self.state
            .lock()
            .log
            .iter()
            .filter(|e| e.delivered)
            .map(|e| e.command)
            .collect()
    }

    /// Arguments of delivered `SET_KB_LED` calls, in order
    pub fn kb_led_arguments(&self) -> Vec<u32> {
        self.delivered()
            .into_iter()
            .filter(|c| c.opcode == Opcode::Method(method::SET_KB_LED))
            .map(|c| c.argument)
            .collect()
    }

    /// Delivered EC writes as `(register, value)`
    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        self.delivered()
            .into_iter()
            .filter_map(|c| match (c.opcode, c.direction) {
                (Opcode::Register(r), Direction::FireAndForget) => Some((r, c.argument as u8)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    /// Poll until a delivered command satisfies `predicate` or `timeout` elapses
    pub fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl Fn(&DeviceCommand) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.delivered().iter().any(&predicate) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockBus {
    fn execute(&self, command: DeviceCommand) -> Result<u32, TransportError> {
        let mut state = self.state.lock();

        if !state.available {
            state.log.push(Entry {
                command,
                delivered: false,
            });
            return Err(TransportError::DeviceNotFound("mock bus unplugged".into()));
        }

        if let Some(pos) = state.rules.iter().position(|r| (r.matcher)(&command)) {
            let rule = &mut state.rules[pos];
            if let Some(n) = rule.remaining.as_mut() {
                *n -= 1;
                if *n == 0 {
                    state.rules.remove(pos);
                }
            }
            state.log.push(Entry {
                command,
                delivered: false,
            });
            return Err(TransportError::CallFailed {
                opcode: command.opcode.to_string(),
                argument: command.argument,
                reason: "injected failure".into(),
            });
        }

        state.log.push(Entry {
            command,
            delivered: true,
        });
        let result = match (command.opcode, command.direction) {
            (Opcode::Register(r), Direction::RequestResponse) => state.registers[r as usize] as u32,
            (Opcode::Register(r), Direction::FireAndForget) => {
                state.registers[r as usize] = (command.argument & 0xFF) as u8;
                0
            }
            (Opcode::Method(id), Direction::RequestResponse) => {
                state.method_results.get(&id).copied().unwrap_or(0)
            }
            (Opcode::Method(_), Direction::FireAndForget) => 0,
        };
        Ok(result)
    }

    fn info(&self) -> &TransportInfo {
        &self.info
    }

    fn is_available(&self) -> bool {
        self.state.lock().available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportExt;

    #[test]
    fn test_registers_and_methods() {
        let bus = MockBus::new();
        bus.set_method_result(method::GET_AP, 7);
        bus.write_register(0xCE, 0xFF).unwrap();

        assert_eq!(bus.register(0xCE), 0xFF);
        assert_eq!(bus.read_register(0xCE).unwrap(), 0xFF);
        assert_eq!(bus.call_method(method::GET_AP, 0).unwrap(), 7);
        assert_eq!(bus.register_writes(), vec![(0xCE, 0xFF)]);
    }

    #[test]
    fn test_fail_once_then_recover() {
        let bus = MockBus::new();
        bus.fail_once(|c| c.argument == 0xF400_00FF);

        assert!(bus.set_kb_led(0xF400_00FF).is_err());
        assert!(bus.set_kb_led(0xF400_00FF).is_ok());
        assert_eq!(bus.commands().len(), 2);
        assert_eq!(bus.kb_led_arguments(), vec![0xF400_00FF]);
    }

    #[test]
    fn test_persistent_failure_and_unplug() {
        let bus = MockBus::new();
        bus.fail_when(|c| matches!(c.opcode, Opcode::Register(0xDB)));
        assert!(bus.read_register(0xDB).is_err());
        assert!(bus.read_register(0xDB).is_err());
        bus.clear_failures();
        assert!(bus.read_register(0xDB).is_ok());

        bus.set_available(false);
        assert!(!bus.is_available());
        assert!(matches!(
            bus.set_kb_led(0),
            Err(TransportError::DeviceNotFound(_))
        ));
    }
}
