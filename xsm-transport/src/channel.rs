//! Routing channel over the firmware-method and EC buses
//!
//! ```text
//! [AcpiCallWmi]   [EcRegisterFile]   ← implement Transport (one bus each)
//!        \              /
//!        [DeviceChannel]               ← routes by opcode, logs every call
//!              |
//!     [BacklightController / poller / sensors]
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::error::TransportError;
use crate::protocol::method;
use crate::types::{BusKind, DeviceCommand, Opcode, TransportInfo};
use crate::Transport;

/// A transport that sends method calls and register accesses to the bus that
/// serves each of them. Either bus may be absent; commands for a missing bus
/// fail with [`TransportError::Unsupported`].
pub struct DeviceChannel {
    wmi: Option<Arc<dyn Transport>>,
    ec: Option<Arc<dyn Transport>>,
    info: TransportInfo,
}

impl DeviceChannel {
    pub fn new(wmi: Option<Arc<dyn Transport>>, ec: Option<Arc<dyn Transport>>) -> Self {
        let path = wmi
            .iter()
            .chain(ec.iter())
            .map(|bus| bus.info().path.clone())
            .collect::<Vec<_>>()
            .join(" + ");
        let bus = match (&wmi, &ec) {
            (Some(w), None) => w.info().bus,
            (None, Some(e)) => e.info().bus,
            _ => BusKind::Wmi,
        };
        Self {
            wmi,
            ec,
            info: TransportInfo { bus, path },
        }
    }

    pub fn has_wmi(&self) -> bool {
        self.wmi.is_some()
    }

    pub fn has_ec(&self) -> bool {
        self.ec.is_some()
    }

    fn route(&self, opcode: Opcode) -> Result<&Arc<dyn Transport>, TransportError> {
        let (bus, name) = match opcode {
            Opcode::Method(_) => (&self.wmi, "firmware method bus"),
            Opcode::Register(_) => (&self.ec, "EC register bus"),
        };
        bus.as_ref()
            .ok_or_else(|| TransportError::Unsupported(format!("no {name} configured")))
    }
}

impl Transport for DeviceChannel {
    fn execute(&self, command: DeviceCommand) -> Result<u32, TransportError> {
        let bus = self.route(command.opcode)?;
        let label = match command.opcode {
            Opcode::Method(id) => method::name(id).unwrap_or("?"),
            Opcode::Register(_) => "",
        };
        let result = bus.execute(command);
        match &result {
            Ok(value) => debug!("{command} {label} -> 0x{value:08X}"),
            Err(e) => debug!("{command} {label} failed: {e}"),
        }
        result
    }

    fn info(&self) -> &TransportInfo {
        &self.info
    }

    fn is_available(&self) -> bool {
        self.wmi.as_ref().is_some_and(|b| b.is_available())
            || self.ec.as_ref().is_some_and(|b| b.is_available())
    }
}
