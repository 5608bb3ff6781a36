//! Per-connector helpers that bind a [`Gc100`] endpoint to one connector address.

use crate::core::gc100::Gc100;
use crate::domain::command::{Command, ConnectorAddress, IrMode, SendIr};
use crate::domain::error::Gc100Result;
use crate::domain::response::{IrConfig, PortState};
use crate::infrastructure::tcp::Connector;

/// An IR emitter connector
pub struct IrOutput<C: Connector> {
    gc100: Gc100<C>,
    addr: ConnectorAddress,
}

impl<C: Connector> IrOutput<C> {
    pub fn new(gc100: Gc100<C>, addr: impl Into<ConnectorAddress>) -> Self {
        Self {
            gc100,
            addr: addr.into(),
        }
    }

    pub fn addr(&self) -> &ConnectorAddress {
        &self.addr
    }

    /// `sendir` parameters for this connector with the usual defaults
    pub fn sendir_params(&self, freq: u32, code: impl Into<String>) -> SendIr {
        SendIr::new(self.addr.clone(), freq, code)
    }

    /// Prebuilt `sendir` command for this connector, for codes sent repeatedly
    pub fn format_sendir(&self, freq: u32, code: impl Into<String>) -> Command {
        Command::sendir(&self.sendir_params(freq, code))
    }

    pub async fn get_ir(&self) -> Gc100Result<IrConfig> {
        self.gc100.get_ir(&self.addr).await
    }

    pub async fn set_mode(&self, mode: IrMode) -> Gc100Result<()> {
        self.gc100.set_ir(&self.addr, mode).await
    }

    pub async fn sendir(&self, params: &SendIr) -> Gc100Result<String> {
        self.gc100.sendir(params).await
    }

    /// Send a command built earlier with [`format_sendir`](Self::format_sendir)
    pub async fn sendir_raw(&self, command: Command) -> Gc100Result<String> {
        self.gc100.raw_request(command).await
    }

    pub async fn stop(&self) -> Gc100Result<()> {
        self.gc100.stopir(&self.addr).await
    }
}

/// A relay (contact closure) connector
pub struct Relay<C: Connector> {
    gc100: Gc100<C>,
    addr: ConnectorAddress,
}

impl<C: Connector> Relay<C> {
    pub fn new(gc100: Gc100<C>, addr: impl Into<ConnectorAddress>) -> Self {
        Self {
            gc100,
            addr: addr.into(),
        }
    }

    pub async fn set(&self, active: bool) -> Gc100Result<PortState> {
        self.gc100.setstate(&self.addr, active).await
    }
}

/// An IR connector configured as a digital sensor input.
///
/// Unsolicited `statechange` notifications (SENSOR_NOTIFY) need a command
/// connection held open and are not delivered; poll with [`get_state`](Self::get_state).
pub struct DigitalInput<C: Connector> {
    gc100: Gc100<C>,
    addr: ConnectorAddress,
}

impl<C: Connector> DigitalInput<C> {
    pub fn new(gc100: Gc100<C>, addr: impl Into<ConnectorAddress>) -> Self {
        Self {
            gc100,
            addr: addr.into(),
        }
    }

    pub async fn get_ir(&self) -> Gc100Result<IrConfig> {
        self.gc100.get_ir(&self.addr).await
    }

    pub async fn get_state(&self) -> Gc100Result<PortState> {
        self.gc100.getstate(&self.addr).await
    }
}
