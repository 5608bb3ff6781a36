//! GC100 Library
//!
//! Client protocol engine for Global Cache GC-100 gateways: a serialized,
//! connect-per-command channel for IR, relay, sensor and configuration
//! commands, and persistent paced bridges to the unit's serial connectors.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::gc100::{EndpointOptions, Gc100};
pub use crate::core::modules::{DigitalInput, IrOutput, Relay};
pub use crate::core::serial::{SerialChannel, SessionState};
pub use domain::command::{BaudRate, Command, ConnectorAddress, FlowControl, IrMode, Parity, SendIr};
pub use domain::config::Gc100Config;
pub use domain::error::{CommandError, ErrorKind, Gc100Error, Gc100Result};
pub use infrastructure::tcp::{Connector, TcpConnector};
