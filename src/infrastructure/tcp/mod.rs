// TCP module - Connections to the device
pub mod connector;

pub use connector::{Connector, TcpConnector};
