//! Command-channel client for one GC-100 unit.
//!
//! Every operation opens a fresh connection to the command port, sends one
//! command, optionally reads the response(s), closes the connection, and then
//! waits out a short cool-down. A single gate per endpoint keeps these
//! lifetimes from overlapping: the device treats a second command as an
//! interruption of a running one (e.g. a repeating `sendir`), and responses of
//! interleaved commands could not be told apart.
//!
//! The gate has a cost: a long repeating `sendir` blocks every other command,
//! including the `stopir` meant to cancel it, until it finishes.
//!
//! The protocol carries no correlation id. Another client talking to the same
//! unit outside this gate can desynchronise responses, and nothing here can
//! detect it.

use crate::core::serial::SerialChannel;
use crate::core::session::{Exchange, Reply, TransportSession};
use crate::domain::command::{
    BaudRate, Command, ConnectorAddress, FlowControl, IrMode, Parity, SendIr,
};
use crate::domain::config::{
    DeviceConfig, GlobalConfig, DEFAULT_COMMAND_PORT, DEFAULT_COOLDOWN, DEFAULT_SERIAL_BASE_PORT,
    MIN_SEND_PACING,
};
use crate::domain::error::{Gc100Error, Gc100Result};
use crate::domain::response::{
    DeviceInfo, IrConfig, NetConfig, PortState, SerialSettings, VersionInfo, DEVICE_TOKEN,
    END_LIST_DEVICES,
};
use crate::infrastructure::tcp::{Connector, TcpConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Tunables for one endpoint
#[derive(Debug, Clone)]
pub struct EndpointOptions {
    pub command_port: u16,
    pub serial_base_port: u16,
    /// Pause after each command connection closes
    pub cooldown: Duration,
    /// Spacing between serial bridge writes; clamped to [`MIN_SEND_PACING`]
    pub send_pacing: Duration,
    pub strict_framing: bool,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            command_port: DEFAULT_COMMAND_PORT,
            serial_base_port: DEFAULT_SERIAL_BASE_PORT,
            cooldown: DEFAULT_COOLDOWN,
            send_pacing: MIN_SEND_PACING,
            strict_framing: true,
        }
    }
}

impl EndpointOptions {
    pub fn from_config(device: &DeviceConfig, global: &GlobalConfig) -> Self {
        Self {
            command_port: device.command_port,
            serial_base_port: device.serial_base_port,
            cooldown: global.cooldown(),
            send_pacing: global.send_pacing(),
            strict_framing: global.strict_framing,
        }
    }
}

/// Handle to one GC-100 endpoint.
///
/// Clones share the command gate, so all clones are serialized against each other.
pub struct Gc100<C: Connector = TcpConnector> {
    connector: Arc<C>,
    options: EndpointOptions,
    gate: Arc<Mutex<()>>,
}

impl<C: Connector> Clone for Gc100<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            options: self.options.clone(),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl Gc100<TcpConnector> {
    /// Endpoint on `host` with default ports and timings
    pub fn connect_tcp(host: impl Into<String>, command_port: u16) -> Self {
        let options = EndpointOptions {
            command_port,
            ..EndpointOptions::default()
        };
        Self::new(TcpConnector::new(host, Duration::from_secs(3)), options)
    }

    pub fn from_config(device: &DeviceConfig, global: &GlobalConfig) -> Self {
        Self::new(
            TcpConnector::new(device.host.clone(), global.connect_timeout()),
            EndpointOptions::from_config(device, global),
        )
    }
}

impl<C: Connector> Gc100<C> {
    pub fn new(connector: C, mut options: EndpointOptions) -> Self {
        options.send_pacing = options.send_pacing.max(MIN_SEND_PACING);
        Self {
            connector: Arc::new(connector),
            options,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn host(&self) -> &str {
        self.connector.host()
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    pub(crate) fn connector(&self) -> Arc<C> {
        Arc::clone(&self.connector)
    }

    /// Run one full connect/exchange/close cycle under the endpoint gate.
    ///
    /// Waiting for the gate can be cancelled. Once the gate is held, the cycle
    /// runs in its own task that owns the gate guard, so close and cool-down
    /// still complete (and the gate is released) if the caller goes away.
    async fn execute(&self, command: Command, exchange: Exchange) -> Gc100Result<Reply> {
        let guard = Arc::clone(&self.gate).lock_owned().await;
        let connector = Arc::clone(&self.connector);
        let port = self.options.command_port;
        let cooldown = self.options.cooldown;
        let strict = self.options.strict_framing;

        let task = tokio::spawn(async move {
            let _guard = guard;
            debug!("Command '{}' to {}:{}", command.verb(), connector.host(), port);

            let stream = connector.connect(port).await?;
            let mut session = TransportSession::new(stream, strict);
            let result = session.exchange(&command, &exchange).await;
            let closed = session.close().await;
            tokio::time::sleep(cooldown).await;

            if let Err(e) = &closed {
                warn!("Failed to close command connection: {}", e);
            }
            let reply = result?;
            closed?;
            Ok(reply)
        });

        task.await.map_err(|e| Gc100Error::Task(e.to_string()))?
    }

    /// Send a command that has no response
    pub async fn raw_command(&self, command: Command) -> Gc100Result<()> {
        self.execute(command, Exchange::Command).await.map(|_| ())
    }

    /// Send a command and return its single response frame
    pub async fn raw_request(&self, command: Command) -> Gc100Result<String> {
        match self.execute(command, Exchange::Request).await? {
            Reply::Frame(frame) => Ok(frame),
            other => Err(Gc100Error::Protocol(format!("Unexpected reply: {:?}", other))),
        }
    }

    /// Send a command answered by `item` frames up to an `end` marker
    pub async fn request_list(
        &self,
        command: Command,
        item: &'static str,
        end: &'static str,
    ) -> Gc100Result<Vec<String>> {
        match self.execute(command, Exchange::List { item, end }).await? {
            Reply::Frames(frames) => Ok(frames),
            other => Err(Gc100Error::Protocol(format!("Unexpected reply: {:?}", other))),
        }
    }

    /// Start (`true`) or stop blinking the power light
    pub async fn blink(&self, on: bool) -> Gc100Result<()> {
        self.raw_command(Command::blink(on)).await
    }

    /// Installed modules, in the order the device lists them
    pub async fn getdevices(&self) -> Gc100Result<Vec<DeviceInfo>> {
        self.request_list(Command::getdevices(), DEVICE_TOKEN, END_LIST_DEVICES)
            .await?
            .into_iter()
            .map(|frame| DeviceInfo::parse(&frame))
            .collect()
    }

    pub async fn get_ir(&self, addr: &ConnectorAddress) -> Gc100Result<IrConfig> {
        IrConfig::parse(&self.raw_request(Command::get_ir(addr)).await?)
    }

    pub async fn get_net(&self) -> Gc100Result<NetConfig> {
        NetConfig::parse(&self.raw_request(Command::get_net()).await?)
    }

    pub async fn get_serial(&self, addr: &ConnectorAddress) -> Gc100Result<SerialSettings> {
        SerialSettings::parse(&self.raw_request(Command::get_serial(addr)).await?)
    }

    pub async fn getstate(&self, addr: &ConnectorAddress) -> Gc100Result<PortState> {
        PortState::parse(&self.raw_request(Command::getstate(addr)).await?)
    }

    /// Version of module `module` (1, 2, 3...); not a connector address
    pub async fn getversion(&self, module: u8) -> Gc100Result<VersionInfo> {
        VersionInfo::parse(&self.raw_request(Command::getversion(module)).await?)
    }

    /// Blast IR and return the raw `completeir` response
    pub async fn sendir(&self, params: &SendIr) -> Gc100Result<String> {
        self.raw_request(Command::sendir(params)).await
    }

    pub async fn setstate(&self, addr: &ConnectorAddress, active: bool) -> Gc100Result<PortState> {
        PortState::parse(&self.raw_request(Command::setstate(addr, active)).await?)
    }

    pub async fn set_ir(&self, addr: &ConnectorAddress, mode: IrMode) -> Gc100Result<()> {
        self.raw_command(Command::set_ir(addr, mode)).await
    }

    /// Changing the network settings could move the unit out from under
    /// this client, so it is refused; use the web interface instead.
    pub async fn set_net(&self) -> Gc100Result<()> {
        Err(Gc100Error::Unsupported(
            "set_NET: change network settings through the device web interface".to_string(),
        ))
    }

    pub async fn set_serial(
        &self,
        addr: &ConnectorAddress,
        baud: BaudRate,
        flow: FlowControl,
        parity: Parity,
    ) -> Gc100Result<()> {
        self.raw_command(Command::set_serial(addr, baud, flow, parity)).await
    }

    pub async fn stopir(&self, addr: &ConnectorAddress) -> Gc100Result<()> {
        self.raw_command(Command::stopir(addr)).await
    }

    /// Serial bridge for connector `addr`, on port `serial_base_port + index`
    pub fn serial_channel(&self, addr: impl Into<ConnectorAddress>, index: u16) -> SerialChannel<C> {
        SerialChannel::new(self.clone(), addr.into(), index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_net_unsupported() {
        let gc = Gc100::connect_tcp("127.0.0.1", 4998);
        let err = gc.set_net().await.unwrap_err();
        assert_eq!(err.kind(), crate::domain::error::ErrorKind::Unsupported);
    }

    #[test]
    fn test_pacing_floor_applied() {
        let options = EndpointOptions {
            send_pacing: Duration::from_millis(1),
            ..EndpointOptions::default()
        };
        let gc = Gc100::new(TcpConnector::new("127.0.0.1", Duration::from_secs(1)), options);
        assert_eq!(gc.options().send_pacing, MIN_SEND_PACING);
    }

    #[test]
    fn test_options_from_config() {
        let mut device = DeviceConfig::new("den", "10.0.0.5");
        device.command_port = 5000;
        let mut global = GlobalConfig::default();
        global.cooldown_ms = 50;
        global.strict_framing = false;

        let options = EndpointOptions::from_config(&device, &global);
        assert_eq!(options.command_port, 5000);
        assert_eq!(options.cooldown, Duration::from_millis(50));
        assert!(!options.strict_framing);
    }
}
