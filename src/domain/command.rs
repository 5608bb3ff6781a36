use crate::domain::error::{Gc100Error, Gc100Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame terminator for commands and responses
pub const CR: u8 = b'\r';

/// Field separator inside commands and well-formed responses
pub const SEP: char = ',';

/// Connector address in `module:port` form (e.g. `2:1`).
///
/// Passed through to the device verbatim; the device reports bad addresses itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorAddress(String);

impl ConnectorAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectorAddress {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

impl From<String> for ConnectorAddress {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}

/// IR connector mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrMode {
    #[serde(rename = "IR")]
    Ir,
    #[serde(rename = "SENSOR")]
    Sensor,
    #[serde(rename = "SENSOR_NOTIFY")]
    SensorNotify,
    #[serde(rename = "IR_NOCARRIER")]
    IrNoCarrier,
}

impl IrMode {
    pub fn as_token(&self) -> &'static str {
        match self {
            IrMode::Ir => "IR",
            IrMode::Sensor => "SENSOR",
            IrMode::SensorNotify => "SENSOR_NOTIFY",
            IrMode::IrNoCarrier => "IR_NOCARRIER",
        }
    }
}

impl fmt::Display for IrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for IrMode {
    type Err = Gc100Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IR" => Ok(IrMode::Ir),
            "SENSOR" => Ok(IrMode::Sensor),
            "SENSOR_NOTIFY" => Ok(IrMode::SensorNotify),
            "IR_NOCARRIER" => Ok(IrMode::IrNoCarrier),
            other => Err(Gc100Error::InvalidInput(format!("Unknown IR mode: {}", other))),
        }
    }
}

/// Serial flow control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    #[serde(rename = "FLOW_HARDWARE")]
    Hardware,
    #[serde(rename = "FLOW_NONE")]
    None,
}

impl FlowControl {
    pub fn as_token(&self) -> &'static str {
        match self {
            FlowControl::Hardware => "FLOW_HARDWARE",
            FlowControl::None => "FLOW_NONE",
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for FlowControl {
    type Err = Gc100Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FLOW_HARDWARE" => Ok(FlowControl::Hardware),
            "FLOW_NONE" => Ok(FlowControl::None),
            other => Err(Gc100Error::InvalidInput(format!("Unknown flow control: {}", other))),
        }
    }
}

/// Serial parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    #[serde(rename = "PARITY_NO")]
    No,
    #[serde(rename = "PARITY_ODD")]
    Odd,
    #[serde(rename = "PARITY_EVEN")]
    Even,
}

impl Parity {
    pub fn as_token(&self) -> &'static str {
        match self {
            Parity::No => "PARITY_NO",
            Parity::Odd => "PARITY_ODD",
            Parity::Even => "PARITY_EVEN",
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for Parity {
    type Err = Gc100Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PARITY_NO" => Ok(Parity::No),
            "PARITY_ODD" => Ok(Parity::Odd),
            "PARITY_EVEN" => Ok(Parity::Even),
            other => Err(Gc100Error::InvalidInput(format!("Unknown parity: {}", other))),
        }
    }
}

/// Baud rates supported by the serial module
pub const BAUD_RATES: [u32; 7] = [1200, 2400, 4800, 9600, 19200, 38400, 57600];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BaudRate(u32);

impl BaudRate {
    pub fn new(rate: u32) -> Gc100Result<Self> {
        if BAUD_RATES.contains(&rate) {
            Ok(Self(rate))
        } else {
            Err(Gc100Error::InvalidInput(format!("Unsupported baud rate: {}", rate)))
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = Gc100Error;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        Self::new(rate)
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.0
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters of a `sendir` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendIr {
    pub addr: ConnectorAddress,
    pub id: u16,
    pub freq: u32,
    pub count: u16,
    pub offset: u16,
    /// Comma-separated on/off pulse pairs
    pub code: String,
}

impl SendIr {
    /// A single, non-repeating blast with the device's usual defaults
    pub fn new(addr: impl Into<ConnectorAddress>, freq: u32, code: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            id: 1,
            freq,
            count: 1,
            offset: 3,
            code: code.into(),
        }
    }

    pub fn with_id(mut self, id: u16) -> Self {
        self.id = id;
        self
    }

    pub fn with_count(mut self, count: u16) -> Self {
        self.count = count;
        self
    }

    pub fn with_offset(mut self, offset: u16) -> Self {
        self.offset = offset;
        self
    }
}

/// An outbound, CR-terminated command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    bytes: Vec<u8>,
}

impl Command {
    fn from_fields(verb: &str, fields: &[&str]) -> Self {
        let mut text = String::from(verb);
        for field in fields {
            text.push(SEP);
            text.push_str(field);
        }
        let mut bytes = text.into_bytes();
        bytes.push(CR);
        Self { bytes }
    }

    /// Wrap preformatted command bytes, appending the terminator if missing
    pub fn raw(data: impl Into<Vec<u8>>) -> Self {
        let mut bytes = data.into();
        if bytes.last() != Some(&CR) {
            bytes.push(CR);
        }
        Self { bytes }
    }

    pub fn getdevices() -> Self {
        Self::from_fields("getdevices", &[])
    }

    pub fn get_ir(addr: &ConnectorAddress) -> Self {
        Self::from_fields("get_IR", &[addr.as_str()])
    }

    pub fn get_net() -> Self {
        Self::from_fields("get_NET", &["0:1"])
    }

    pub fn get_serial(addr: &ConnectorAddress) -> Self {
        Self::from_fields("get_SERIAL", &[addr.as_str()])
    }

    pub fn getstate(addr: &ConnectorAddress) -> Self {
        Self::from_fields("getstate", &[addr.as_str()])
    }

    /// `module` is a module index (1, 2, 3...), not a connector address
    pub fn getversion(module: u8) -> Self {
        Self::from_fields("getversion", &[&module.to_string()])
    }

    pub fn sendir(params: &SendIr) -> Self {
        Self::from_fields(
            "sendir",
            &[
                params.addr.as_str(),
                &params.id.to_string(),
                &params.freq.to_string(),
                &params.count.to_string(),
                &params.offset.to_string(),
                &params.code,
            ],
        )
    }

    pub fn setstate(addr: &ConnectorAddress, active: bool) -> Self {
        Self::from_fields("setstate", &[addr.as_str(), if active { "1" } else { "0" }])
    }

    pub fn set_ir(addr: &ConnectorAddress, mode: IrMode) -> Self {
        Self::from_fields("set_IR", &[addr.as_str(), mode.as_token()])
    }

    pub fn set_serial(
        addr: &ConnectorAddress,
        baud: BaudRate,
        flow: FlowControl,
        parity: Parity,
    ) -> Self {
        Self::from_fields(
            "set_SERIAL",
            &[addr.as_str(), &baud.to_string(), flow.as_token(), parity.as_token()],
        )
    }

    pub fn stopir(addr: &ConnectorAddress) -> Self {
        Self::from_fields("stopir", &[addr.as_str()])
    }

    pub fn blink(on: bool) -> Self {
        Self::from_fields("blink", &[if on { "1" } else { "0" }])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Command verb, for logging
    pub fn verb(&self) -> &str {
        let end = self
            .bytes
            .iter()
            .position(|b| *b == b',' || *b == CR)
            .unwrap_or(self.bytes.len());
        std::str::from_utf8(&self.bytes[..end]).unwrap_or("<binary>")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = &self.bytes[..self.bytes.len().saturating_sub(1)];
        write!(f, "{}", String::from_utf8_lossy(body))
    }
}
