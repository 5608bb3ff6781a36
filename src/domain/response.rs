//! Typed views of the comma-separated responses returned by the device.

use crate::domain::command::{ConnectorAddress, FlowControl, IrMode, Parity, SEP};
use crate::domain::error::{Gc100Error, Gc100Result};
use serde::Serialize;

/// Response type token for each list item of `getdevices`
pub const DEVICE_TOKEN: &str = "device";

/// Terminal frame of the `getdevices` list
pub const END_LIST_DEVICES: &str = "endlistdevices";

/// Split `frame` on commas, requiring `token` as the first field and at least `fields` more
fn fields<'a>(frame: &'a str, token: &str, fields: usize) -> Gc100Result<Vec<&'a str>> {
    let parts: Vec<&str> = frame.split(SEP).collect();
    if parts.first() != Some(&token) {
        return Err(Gc100Error::Protocol(format!(
            "Expected '{}' response, got '{}'",
            token, frame
        )));
    }
    if parts.len() < fields + 1 {
        return Err(Gc100Error::Protocol(format!(
            "Truncated '{}' response: '{}'",
            token, frame
        )));
    }
    Ok(parts)
}

fn number<T: std::str::FromStr>(value: &str, frame: &str) -> Gc100Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Gc100Error::Protocol(format!("Invalid number '{}' in '{}'", value, frame)))
}

/// One installed module, from `device,<module>,<type>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub module: u8,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DeviceInfo {
    pub fn parse(frame: &str) -> Gc100Result<Self> {
        let parts = fields(frame, DEVICE_TOKEN, 2)?;
        Ok(Self {
            module: number(parts[1], frame)?,
            kind: parts[2].to_string(),
        })
    }
}

/// `IR,<addr>,<mode>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrConfig {
    pub addr: ConnectorAddress,
    pub mode: IrMode,
}

impl IrConfig {
    pub fn parse(frame: &str) -> Gc100Result<Self> {
        let parts = fields(frame, "IR", 2)?;
        Ok(Self {
            addr: parts[1].into(),
            mode: parts[2]
                .parse()
                .map_err(|_| Gc100Error::Protocol(format!("Unknown IR mode in '{}'", frame)))?,
        })
    }
}

/// `NET,<addr>,<lock>,<mode>,<ip>,<subnet>,<gateway>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetConfig {
    pub addr: ConnectorAddress,
    pub lock: String,
    pub mode: String,
    pub ip: String,
    pub subnet: String,
    pub gateway: String,
}

impl NetConfig {
    pub fn parse(frame: &str) -> Gc100Result<Self> {
        let parts = fields(frame, "NET", 6)?;
        Ok(Self {
            addr: parts[1].into(),
            lock: parts[2].to_string(),
            mode: parts[3].to_string(),
            ip: parts[4].to_string(),
            subnet: parts[5].to_string(),
            gateway: parts[6].to_string(),
        })
    }
}

/// `SERIAL,<addr>,<baud>,<flow>,<parity>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialSettings {
    pub addr: ConnectorAddress,
    pub baud: u32,
    pub flow: FlowControl,
    pub parity: Parity,
}

impl SerialSettings {
    pub fn parse(frame: &str) -> Gc100Result<Self> {
        let parts = fields(frame, "SERIAL", 4)?;
        let invalid = |what: &str| Gc100Error::Protocol(format!("Unknown {} in '{}'", what, frame));
        Ok(Self {
            addr: parts[1].into(),
            baud: number(parts[2], frame)?,
            flow: parts[3].parse().map_err(|_| invalid("flow control"))?,
            parity: parts[4].parse().map_err(|_| invalid("parity"))?,
        })
    }
}

/// `state,<addr>,<0|1>`, returned by both `getstate` and `setstate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortState {
    pub addr: ConnectorAddress,
    pub state: u8,
}

impl PortState {
    pub fn parse(frame: &str) -> Gc100Result<Self> {
        let parts = fields(frame, "state", 2)?;
        Ok(Self {
            addr: parts[1].into(),
            state: number(parts[2], frame)?,
        })
    }

    pub fn is_active(&self) -> bool {
        self.state != 0
    }
}

/// `version,<module>,<text>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub module: u8,
    pub text: String,
}

impl VersionInfo {
    pub fn parse(frame: &str) -> Gc100Result<Self> {
        let parts = fields(frame, "version", 2)?;
        Ok(Self {
            module: number(parts[1], frame)?,
            // Version text may itself contain commas
            text: parts[2..].join(","),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device() {
        let device = DeviceInfo::parse("device,2,RELAY").unwrap();
        assert_eq!(device, DeviceInfo { module: 2, kind: "RELAY".to_string() });
        assert!(DeviceInfo::parse("endlistdevices").is_err());
    }

    #[test]
    fn test_parse_state() {
        let state = PortState::parse("state,3:1,1").unwrap();
        assert_eq!(state.addr.as_str(), "3:1");
        assert!(state.is_active());
    }

    #[test]
    fn test_parse_net() {
        let net = NetConfig::parse("NET,0:1,LOCKED,STATIC,192.168.1.70,255.255.255.0,192.168.1.1").unwrap();
        assert_eq!(net.ip, "192.168.1.70");
        assert_eq!(net.gateway, "192.168.1.1");
        assert!(NetConfig::parse("NET,0:1,LOCKED").is_err());
    }

    #[test]
    fn test_parse_serial() {
        let serial = SerialSettings::parse("SERIAL,1:1,38400,FLOW_HARDWARE,PARITY_ODD").unwrap();
        assert_eq!(serial.baud, 38400);
        assert_eq!(serial.flow, FlowControl::Hardware);
        assert_eq!(serial.parity, Parity::Odd);
    }

    #[test]
    fn test_parse_ir_and_version() {
        let ir = IrConfig::parse("IR,4:3,SENSOR").unwrap();
        assert_eq!(ir.mode, IrMode::Sensor);
        let version = VersionInfo::parse("version,0,3.0-12").unwrap();
        assert_eq!(version.module, 0);
        assert_eq!(version.text, "3.0-12");
    }

    #[test]
    fn test_wrong_token_is_protocol_error() {
        let err = PortState::parse("IR,4:3,SENSOR").unwrap_err();
        assert!(matches!(err, Gc100Error::Protocol(_)));
    }

    #[test]
    fn test_non_numeric_field() {
        assert!(matches!(
            PortState::parse("state,3:1,x"),
            Err(Gc100Error::Protocol(_))
        ));
    }
}
