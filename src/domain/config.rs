use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default command port of the GC-100
pub const DEFAULT_COMMAND_PORT: u16 = 4998;

/// Serial bridge ports are `base + index`
pub const DEFAULT_SERIAL_BASE_PORT: u16 = 4999;

/// Pause after closing a command connection before the next one may open
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(10);

/// Minimum spacing between serial bridge writes; the device reboots below this
pub const MIN_SEND_PACING: Duration = Duration::from_millis(10);

/// GC100 configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gc100Config {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Device configurations
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Cool-down after each command connection closes, in milliseconds
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,
    /// Spacing between serial bridge writes, in milliseconds (never below 10)
    #[serde(default = "default_send_pacing")]
    pub send_pacing_ms: u64,
    /// Fail instead of returning a partial frame when the device closes mid-frame
    #[serde(default = "default_strict_framing")]
    pub strict_framing: bool,
}

/// One GC-100 unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name
    pub name: String,
    /// Device description
    #[serde(default)]
    pub description: String,
    /// Host name or IPv4 address
    pub host: String,
    #[serde(default = "default_command_port")]
    pub command_port: u16,
    #[serde(default = "default_serial_base_port")]
    pub serial_base_port: u16,
    /// Known serial bridges on this unit
    #[serde(default)]
    pub serial_ports: Vec<SerialPortConfig>,
}

/// A serial connector and its bridge index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortConfig {
    /// Zero-based bridge index (port = base + index)
    pub index: u16,
    /// Connector address, e.g. `1:1`
    pub addr: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_connect_timeout() -> u64 {
    3000
}

fn default_cooldown() -> u64 {
    DEFAULT_COOLDOWN.as_millis() as u64
}

fn default_send_pacing() -> u64 {
    MIN_SEND_PACING.as_millis() as u64
}

fn default_strict_framing() -> bool {
    true
}

fn default_command_port() -> u16 {
    DEFAULT_COMMAND_PORT
}

fn default_serial_base_port() -> u16 {
    DEFAULT_SERIAL_BASE_PORT
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            connect_timeout_ms: default_connect_timeout(),
            cooldown_ms: default_cooldown(),
            send_pacing_ms: default_send_pacing(),
            strict_framing: default_strict_framing(),
        }
    }
}

impl GlobalConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Configured pacing, clamped to [`MIN_SEND_PACING`]
    pub fn send_pacing(&self) -> Duration {
        Duration::from_millis(self.send_pacing_ms).max(MIN_SEND_PACING)
    }
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            host: host.into(),
            command_port: DEFAULT_COMMAND_PORT,
            serial_base_port: DEFAULT_SERIAL_BASE_PORT,
            serial_ports: Vec::new(),
        }
    }
}

impl Gc100Config {
    /// Look up a device by name
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }
}
