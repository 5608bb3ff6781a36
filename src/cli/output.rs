use crate::cli::args::OutputFormat;
use crate::domain::config::{DeviceConfig, Gc100Config};
use crate::domain::response::DeviceInfo;
use serde::Serialize;
use serde_json::Value;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_modules(&self, modules: &[DeviceInfo]) -> Result<(), OutputError>;
    fn write_record<T: Serialize>(&self, record: &T) -> Result<(), OutputError>;
    fn write_config(&self, config: &Gc100Config) -> Result<(), OutputError>;
    fn write_devices(&self, devices: &[DeviceConfig]) -> Result<(), OutputError>;
    fn write_data(&self, data: &[u8]) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::Gc100Error {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_modules(&self, modules: &[DeviceInfo]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for module in modules {
                    println!("Module {}: {}", module.module, module.kind);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(modules)?);
            }
            OutputFormat::Table => {
                if !modules.is_empty() {
                    let rows: Vec<ModuleTableRow> = modules.iter().map(ModuleTableRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_record<T: Serialize>(&self, record: &T) -> Result<(), OutputError> {
        let value = serde_json::to_value(record)?;
        match self.format {
            OutputFormat::Text => {
                for (field, value) in fields(&value) {
                    println!("{}: {}", field, value);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Table => {
                let rows: Vec<FieldTableRow> = fields(&value)
                    .into_iter()
                    .map(|(field, value)| FieldTableRow { field, value })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &Gc100Config) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("GC100 Configuration:");
                println!("  Log level: {}", config.global.log_level);
                println!("  Connect timeout: {}ms", config.global.connect_timeout_ms);
                println!("  Cool-down: {}ms", config.global.cooldown_ms);
                println!("  Serial send pacing: {}ms", config.global.send_pacing().as_millis());
                println!("  Strict framing: {}", config.global.strict_framing);

                if !config.devices.is_empty() {
                    println!("  Devices:");
                    for device in &config.devices {
                        println!("    {}: {}:{}", device.name, device.host, device.command_port);
                    }
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            OutputFormat::Table => {
                self.write_devices(&config.devices)?;
            }
        }
        Ok(())
    }

    fn write_devices(&self, devices: &[DeviceConfig]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for device in devices {
                    println!("Device: {}", device.name);
                    let desc = if device.description.is_empty() { "No description" } else { &device.description };
                    println!("  Description: {}", desc);
                    println!("  Host: {}:{}", device.host, device.command_port);
                    for port in &device.serial_ports {
                        println!(
                            "  Serial {}: port {}",
                            port.addr,
                            device.serial_base_port.saturating_add(port.index)
                        );
                    }
                    println!();
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(devices)?);
            }
            OutputFormat::Table => {
                if !devices.is_empty() {
                    let rows: Vec<DeviceTableRow> = devices.iter().map(DeviceTableRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_data(&self, data: &[u8]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "hex": hex::encode(data),
                    "text": String::from_utf8_lossy(data),
                });
                println!("{}", serde_json::to_string(&output)?);
            }
            _ => {
                println!("recv -> {:?}", String::from_utf8_lossy(data));
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// Flatten a JSON object into printable field/value pairs
fn fields(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect(),
        Value::String(s) => vec![("value".to_string(), s.clone())],
        other => vec![("value".to_string(), other.to_string())],
    }
}

/// Table row for installed modules
#[derive(Tabled)]
struct ModuleTableRow {
    #[tabled(rename = "Module")]
    module: u8,
    #[tabled(rename = "Type")]
    kind: String,
}

impl From<&DeviceInfo> for ModuleTableRow {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            module: info.module,
            kind: info.kind.clone(),
        }
    }
}

/// Table row for one field of a record
#[derive(Tabled)]
struct FieldTableRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Table row for configured devices
#[derive(Tabled)]
struct DeviceTableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Command Port")]
    command_port: u16,
    #[tabled(rename = "Serial Ports")]
    serial_ports: usize,
}

impl From<&DeviceConfig> for DeviceTableRow {
    fn from(device: &DeviceConfig) -> Self {
        Self {
            name: device.name.clone(),
            host: device.host.clone(),
            command_port: device.command_port,
            serial_ports: device.serial_ports.len(),
        }
    }
}
