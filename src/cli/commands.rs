use crate::cli::args::{
    Args, BridgeArgs, Command, ConfigCommand, DataFormat, IrCommand, RelayCommand,
    SerialCommand, StateCommand,
};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::gc100::Gc100;
use crate::core::serial::SerialChannel;
use crate::domain::command::{BaudRate, ConnectorAddress, SendIr, CR};
use crate::domain::config::{DeviceConfig, Gc100Config};
use crate::domain::error::{Gc100Error, Gc100Result};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::tcp::TcpConnector;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Execute CLI command
pub async fn execute_command(args: Args) -> Gc100Result<()> {
    let writer = ConsoleWriter::new(args.output.clone());

    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };

    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    if let Command::Config(config_args) = &args.command {
        return execute_config_command(&config_args.command, &writer, &config, &config_manager);
    }

    let device = resolve_device(&args, &config)?;
    debug!("Using device '{}' at {}:{}", device.name, device.host, device.command_port);
    let gc = Gc100::from_config(&device, &config.global);

    match args.command {
        Command::Devices => {
            let modules = gc.getdevices().await?;
            writer.write_modules(&modules)?;
        }
        Command::Version { module } => {
            writer.write_record(&gc.getversion(module).await?)?;
        }
        Command::Net => {
            writer.write_record(&gc.get_net().await?)?;
        }
        Command::Blink { state } => {
            gc.blink(state.into()).await?;
            writer.write_message("OK")?;
        }
        Command::Ir(ir_args) => execute_ir_command(ir_args.command, &writer, &gc).await?,
        Command::State(state_args) => match state_args.command {
            StateCommand::Get { addr } => {
                writer.write_record(&gc.getstate(&addr.into()).await?)?;
            }
        },
        Command::Relay(relay_args) => match relay_args.command {
            RelayCommand::Set { addr, state } => {
                writer.write_record(&gc.setstate(&addr.into(), state.into()).await?)?;
            }
        },
        Command::Serial(serial_args) => {
            execute_serial_command(serial_args.command, &writer, &gc, &device).await?
        }
        Command::Config(_) => {}
    }
    Ok(())
}

/// Pick the target unit: `--host` first, then `--device`, then the only configured device
fn resolve_device(args: &Args, config: &Gc100Config) -> Gc100Result<DeviceConfig> {
    if let Some(host) = &args.host {
        let mut device = args
            .device
            .as_deref()
            .and_then(|name| config.device(name))
            .cloned()
            .unwrap_or_else(|| DeviceConfig::new("cli", host.clone()));
        device.host = host.clone();
        device.command_port = args.port;
        return Ok(device);
    }

    if let Some(name) = &args.device {
        return config.device(name).cloned().ok_or_else(|| {
            Gc100Error::InvalidInput(format!("Device '{}' not found in configuration", name))
        });
    }

    match config.devices.as_slice() {
        [device] => Ok(device.clone()),
        [] => Err(Gc100Error::InvalidInput(
            "No device given: use --host or add one to the configuration".to_string(),
        )),
        _ => Err(Gc100Error::InvalidInput(
            "Several devices configured: choose one with --device".to_string(),
        )),
    }
}

async fn execute_ir_command(
    command: IrCommand,
    writer: &ConsoleWriter,
    gc: &Gc100,
) -> Gc100Result<()> {
    match command {
        IrCommand::Get { addr } => {
            writer.write_record(&gc.get_ir(&addr.into()).await?)?;
        }
        IrCommand::Set { addr, mode } => {
            gc.set_ir(&addr.into(), mode.into()).await?;
            writer.write_message("OK")?;
        }
        IrCommand::Send { addr, freq, code, id, count, offset } => {
            let params = SendIr::new(addr, freq, code)
                .with_id(id)
                .with_count(count)
                .with_offset(offset);
            writer.write_record(&gc.sendir(&params).await?)?;
        }
        IrCommand::Stop { addr } => {
            gc.stopir(&addr.into()).await?;
            writer.write_message("OK")?;
        }
    }
    Ok(())
}

async fn execute_serial_command(
    command: SerialCommand,
    writer: &ConsoleWriter,
    gc: &Gc100,
    device: &DeviceConfig,
) -> Gc100Result<()> {
    match command {
        SerialCommand::Get { addr } => {
            writer.write_record(&gc.get_serial(&addr.into()).await?)?;
        }
        SerialCommand::Set { addr, baud, flow, parity } => {
            gc.set_serial(&addr.into(), BaudRate::new(baud)?, flow.into(), parity.into())
                .await?;
            writer.write_message("OK")?;
        }
        SerialCommand::Send { data, bridge, format, cr } => {
            let mut payload = parse_data(&data, format)?;
            if cr {
                payload.push(CR);
            }
            let channel = open_bridge(gc, device, &bridge);
            channel.connect().await?;
            let sent = channel.send(&payload).await;
            let closed = channel.disconnect().await;
            sent?;
            closed?;
            writer.write_message(&format!("Sent {} bytes to {}", payload.len(), channel.addr()))?;
        }
        SerialCommand::Listen { bridge, timeout, lines } => {
            let channel = open_bridge(gc, device, &bridge);
            channel.connect().await?;
            writer.write_message(&format!(
                "Listening on {} (port {}), Ctrl+C to stop",
                channel.addr(),
                channel.port()
            ))?;

            let listened = listen(&channel, writer, timeout, lines).await;
            let closed = channel.disconnect().await;
            listened?;
            closed?;
        }
    }
    Ok(())
}

fn open_bridge(gc: &Gc100, device: &DeviceConfig, bridge: &BridgeArgs) -> SerialChannel<TcpConnector> {
    let index = bridge.index.unwrap_or_else(|| bridge_index(device, &bridge.addr));
    gc.serial_channel(ConnectorAddress::new(bridge.addr.clone()), index)
}

/// Configured bridge index for `addr`, or the first bridge
fn bridge_index(device: &DeviceConfig, addr: &str) -> u16 {
    device
        .serial_ports
        .iter()
        .find(|port| port.addr == addr)
        .map(|port| port.index)
        .unwrap_or(0)
}

async fn listen(
    channel: &SerialChannel<TcpConnector>,
    writer: &ConsoleWriter,
    timeout: u64,
    lines: bool,
) -> Gc100Result<()> {
    let deadline = async {
        if timeout == 0 {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(Duration::from_secs(timeout)).await
        }
    };
    tokio::pin!(deadline);

    loop {
        let received = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = &mut deadline => return Ok(()),
            received = next_chunk(channel, lines) => received?,
        };

        match received {
            Some(data) => writer.write_data(&data)?,
            None => {
                writer.write_message("Connection closed by device")?;
                return Ok(());
            }
        }
    }
}

async fn next_chunk(channel: &SerialChannel<TcpConnector>, lines: bool) -> Gc100Result<Option<Vec<u8>>> {
    if lines {
        Ok(channel.receive_frame().await?.map(String::into_bytes))
    } else {
        channel.receive(1024).await
    }
}

fn execute_config_command(
    command: &ConfigCommand,
    writer: &ConsoleWriter,
    config: &Gc100Config,
    config_manager: &ConfigManager,
) -> Gc100Result<()> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
        }
        ConfigCommand::Init { path } => {
            let written = config_manager.init_project_config(Path::new(path))?;
            writer.write_message(&format!("Created {}", written.display()))?;
        }
        ConfigCommand::Devices => {
            writer.write_devices(&config.devices)?;
        }
    }
    Ok(())
}

fn parse_data(data: &str, format: DataFormat) -> Gc100Result<Vec<u8>> {
    match format {
        DataFormat::Text => Ok(data.as_bytes().to_vec()),
        DataFormat::Hex => {
            let cleaned = data.replace(' ', "").replace('\n', "");
            hex::decode(&cleaned)
                .map_err(|e| Gc100Error::InvalidInput(format!("Invalid hex data: {}", e)))
        }
        DataFormat::Base64 => {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| Gc100Error::InvalidInput(format!("Invalid base64 data: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::SerialPortConfig;
    use clap::Parser;

    #[test]
    fn test_parse_data_formats() {
        assert_eq!(parse_data("PWR ON", DataFormat::Text).unwrap(), b"PWR ON");
        assert_eq!(parse_data("0d 0a", DataFormat::Hex).unwrap(), vec![0x0d, 0x0a]);
        assert_eq!(parse_data("T0s=", DataFormat::Base64).unwrap(), b"OK");
        assert!(parse_data("zz", DataFormat::Hex).is_err());
    }

    #[test]
    fn test_bridge_index_lookup() {
        let mut device = DeviceConfig::new("den", "10.0.0.5");
        device.serial_ports.push(SerialPortConfig { index: 1, addr: "2:1".to_string() });
        assert_eq!(bridge_index(&device, "2:1"), 1);
        assert_eq!(bridge_index(&device, "1:1"), 0);
    }

    #[test]
    fn test_resolve_device_precedence() {
        let mut config = Gc100Config::default();
        config.devices.push(DeviceConfig::new("den", "10.0.0.5"));

        let args = Args::try_parse_from(["gc100", "devices"]).unwrap();
        assert_eq!(resolve_device(&args, &config).unwrap().host, "10.0.0.5");

        let args = Args::try_parse_from(["gc100", "--host", "10.0.0.9", "-p", "5000", "devices"]).unwrap();
        let device = resolve_device(&args, &config).unwrap();
        assert_eq!(device.host, "10.0.0.9");
        assert_eq!(device.command_port, 5000);

        let args = Args::try_parse_from(["gc100", "--device", "attic", "devices"]).unwrap();
        assert!(matches!(resolve_device(&args, &config), Err(Gc100Error::InvalidInput(_))));

        let empty = Gc100Config::default();
        let args = Args::try_parse_from(["gc100", "devices"]).unwrap();
        assert!(resolve_device(&args, &empty).is_err());
    }
}
