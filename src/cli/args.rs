use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for GC100
#[derive(Parser, Debug)]
#[command(
    name = "gc100",
    version = env!("CARGO_PKG_VERSION"),
    about = "Command-line client for Global Cache GC-100 gateways",
    long_about = "Query and control a Global Cache GC-100: list modules, drive IR and relay connectors, read sensors, and bridge serial ports over TCP."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Device host name or IPv4 address (overrides --device)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Command port, used with --host
    #[arg(short, long, global = true, default_value = "4998")]
    pub port: u16,

    /// Named device from the configuration file
    #[arg(short, long, global = true)]
    pub device: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List installed modules
    Devices,
    /// Show the firmware version of a module (index 1, 2, 3...; not a connector address)
    Version {
        module: u8,
    },
    /// Show the network configuration
    Net,
    /// Blink the power light, or stop blinking it
    Blink {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// IR connector commands
    Ir(IrArgs),
    /// Digital sensor input commands
    State(StateArgs),
    /// Relay commands
    Relay(RelayArgs),
    /// Serial connector and bridge commands
    Serial(SerialArgs),
    /// Configuration management commands
    Config(ConfigArgs),
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// On/off argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        toggle == Toggle::On
    }
}

#[derive(ClapArgs, Debug)]
pub struct IrArgs {
    #[command(subcommand)]
    pub command: IrCommand,
}

#[derive(ClapArgs, Debug)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(ClapArgs, Debug)]
pub struct RelayArgs {
    #[command(subcommand)]
    pub command: RelayCommand,
}

#[derive(ClapArgs, Debug)]
pub struct SerialArgs {
    #[command(subcommand)]
    pub command: SerialCommand,
}

#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// IR subcommands
#[derive(Subcommand, Debug)]
pub enum IrCommand {
    /// Show the mode of an IR connector
    Get {
        /// Connector address (module:port)
        addr: String,
    },
    /// Set the mode of an IR connector
    Set {
        addr: String,
        #[arg(value_enum)]
        mode: IrModeArg,
    },
    /// Send an IR code
    Send {
        addr: String,
        /// Carrier frequency in Hz
        #[arg(short, long)]
        freq: u32,
        /// Comma-separated on/off pulse counts
        #[arg(long)]
        code: String,
        /// Request id echoed in the completion
        #[arg(long, default_value = "1")]
        id: u16,
        /// Repeat count
        #[arg(long, default_value = "1")]
        count: u16,
        /// Repeat offset
        #[arg(long, default_value = "3")]
        offset: u16,
    },
    /// Stop a repeating IR transmission
    Stop {
        addr: String,
    },
}

/// Sensor subcommands
#[derive(Subcommand, Debug)]
pub enum StateCommand {
    /// Read a digital input
    Get {
        addr: String,
    },
}

/// Relay subcommands
#[derive(Subcommand, Debug)]
pub enum RelayCommand {
    /// Close (on) or open (off) a relay
    Set {
        addr: String,
        #[arg(value_enum)]
        state: Toggle,
    },
}

/// Serial subcommands
#[derive(Subcommand, Debug)]
pub enum SerialCommand {
    /// Show serial settings of a connector
    Get {
        addr: String,
    },
    /// Change serial settings of a connector
    Set {
        addr: String,
        #[arg(short, long, default_value = "9600")]
        baud: u32,
        #[arg(long, value_enum, default_value = "none")]
        flow: FlowControlArg,
        #[arg(long, value_enum, default_value = "none")]
        parity: ParityArg,
    },
    /// Send data through a serial bridge
    Send {
        /// Data to send (hex or text)
        data: String,
        #[command(flatten)]
        bridge: BridgeArgs,
        /// Data format (hex, text, base64)
        #[arg(short, long, value_enum, default_value = "text")]
        format: DataFormat,
        /// Append a CR to text payloads
        #[arg(long)]
        cr: bool,
    },
    /// Print data received on a serial bridge
    Listen {
        #[command(flatten)]
        bridge: BridgeArgs,
        /// Stop after this many seconds (0 = until Ctrl+C)
        #[arg(short, long, default_value = "0")]
        timeout: u64,
        /// Print CR-terminated lines instead of raw chunks
        #[arg(long)]
        lines: bool,
    },
}

/// Which serial bridge to use
#[derive(ClapArgs, Debug)]
pub struct BridgeArgs {
    /// Connector address of the serial port
    #[arg(short, long, default_value = "1:1")]
    pub addr: String,
    /// Bridge index (port = base + index); looked up from the configuration when omitted
    #[arg(short, long)]
    pub index: Option<u16>,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Create an example project configuration
    Init {
        /// Directory to create `.gc100/config.toml` in
        #[arg(long, default_value = ".")]
        path: String,
    },
    /// List configured devices
    Devices,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum IrModeArg {
    Ir,
    Sensor,
    SensorNotify,
    IrNocarrier,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum FlowControlArg {
    None,
    Hardware,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ParityArg {
    None,
    Odd,
    Even,
}

/// Data format argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DataFormat {
    Text,
    Hex,
    Base64,
}

impl From<IrModeArg> for crate::domain::command::IrMode {
    fn from(mode: IrModeArg) -> Self {
        match mode {
            IrModeArg::Ir => Self::Ir,
            IrModeArg::Sensor => Self::Sensor,
            IrModeArg::SensorNotify => Self::SensorNotify,
            IrModeArg::IrNocarrier => Self::IrNoCarrier,
        }
    }
}

impl From<FlowControlArg> for crate::domain::command::FlowControl {
    fn from(flow: FlowControlArg) -> Self {
        match flow {
            FlowControlArg::None => Self::None,
            FlowControlArg::Hardware => Self::Hardware,
        }
    }
}

impl From<ParityArg> for crate::domain::command::Parity {
    fn from(parity: ParityArg) -> Self {
        match parity {
            ParityArg::None => Self::No,
            ParityArg::Odd => Self::Odd,
            ParityArg::Even => Self::Even,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
