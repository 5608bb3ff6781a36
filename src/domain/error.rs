use thiserror::Error;

/// Descriptions for the error codes reported in `unknowncommand <code>` responses.
const COMMAND_ERROR_TEXT: &[(u16, &str)] = &[
    (1, "Timeout: CR not received."),
    (2, "Invalid module address (getversion)"),
    (3, "Invalid module address (does not exist)"),
    (4, "Invalid connector address"),
    (5, "Attempt to send IR command on 'sensor-in' connector address 1"),
    (6, "Attempt to send IR command on 'sensor-in' connector address 2"),
    (7, "Attempt to send IR command on 'sensor-in' connector address 3"),
    (8, "Offset is set to even transition number (IR command)"),
    (9, "Exceeded maximum IR transitions (> 256)"),
    (10, "Non-even number of IR transitions"),
    (11, "Contact-closure command sent to non-relay module"),
    (12, "Missing CR"),
    (13, "State request to invalid or non-sensor IR address"),
    (14, "Unsupported command"),
    (15, "Exceeded maximum IR transitions (SM_IR_INPROCESS)"),
    (16, "Non-even number of IR transitions"),
    (21, "IR command sent to non-IR module"),
    (23, "Command not supported by module type"),
];

/// A command the device rejected, identified by its numeric error code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("({code}) {}", self.description())]
pub struct CommandError {
    pub code: u16,
}

impl CommandError {
    pub fn new(code: u16) -> Self {
        Self { code }
    }

    /// Fixed description for this code; gaps in the table read as "Unknown error"
    pub fn description(&self) -> &'static str {
        COMMAND_ERROR_TEXT
            .iter()
            .find(|(code, _)| *code == self.code)
            .map(|(_, text)| *text)
            .unwrap_or("Unknown error")
    }
}

/// GC100 unified error type
#[derive(Error, Debug)]
pub enum Gc100Error {
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Device command error: {0}")]
    Command(#[from] CommandError),

    #[error("Serial channel not connected")]
    NotConnected,

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Connection closed mid-frame with {pending} bytes pending")]
    ConnectionClosedMidFrame { pending: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Session task failed: {0}")]
    Task(String),
}

/// Coarse classification of [`Gc100Error`] for callers that branch on kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    DeviceCommand,
    NotConnected,
    Unsupported,
    Protocol,
    Config,
    Input,
}

impl Gc100Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Gc100Error::Transport(_) | Gc100Error::Timeout | Gc100Error::Task(_) => {
                ErrorKind::Transport
            }
            Gc100Error::Command(_) => ErrorKind::DeviceCommand,
            Gc100Error::NotConnected => ErrorKind::NotConnected,
            Gc100Error::Unsupported(_) => ErrorKind::Unsupported,
            Gc100Error::ConnectionClosedMidFrame { .. } | Gc100Error::Protocol(_) => {
                ErrorKind::Protocol
            }
            Gc100Error::Config { .. } => ErrorKind::Config,
            Gc100Error::InvalidInput(_) | Gc100Error::Output(_) => ErrorKind::Input,
        }
    }

    /// Device error code, if the device rejected the command
    pub fn command_code(&self) -> Option<u16> {
        match self {
            Gc100Error::Command(e) => Some(e.code),
            _ => None,
        }
    }
}

pub type Gc100Result<T> = Result<T, Gc100Error>;
