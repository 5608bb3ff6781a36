use crate::core::classifier::check_response;
use crate::core::framer::ResponseFramer;
use crate::domain::command::{Command, SEP};
use crate::domain::error::{Gc100Error, Gc100Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// What a command expects back from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// Fire-and-forget; success is assumed once the write completes
    Command,
    /// Exactly one response frame
    Request,
    /// Frames of type `item` until the `end` marker
    List {
        item: &'static str,
        end: &'static str,
    },
}

/// Outcome of one exchange, shaped by its [`Exchange`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done,
    Frame(String),
    Frames(Vec<String>),
}

/// One command-channel connection: a stream plus a receive buffer of its own
pub struct TransportSession<S> {
    stream: S,
    framer: ResponseFramer,
}

impl<S> TransportSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, strict_framing: bool) -> Self {
        Self {
            stream,
            framer: ResponseFramer::new(strict_framing),
        }
    }

    pub async fn send(&mut self, command: &Command) -> Gc100Result<()> {
        trace!("-> {}", command);
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read one frame and fail if it is a device error
    pub async fn read_response(&mut self) -> Gc100Result<String> {
        let frame = self.framer.next_frame(&mut self.stream).await?;
        if frame.is_empty() && self.framer.peer_closed() {
            return Err(Gc100Error::Protocol(
                "Connection closed before response".to_string(),
            ));
        }
        trace!("<- {}", frame);
        check_response(&frame)?;
        Ok(frame)
    }

    /// Collect `item` frames, in arrival order, until the `end` frame.
    ///
    /// A device error anywhere in the list fails the whole read.
    pub async fn read_list(&mut self, item: &str, end: &str) -> Gc100Result<Vec<String>> {
        let mut frames = Vec::new();
        loop {
            let frame = self.framer.next_frame(&mut self.stream).await?;
            trace!("<- {}", frame);
            check_response(&frame)?;

            let token = frame.split(SEP).next().unwrap_or_default();
            if token == end {
                return Ok(frames);
            }
            if token == item {
                frames.push(frame);
            } else if self.framer.peer_closed() {
                return Err(Gc100Error::Protocol(format!(
                    "Connection closed before '{}'",
                    end
                )));
            } else {
                debug!("Ignoring unexpected frame in '{}' list: {}", item, frame);
            }
        }
    }

    pub async fn exchange(&mut self, command: &Command, exchange: &Exchange) -> Gc100Result<Reply> {
        self.send(command).await?;
        match exchange {
            Exchange::Command => Ok(Reply::Done),
            Exchange::Request => self.read_response().await.map(Reply::Frame),
            Exchange::List { item, end } => self.read_list(item, end).await.map(Reply::Frames),
        }
    }

    /// Shut the connection down and wait for the shutdown to complete
    pub async fn close(mut self) -> Gc100Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
