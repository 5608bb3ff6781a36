//! Persistent serial bridge to one serial connector.
//!
//! The GC-100 tunnels each serial connector over its own TCP port
//! (`serial_base_port + index`). Unlike the command channel the connection
//! stays open between calls, until [`SerialChannel::disconnect`] or an I/O
//! failure tears it down.
//!
//! All methods take `&self`, so one reader task and one writer task can share
//! a channel through an `Arc`. Reads and writes use separate locks; concurrent
//! senders are serialized and paced against each other, concurrent receivers
//! queue on the read lock.

use crate::core::framer::ResponseFramer;
use crate::core::gc100::Gc100;
use crate::domain::command::{BaudRate, ConnectorAddress, FlowControl, Parity};
use crate::domain::error::{Gc100Error, Gc100Result};
use crate::domain::response::SerialSettings;
use crate::infrastructure::tcp::Connector;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Serial bridge connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Connected => write!(f, "Connected"),
        }
    }
}

struct SerialReader<S> {
    half: ReadHalf<S>,
    framer: ResponseFramer,
}

/// Falls back to `Disconnected` if a connect attempt is dropped midway
struct ConnectingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    armed: bool,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(SessionState::Disconnected);
        }
    }
}

pub struct SerialChannel<C: Connector> {
    gc100: Gc100<C>,
    addr: ConnectorAddress,
    port: u16,
    pacing: Duration,
    state: watch::Sender<SessionState>,
    reader: Mutex<Option<SerialReader<C::Stream>>>,
    writer: Mutex<Option<WriteHalf<C::Stream>>>,
}

impl<C: Connector> SerialChannel<C> {
    pub(crate) fn new(gc100: Gc100<C>, addr: ConnectorAddress, index: u16) -> Self {
        let options = gc100.options();
        let port = options.serial_base_port.saturating_add(index);
        let pacing = options.send_pacing;
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            gc100,
            addr,
            port,
            pacing,
            state,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    pub fn addr(&self) -> &ConnectorAddress {
        &self.addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Open the bridge connection; does nothing if already connected
    pub async fn connect(&self) -> Gc100Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let mut writer = self.writer.lock().await;
        let mut reader = self.reader.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        self.state.send_replace(SessionState::Connecting);
        let mut guard = ConnectingGuard {
            state: &self.state,
            armed: true,
        };

        let stream = self.gc100.connector().connect(self.port).await?;
        let (read_half, write_half) = tokio::io::split(stream);
        *reader = Some(SerialReader {
            half: read_half,
            framer: ResponseFramer::new(self.gc100.options().strict_framing),
        });
        *writer = Some(write_half);

        guard.armed = false;
        self.state.send_replace(SessionState::Connected);
        info!("Serial bridge {} connected on {}:{}", self.addr, self.gc100.host(), self.port);
        Ok(())
    }

    /// Close the bridge connection; does nothing if already disconnected.
    ///
    /// The channel ends up `Disconnected` even when closing the socket fails.
    /// A pending [`receive`](Self::receive) is woken and returns `None`.
    pub async fn disconnect(&self) -> Gc100Result<()> {
        self.state.send_replace(SessionState::Disconnected);

        let mut writer = self.writer.lock().await;
        let mut reader = self.reader.lock().await;
        let write_half = writer.take();
        let read_half = reader.take();
        // A connect queued on the locks ahead of us may have republished Connected
        self.state.send_replace(SessionState::Disconnected);
        drop(reader);
        drop(writer);

        let Some(mut write_half) = write_half else {
            return Ok(());
        };
        let result = write_half.shutdown().await;
        drop(read_half);

        info!("Serial bridge {} disconnected", self.addr);
        result.map_err(|e| {
            warn!("Serial bridge {} close failed: {}", self.addr, e);
            Gc100Error::from(e)
        })
    }

    /// Read up to `max_size` bytes; `max_size` must be non-zero.
    ///
    /// Returns `None` when the device closed the connection (the channel
    /// disconnects itself) or when [`disconnect`](Self::disconnect) ran while
    /// waiting. Dropping the returned future leaves the channel connected.
    pub async fn receive(&self, max_size: usize) -> Gc100Result<Option<Vec<u8>>> {
        if max_size == 0 {
            return Err(Gc100Error::InvalidInput(
                "receive size must be at least one byte".to_string(),
            ));
        }
        let mut state_rx = self.state.subscribe();
        if *state_rx.borrow_and_update() != SessionState::Connected {
            return Err(Gc100Error::NotConnected);
        }

        let mut reader = self.reader.lock().await;
        let Some(SerialReader { half, framer }) = reader.as_mut() else {
            return Err(Gc100Error::NotConnected);
        };

        // Bytes left over from receive_frame come first
        if framer.pending() > 0 {
            return Ok(Some(framer.take_pending(max_size)));
        }

        let mut buf = vec![0u8; max_size];
        let result = tokio::select! {
            res = half.read(&mut buf) => res,
            _ = left_connected(&mut state_rx) => {
                reader.take();
                return Ok(None);
            }
        };

        match result {
            Ok(0) => {
                debug!("Serial bridge {} closed by device", self.addr);
                self.tear_down(&mut reader);
                Ok(None)
            }
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(e) => {
                warn!("Serial bridge {} read failed: {}", self.addr, e);
                self.tear_down(&mut reader);
                Err(e.into())
            }
        }
    }

    /// Read the next CR-terminated line from the bridge.
    ///
    /// Partial lines stay buffered across calls until the channel reconnects.
    pub async fn receive_frame(&self) -> Gc100Result<Option<String>> {
        let mut state_rx = self.state.subscribe();
        if *state_rx.borrow_and_update() != SessionState::Connected {
            return Err(Gc100Error::NotConnected);
        }

        let mut reader = self.reader.lock().await;
        let Some(SerialReader { half, framer }) = reader.as_mut() else {
            return Err(Gc100Error::NotConnected);
        };

        let result = tokio::select! {
            res = framer.next_frame(half) => res,
            _ = left_connected(&mut state_rx) => {
                reader.take();
                return Ok(None);
            }
        };
        let peer_closed = framer.peer_closed();

        match result {
            Ok(frame) if frame.is_empty() && peer_closed => {
                debug!("Serial bridge {} closed by device", self.addr);
                self.tear_down(&mut reader);
                Ok(None)
            }
            Ok(frame) => {
                if peer_closed {
                    self.tear_down(&mut reader);
                }
                Ok(Some(frame))
            }
            Err(e @ (Gc100Error::Transport(_) | Gc100Error::ConnectionClosedMidFrame { .. })) => {
                warn!("Serial bridge {} read failed: {}", self.addr, e);
                self.tear_down(&mut reader);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Write `data`, then hold off further sends for the pacing interval.
    ///
    /// The bridge mishandles back-to-back packets (missed acks, bad
    /// retransmits, eventually a reboot), so consecutive sends are always at
    /// least the pacing interval apart on the wire.
    pub async fn send(&self, data: &[u8]) -> Gc100Result<()> {
        let mut writer = self.writer.lock().await;
        if !self.is_connected() {
            writer.take();
            return Err(Gc100Error::NotConnected);
        }
        let Some(half) = writer.as_mut() else {
            return Err(Gc100Error::NotConnected);
        };

        let result = async {
            half.write_all(data).await?;
            half.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                debug!("Sent {} bytes to serial bridge {}", data.len(), self.addr);
                tokio::time::sleep(self.pacing).await;
                Ok(())
            }
            Err(e) => {
                warn!("Serial bridge {} write failed: {}", self.addr, e);
                writer.take();
                self.state.send_replace(SessionState::Disconnected);
                if let Ok(mut reader) = self.reader.try_lock() {
                    reader.take();
                }
                Err(e.into())
            }
        }
    }

    /// Current serial settings of this connector, via the command channel
    pub async fn get_serial(&self) -> Gc100Result<SerialSettings> {
        self.gc100.get_serial(&self.addr).await
    }

    /// Change the serial settings of this connector, via the command channel
    pub async fn set_serial(
        &self,
        baud: BaudRate,
        flow: FlowControl,
        parity: Parity,
    ) -> Gc100Result<()> {
        self.gc100.set_serial(&self.addr, baud, flow, parity).await
    }

    /// Drop the connection after a failed or closed read; the read lock is already held
    fn tear_down(&self, reader: &mut Option<SerialReader<C::Stream>>) {
        reader.take();
        self.state.send_replace(SessionState::Disconnected);
        // A sender holding the write half reaps it on its next call
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
    }
}

/// Resolves once the channel is no longer connected
async fn left_connected(state_rx: &mut watch::Receiver<SessionState>) {
    let _ = state_rx
        .wait_for(|state| *state != SessionState::Connected)
        .await;
}
