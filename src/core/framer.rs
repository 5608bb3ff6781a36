//! CR-delimited response framing over a byte stream.
//!
//! A single network read may carry several frames, and a single frame may
//! arrive across several reads. [`ResponseFramer`] keeps the unresolved bytes
//! between calls and hands back one frame at a time, terminator stripped.
//!
//! When the peer closes with nothing buffered, [`ResponseFramer::next_frame`]
//! returns an empty frame, and will keep doing so on every later call. Callers
//! looping on frames must check [`ResponseFramer::peer_closed`] or they will
//! spin on empty frames forever.

use crate::domain::command::CR;
use crate::domain::error::{Gc100Error, Gc100Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

const READ_CHUNK: usize = 1024;

#[derive(Debug)]
pub struct ResponseFramer {
    buffer: Vec<u8>,
    strict: bool,
    peer_closed: bool,
}

impl ResponseFramer {
    /// A framer with an empty receive buffer.
    ///
    /// With `strict`, a close that leaves a partial frame buffered is an error;
    /// otherwise the fragment is returned as if it were complete.
    pub fn new(strict: bool) -> Self {
        Self {
            buffer: Vec::with_capacity(READ_CHUNK),
            strict,
            peer_closed: false,
        }
    }

    /// Append bytes received from the peer
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Split off the next complete frame, if one is buffered
    pub fn take_frame(&mut self) -> Gc100Result<Option<String>> {
        let Some(idx) = self.buffer.iter().position(|b| *b == CR) else {
            return Ok(None);
        };
        let mut frame: Vec<u8> = self.buffer.drain(..=idx).collect();
        frame.pop();
        decode(frame).map(Some)
    }

    /// Read from `reader` until a full frame is available and return it
    pub async fn next_frame<R>(&mut self, reader: &mut R) -> Gc100Result<String>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.take_frame()? {
                trace!("Frame: {:?}", frame);
                return Ok(frame);
            }

            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                self.peer_closed = true;
                let rest = std::mem::take(&mut self.buffer);
                if !rest.is_empty() {
                    debug!("Peer closed with {} bytes of partial frame", rest.len());
                    if self.strict {
                        return Err(Gc100Error::ConnectionClosedMidFrame { pending: rest.len() });
                    }
                }
                return decode(rest);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Whether a read has observed the peer closing the connection
    pub fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Bytes buffered but not yet part of a complete frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Remove up to `max` buffered bytes without framing them
    pub fn take_pending(&mut self, max: usize) -> Vec<u8> {
        let n = max.min(self.buffer.len());
        self.buffer.drain(..n).collect()
    }
}

fn decode(frame: Vec<u8>) -> Gc100Result<String> {
    if !frame.is_ascii() {
        return Err(Gc100Error::Protocol(format!(
            "Non-ASCII response: {}",
            String::from_utf8_lossy(&frame)
        )));
    }
    String::from_utf8(frame).map_err(|e| Gc100Error::Protocol(e.to_string()))
}
