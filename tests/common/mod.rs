//! In-memory stand-ins for a GC-100, shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use gc100::{Connector, EndpointOptions, Gc100, Gc100Result};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

/// What the fake device observed
#[derive(Default)]
pub struct Stats {
    pub open: AtomicUsize,
    pub max_open: AtomicUsize,
    pub connects: AtomicUsize,
    pub commands: Mutex<Vec<String>>,
    pub writes: Mutex<Vec<(Instant, usize)>>,
    pub ports: Mutex<Vec<u16>>,
    pub connected_at: Mutex<Vec<Instant>>,
    /// Reads on every open stream fail with a connection reset while set
    pub fail_reads: AtomicBool,
}

impl Stats {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(Instant, usize)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn connected_at(&self) -> Vec<Instant> {
        self.connected_at.lock().unwrap().clone()
    }
}

/// Client end of a fake connection; counts itself open until dropped
pub struct TrackedStream {
    inner: DuplexStream,
    stats: Arc<Stats>,
}

impl TrackedStream {
    fn open(inner: DuplexStream, stats: Arc<Stats>, port: u16) -> Self {
        let now = stats.open.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_open.fetch_max(now, Ordering::SeqCst);
        stats.connects.fetch_add(1, Ordering::SeqCst);
        stats.ports.lock().unwrap().push(port);
        stats.connected_at.lock().unwrap().push(Instant::now());
        Self { inner, stats }
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.stats.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.stats.fail_reads.load(Ordering::SeqCst) {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by fake device",
            )));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let result = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &result {
            self.stats.writes.lock().unwrap().push((Instant::now(), *n));
        }
        result
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

pub type Responder = Arc<dyn Fn(&str) -> Option<Vec<u8>> + Send + Sync>;

/// Fake command port: reads one CR-terminated command per connection and answers it
pub struct FakeCommandPort {
    responder: Responder,
    delay: Duration,
    hang_up: bool,
    pub stats: Arc<Stats>,
}

impl FakeCommandPort {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            delay: Duration::ZERO,
            hang_up: false,
            stats: Arc::new(Stats::default()),
        }
    }

    /// Wait this long before answering each command
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Close the connection right after answering instead of waiting for the client
    pub fn hanging_up(mut self) -> Self {
        self.hang_up = true;
        self
    }
}

#[async_trait]
impl Connector for FakeCommandPort {
    type Stream = TrackedStream;

    fn host(&self) -> &str {
        "fake-gc100"
    }

    async fn connect(&self, port: u16) -> Gc100Result<TrackedStream> {
        let (client, mut device) = tokio::io::duplex(4096);
        let responder = Arc::clone(&self.responder);
        let stats = Arc::clone(&self.stats);
        let delay = self.delay;
        let hang_up = self.hang_up;

        tokio::spawn(async move {
            let mut received = Vec::new();
            let mut buf = [0u8; 256];
            while !received.contains(&b'\r') {
                match device.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                }
            }
            let end = received.iter().position(|b| *b == b'\r').unwrap();
            let command = String::from_utf8_lossy(&received[..end]).to_string();
            stats.commands.lock().unwrap().push(command.clone());

            if let Some(reply) = responder(&command) {
                tokio::time::sleep(delay).await;
                let _ = device.write_all(&reply).await;
            }
            if hang_up {
                return;
            }
            // Hold the connection until the client closes it
            while let Ok(n) = device.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
        });

        Ok(TrackedStream::open(client, Arc::clone(&self.stats), port))
    }
}

/// Fake serial bridge: hands the device end of every connection to the test
pub struct FakeBridge {
    devices: mpsc::UnboundedSender<DuplexStream>,
    pub stats: Arc<Stats>,
}

impl FakeBridge {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DuplexStream>) {
        let (devices, rx) = mpsc::unbounded_channel();
        (
            Self {
                devices,
                stats: Arc::new(Stats::default()),
            },
            rx,
        )
    }
}

#[async_trait]
impl Connector for FakeBridge {
    type Stream = TrackedStream;

    fn host(&self) -> &str {
        "fake-bridge"
    }

    async fn connect(&self, port: u16) -> Gc100Result<TrackedStream> {
        let (client, device) = tokio::io::duplex(4096);
        let _ = self.devices.send(device);
        Ok(TrackedStream::open(client, Arc::clone(&self.stats), port))
    }
}

/// Endpoint options with the stock timings
pub fn options() -> EndpointOptions {
    EndpointOptions::default()
}

pub fn endpoint<C: Connector>(connector: C) -> Gc100<C> {
    Gc100::new(connector, options())
}
