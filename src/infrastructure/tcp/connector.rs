use crate::domain::error::{Gc100Error, Gc100Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Opens byte streams to ports on one GC-100 host.
///
/// The protocol engine never touches sockets directly; tests substitute in-memory streams here.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Host this connector targets
    fn host(&self) -> &str;

    /// Open a fresh connection to `port` on the host
    async fn connect(&self, port: u16) -> Gc100Result<Self::Stream>;
}

/// TCP connector with a connect timeout
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn host(&self) -> &str {
        &self.host
    }

    async fn connect(&self, port: u16) -> Gc100Result<TcpStream> {
        let stream = tokio::time::timeout(
            self.timeout,
            TcpStream::connect((self.host.as_str(), port)),
        )
        .await
        .map_err(|_| Gc100Error::Timeout)??;

        // Commands are tiny; don't let Nagle hold them back
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        debug!("Connected to {}:{}", self.host, port);
        Ok(stream)
    }
}
