//! TCP transport implementation.
//!
//! `RadioRA` main repeaters expose their integration protocol on the telnet
//! port.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::transport::{BoxedStream, Connector};

/// Default telnet port of the controller.
pub const DEFAULT_PORT: u16 = 23;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens TCP connections to a controller.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector for the given host on the default port.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> BoxFuture<'_, Result<BoxedStream>> {
        Box::pin(async move {
            tracing::info!("connecting to {}:{}", self.host, self.port);

            let connect = TcpStream::connect((self.host.as_str(), self.port));
            let stream = tokio::time::timeout(self.connect_timeout, connect)
                .await
                .map_err(|_| Error::Timeout {
                    timeout_ms: u64::try_from(self.connect_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                })??;

            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!("failed to set TCP_NODELAY: {}", e);
            }

            tracing::info!("connected to {}:{}", self.host, self.port);
            Ok(Box::new(stream) as BoxedStream)
        })
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn test_tcp_connector_defaults() {
        let connector = TcpConnector::new("192.168.1.50");
        assert_eq!(connector.port, DEFAULT_PORT);
        assert_eq!(connector.describe(), "192.168.1.50:23");
    }

    #[test]
    fn test_tcp_connector_builder() {
        let connector = TcpConnector::new("repeater.local")
            .port(2323)
            .connect_timeout(Duration::from_secs(1));
        assert_eq!(connector.port, 2323);
        assert_eq!(connector.connect_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_connect_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"login: ").await.unwrap();
        });

        let connector = TcpConnector::new("127.0.0.1").port(port);
        let mut stream = connector.connect().await.unwrap();

        let mut buf = [0u8; 7];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"login: ");

        server.await.unwrap();
    }
}
