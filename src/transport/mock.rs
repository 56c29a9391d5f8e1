//! In-memory connector for tests.
//!
//! Each call to `connect` hands out the next queued duplex pipe; the test
//! keeps the other end and plays the controller.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tokio::io::DuplexStream;
use tokio::sync::{Mutex, mpsc};

use crate::error::{Error, Result};
use crate::transport::{BoxedStream, Connector};

const PIPE_CAPACITY: usize = 4096;

/// Connector backed by `tokio::io::duplex` pipes.
pub(crate) struct MockConnector {
    streams: Mutex<mpsc::UnboundedReceiver<DuplexStream>>,
    attempts: Arc<AtomicUsize>,
}

/// Test-side handle for supplying connections.
pub(crate) struct MockController {
    streams: mpsc::UnboundedSender<DuplexStream>,
    attempts: Arc<AtomicUsize>,
}

impl MockConnector {
    pub(crate) fn new() -> (Self, MockController) {
        let (tx, rx) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        (
            Self {
                streams: Mutex::new(rx),
                attempts: Arc::clone(&attempts),
            },
            MockController {
                streams: tx,
                attempts,
            },
        )
    }
}

impl MockController {
    /// Queues a connection and returns the controller end of it.
    pub(crate) fn accept(&self) -> DuplexStream {
        let (client, controller) = tokio::io::duplex(PIPE_CAPACITY);
        self.streams.send(client).expect("mock connector dropped");
        controller
    }

    /// Number of times the session tried to connect.
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect(&self) -> BoxFuture<'_, Result<BoxedStream>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let mut streams = self.streams.lock().await;
            match streams.try_recv() {
                Ok(stream) => Ok(Box::new(stream) as BoxedStream),
                Err(_) => Err(Error::Io(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "no mock connection queued",
                ))),
            }
        })
    }

    fn describe(&self) -> String {
        "mock".into()
    }
}
