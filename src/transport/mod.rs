//! Transport layer for `RadioRA` communication.
//!
//! This module provides the abstraction over how the byte stream to the
//! controller is opened. Currently only TCP is implemented.

pub mod tcp;

#[cfg(test)]
pub(crate) mod mock;

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// A bidirectional byte stream to the controller.
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ByteStream for T {}

/// Boxed stream handed to the session engine.
pub type BoxedStream = Box<dyn ByteStream>;

/// Trait for opening connections to the controller.
///
/// The session calls [`Connector::connect`] once per connection attempt,
/// including every reconnect.
pub trait Connector: Send + Sync + 'static {
    /// Opens a fresh stream.
    fn connect(&self) -> BoxFuture<'_, Result<BoxedStream>>;

    /// Human readable description of the endpoint, for logs.
    fn describe(&self) -> String;
}

pub use tcp::TcpConnector;
