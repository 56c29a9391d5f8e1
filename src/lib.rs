//! # radiora
//!
//! A Rust client library for Lutron `RadioRA` controllers.
//!
//! This library keeps one authenticated, auto-reconnecting session to a
//! controller's telnet integration port and turns typed output commands
//! into protocol lines and controller status pushes back into replies.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Commands issued before login are queued and flushed in order
//! - Replies correlated to callers by output id
//! - Every query and set resolves within a bounded time
//!
//! ## Quick Start
//!
//! ```no_run
//! use radiora::{Config, RadioRa, SetLevel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), radiora::Error> {
//!     let config = Config::new("192.168.1.50")
//!         .credentials("lutron", "integration")
//!         .device(5, "Kitchen");
//!     let client = RadioRa::connect(&config);
//!
//!     let kitchen = client.device(5)?;
//!     if let Some(level) = kitchen.level().await {
//!         println!("{} is at {level}%", kitchen.name());
//!     }
//!
//!     kitchen.set_level(SetLevel::new(50.0).fade(2.0)).await;
//!
//!     client.shutdown().await
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Line framing, login handshake, command encoding, status parsing
//! - [`types`] - Output ids, status events, set parameters
//! - [`transport`] - Connection opening (currently TCP)
//! - [`event`] - Event broadcast and reply correlation
//! - [`watchdog`] - Bounded waits with exactly-once completion
//! - [`session`] - The session engine and its handle
//! - [`client`] - High-level [`RadioRa`] client and [`Device`]s

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;
pub mod watchdog;

// Re-exports for convenience
pub use client::{Device, RadioRa};
pub use config::{Config, DeviceConfig};
pub use error::{Error, ParseError, Result};
pub use event::{CorrelationBus, Event, EventDispatcher, Subscription};
pub use protocol::{LoginState, LoginStep, OutputCommand};
pub use session::Session;
pub use transport::{BoxedStream, ByteStream, Connector, TcpConnector};
pub use types::{OutputId, SetLevel, StatusEvent};
pub use watchdog::{Guard, WatchdogContext};
