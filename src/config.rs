//! Session and device configuration.
//!
//! The host hands over JSON such as:
//! ```json
//! {
//!   "host": "192.168.1.50",
//!   "username": "lutron",
//!   "password": "integration",
//!   "devices": [{ "id": 5, "name": "Kitchen", "serial": "0x00A1B2C3" }]
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::tcp::DEFAULT_PORT;
use crate::types::OutputId;

/// Default reply timeout for queries and sets.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(4000);

/// Default wait for a status echo after a set before querying.
pub const DEFAULT_ECHO_GRACE: Duration = Duration::from_millis(1000);

/// Default pause before reconnecting after a lost session.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Controller connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Controller host name or address.
    pub host: String,
    /// Telnet port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Integration login name.
    #[serde(default = "default_username")]
    pub username: String,
    /// Integration password.
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    #[serde(default = "default_echo_grace_ms")]
    pub echo_grace_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Outputs exposed as devices.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// One configured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: OutputId,
    pub name: String,
    #[serde(default)]
    pub serial: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_username() -> String {
    "lutron".into()
}

fn default_password() -> String {
    "integration".into()
}

fn default_response_timeout_ms() -> u64 {
    millis(DEFAULT_RESPONSE_TIMEOUT)
}

fn default_echo_grace_ms() -> u64 {
    millis(DEFAULT_ECHO_GRACE)
}

fn default_reconnect_delay_ms() -> u64 {
    millis(DEFAULT_RECONNECT_DELAY)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    /// Creates a configuration for the given host with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: default_username(),
            password: default_password(),
            response_timeout_ms: default_response_timeout_ms(),
            echo_grace_ms: default_echo_grace_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            devices: Vec::new(),
        }
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the login credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the reply timeout.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout_ms = millis(timeout);
        self
    }

    /// Sets how long a set waits for a status echo before querying.
    #[must_use]
    pub fn echo_grace(mut self, grace: Duration) -> Self {
        self.echo_grace_ms = millis(grace);
        self
    }

    /// Sets the pause before reconnecting.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = millis(delay);
        self
    }

    /// Adds a device.
    #[must_use]
    pub fn device(mut self, id: u32, name: impl Into<String>) -> Self {
        self.devices.push(DeviceConfig {
            id: OutputId(id),
            name: name.into(),
            serial: None,
        });
        self
    }

    /// Reply timeout as a duration.
    #[must_use]
    pub const fn response_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Echo grace as a duration.
    #[must_use]
    pub const fn echo_grace_duration(&self) -> Duration {
        Duration::from_millis(self.echo_grace_ms)
    }

    /// Reconnect delay as a duration.
    #[must_use]
    pub const fn reconnect_delay_duration(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
