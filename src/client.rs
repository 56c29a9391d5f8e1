//! Main [`RadioRa`] client implementation.
//!
//! This module provides the high-level [`RadioRa`] client that owns one
//! controller [`Session`] and the [`Device`]s configured on it.

use crate::config::{Config, DeviceConfig};
use crate::error::{Error, Result};
use crate::event::Subscription;
use crate::session::Session;
use crate::transport::Connector;
use crate::types::{OutputId, SetLevel, StatusEvent};
use crate::watchdog::WatchdogContext;

/// Client for one `RadioRA` controller.
pub struct RadioRa {
    session: Session,
    devices: Vec<Device>,
}

impl RadioRa {
    /// Starts a session to the configured controller over TCP.
    ///
    /// Must be called within a tokio runtime. Login happens in the
    /// background; subscribe to events to observe it.
    #[must_use]
    pub fn connect(config: &Config) -> Self {
        Self::with_session(config, Session::connect(config))
    }

    /// Starts a session over a custom connector.
    #[must_use]
    pub fn with_connector<C: Connector>(
        config: &Config,
        connector: C,
        watchdogs: WatchdogContext,
    ) -> Self {
        Self::with_session(config, Session::spawn(config, connector, watchdogs))
    }

    fn with_session(config: &Config, session: Session) -> Self {
        let devices = config
            .devices
            .iter()
            .map(|device| Device::new(device, session.clone()))
            .collect();
        Self { session, devices }
    }

    /// Returns the underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns all configured devices.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Looks up a device by output id.
    pub fn device(&self, id: impl Into<OutputId>) -> Result<&Device> {
        let id = id.into();
        self.devices
            .iter()
            .find(|device| device.id == id)
            .ok_or(Error::UnknownDevice(id.get()))
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.session.subscribe()
    }

    /// Closes the session.
    pub async fn shutdown(&self) -> Result<()> {
        self.session.shutdown().await
    }
}

/// A configured output bound to a session.
#[derive(Clone)]
pub struct Device {
    id: OutputId,
    name: String,
    serial: Option<String>,
    session: Session,
}

impl Device {
    fn new(config: &DeviceConfig, session: Session) -> Self {
        Self {
            id: config.id,
            name: config.name.clone(),
            serial: config.serial.clone(),
            session,
        }
    }

    /// Output id.
    #[must_use]
    pub const fn id(&self) -> OutputId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serial number, if configured.
    #[must_use]
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Queries the current level. `None` if the controller did not answer in time.
    pub async fn level(&self) -> Option<f64> {
        self.session.get_level(self.id).await
    }

    /// Sets the level and returns the status the controller reported.
    pub async fn set_level(&self, params: SetLevel) -> Option<StatusEvent> {
        self.session.set_level(self.id, params).await
    }

    /// Last level the controller reported.
    pub async fn cached_level(&self) -> Result<Option<f64>> {
        self.session.cached_level(self.id).await
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("serial", &self.serial)
            .finish_non_exhaustive()
    }
}
