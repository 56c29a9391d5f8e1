//! Persistent controller session.
//!
//! A [`Session`] is a cheap, cloneable handle to a background engine task
//! that logs in, keeps the connection alive and correlates replies. All
//! waits are bounded by a watchdog, so query and set calls always resolve:
//! with the controller's answer, or with `None` once the timeout passes.

mod cache;
mod engine;


use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{EventDispatcher, Subscription};
use crate::transport::{Connector, TcpConnector};
use crate::types::{OutputId, SetLevel, StatusEvent};
use crate::watchdog::{self, WatchdogContext};

use engine::{Engine, Request};

const REQUEST_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Handle to a controller session.
#[derive(Clone)]
pub struct Session {
    requests: mpsc::Sender<Request>,
    dispatcher: EventDispatcher,
    watchdogs: WatchdogContext,
    response_timeout: Duration,
}

impl Session {
    /// Starts a session to the configured host over TCP.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn connect(config: &Config) -> Self {
        let connector = TcpConnector::new(config.host.clone()).port(config.port);
        Self::spawn(config, connector, WatchdogContext::new())
    }

    /// Starts a session over a custom connector.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn<C: Connector>(
        config: &Config,
        connector: C,
        watchdogs: WatchdogContext,
    ) -> Self {
        let (requests, requests_rx) = mpsc::channel(REQUEST_CAPACITY);
        let dispatcher = EventDispatcher::new(EVENT_CAPACITY);

        let engine = Engine::new(
            config.clone(),
            connector,
            requests_rx,
            requests.downgrade(),
            dispatcher.clone(),
        );
        tokio::spawn(engine.run());

        Self {
            requests,
            dispatcher,
            watchdogs,
            response_timeout: config.response_timeout_duration(),
        }
    }

    /// Sends a raw protocol line.
    ///
    /// The line is written immediately when logged in and queued otherwise.
    /// A missing terminator is added.
    pub async fn send_command(&self, text: impl Into<String>) -> Result<()> {
        self.request(Request::Command(text.into())).await
    }

    /// Queries the level of an output, waiting up to the response timeout.
    pub async fn get_level(&self, id: impl Into<OutputId>) -> Option<f64> {
        self.get_level_within(id, self.response_timeout).await
    }

    /// Queries the level of an output, waiting up to `timeout`.
    ///
    /// Concurrent queries for the same output share one wire query.
    pub async fn get_level_within(
        &self,
        id: impl Into<OutputId>,
        timeout: Duration,
    ) -> Option<f64> {
        let id = id.into();
        let (reply, reply_rx) = oneshot::channel();
        self.watched(
            format!("get level of output {id}"),
            timeout,
            Request::Query { id, reply },
            reply_rx,
        )
        .await
        .map(|event| event.level)
    }

    /// Sets the level of an output and waits for the controller to report it.
    ///
    /// If the controller does not echo the new status within the echo grace
    /// period, the session queries it.
    pub async fn set_level(
        &self,
        id: impl Into<OutputId>,
        params: SetLevel,
    ) -> Option<StatusEvent> {
        let id = id.into();
        let (reply, reply_rx) = oneshot::channel();
        self.watched(
            format!("set level of output {id}"),
            self.response_timeout,
            Request::Set { id, params, reply },
            reply_rx,
        )
        .await
    }

    /// Returns the last level the controller reported for an output.
    pub async fn cached_level(&self, id: impl Into<OutputId>) -> Result<Option<f64>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(Request::CachedLevel {
            id: id.into(),
            reply,
        })
        .await?;
        reply_rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.dispatcher.subscribe()
    }

    /// Closes the transport and stops the session.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(Request::Shutdown { reply }).await?;
        reply_rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Returns true once the engine has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    /// Watchdog bookkeeping shared by this session's calls.
    #[must_use]
    pub const fn watchdogs(&self) -> &WatchdogContext {
        &self.watchdogs
    }

    async fn request(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| Error::SessionClosed)
    }

    /// Sends `request` and waits for `reply` under a watchdog.
    ///
    /// The watchdog bounds the whole call, including a send that is stuck
    /// behind a busy engine. Dropping `reply` on return closes the
    /// listener, so the engine can prune it.
    async fn watched(
        &self,
        label: String,
        timeout: Duration,
        request: Request,
        mut reply: oneshot::Receiver<StatusEvent>,
    ) -> Option<StatusEvent> {
        let (done, mut done_rx) = oneshot::channel();
        let guard = watchdog::arm(&self.watchdogs, label, timeout, move |event| {
            let _ = done.send(event);
        });

        tokio::select! {
            biased;
            timed_out = &mut done_rx => return timed_out.ok().flatten(),
            sent = self.request(request) => {
                if sent.is_err() {
                    tracing::warn!("session closed, waiting for watchdog");
                }
            }
        }

        tokio::select! {
            biased;
            timed_out = &mut done_rx => return timed_out.ok().flatten(),
            event = &mut reply => {
                // A dropped listener means the engine stopped
                if let Ok(event) = event {
                    guard.complete(event);
                }
            }
        }

        done_rx.await.ok().flatten()
    }
}
