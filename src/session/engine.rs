//! Session engine task.
//!
//! One engine owns the transport, the login state, the command queue, the
//! status cache and the correlation bus. Everything else talks to it
//! through [`Request`] messages, so all session state has a single writer.

use std::collections::VecDeque;

use tokio::io::{AsyncReadExt, AsyncWriteExt, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{CorrelationBus, Event, EventDispatcher};
use crate::protocol::{
    LineDecoder, LoginState, LoginStep, MAX_LINE_LEN, OutputCommand, normalize_line,
    parse_status,
};
use crate::session::cache::StatusCache;
use crate::transport::{BoxedStream, Connector};
use crate::types::{OutputId, SetLevel, StatusEvent};

/// Messages handled by the engine.
pub(crate) enum Request {
    /// Raw protocol line.
    Command(String),
    /// Query a level; `reply` fires with the next status for `id`.
    Query {
        id: OutputId,
        reply: oneshot::Sender<StatusEvent>,
    },
    /// Set a level; `reply` fires with the next status for `id`.
    Set {
        id: OutputId,
        params: SetLevel,
        reply: oneshot::Sender<StatusEvent>,
    },
    /// Query `id` if a set is still waiting for its echo.
    EchoCheck { id: OutputId },
    /// Read the cached level.
    CachedLevel {
        id: OutputId,
        reply: oneshot::Sender<Option<f64>>,
    },
    /// Close the transport and stop.
    Shutdown { reply: oneshot::Sender<()> },
}

enum Flow {
    Continue,
    Stop,
}

enum Outcome {
    Lost,
    Rejected,
    Shutdown,
}

pub(crate) struct Engine<C> {
    config: Config,
    connector: C,
    requests: mpsc::Receiver<Request>,
    loopback: mpsc::WeakSender<Request>,
    dispatcher: EventDispatcher,
    writer: Option<WriteHalf<BoxedStream>>,
    login: LoginState,
    ready: bool,
    authenticated_once: bool,
    queue: VecDeque<String>,
    cache: StatusCache,
    bus: CorrelationBus,
    stop_reply: Option<oneshot::Sender<()>>,
}

impl<C: Connector> Engine<C> {
    pub(crate) fn new(
        config: Config,
        connector: C,
        requests: mpsc::Receiver<Request>,
        loopback: mpsc::WeakSender<Request>,
        dispatcher: EventDispatcher,
    ) -> Self {
        let cache = StatusCache::new(config.response_timeout_duration());
        Self {
            config,
            connector,
            requests,
            loopback,
            dispatcher,
            writer: None,
            login: LoginState::default(),
            ready: false,
            authenticated_once: false,
            queue: VecDeque::new(),
            cache,
            bus: CorrelationBus::new(),
            stop_reply: None,
        }
    }

    /// Connects, serves and reconnects until shut down or given up.
    pub(crate) async fn run(mut self) {
        let endpoint = self.connector.describe();

        loop {
            let stream = match self.connector.connect().await {
                Ok(stream) => stream,
                Err(e) if self.authenticated_once => {
                    tracing::warn!("reconnect to {} failed: {}", endpoint, e);
                    if self.pause().await {
                        continue;
                    }
                    break;
                }
                Err(e) => {
                    tracing::error!("could not connect to {}: {}, giving up", endpoint, e);
                    break;
                }
            };

            self.dispatcher.dispatch(Event::Connected);
            let outcome = self.serve(stream).await;
            self.dispatcher.dispatch(Event::Disconnected);

            match outcome {
                Outcome::Shutdown => {
                    tracing::info!("session to {} shut down", endpoint);
                    break;
                }
                Outcome::Rejected => {
                    tracing::error!(
                        "{} rejected the credentials for {:?}, not reconnecting",
                        endpoint,
                        self.config.username
                    );
                    break;
                }
                Outcome::Lost if self.authenticated_once => {
                    tracing::info!(
                        "connection to {} lost, reconnecting in {}ms ({} commands queued)",
                        endpoint,
                        self.config.reconnect_delay_ms,
                        self.queue.len()
                    );
                    if !self.pause().await {
                        break;
                    }
                }
                Outcome::Lost => {
                    tracing::error!(
                        "connection to {} closed before login completed, not reconnecting",
                        endpoint
                    );
                    break;
                }
            }
        }

        self.requests.close();
        if let Some(reply) = self.stop_reply.take() {
            let _ = reply.send(());
        }
        self.dispatcher.dispatch(Event::Stopped);
    }

    /// Serves one connection until it is lost or the session is shut down.
    async fn serve(&mut self, stream: BoxedStream) -> Outcome {
        let (mut reader, writer) = tokio::io::split(stream);
        self.writer = Some(writer);
        self.login = LoginState::default();
        self.ready = false;

        let mut decoder = LineDecoder::new();
        let mut buf = [0u8; 1024];

        let outcome = 'serve: loop {
            tokio::select! {
                read = reader.read(&mut buf) => {
                    let n = match read {
                        Ok(0) => {
                            tracing::debug!("controller closed the connection");
                            break 'serve Outcome::Lost;
                        }
                        Ok(n) => n,
                        Err(e) => {
                            tracing::warn!("read error: {}", e);
                            break 'serve Outcome::Lost;
                        }
                    };

                    tracing::trace!("received {} bytes", n);
                    decoder.feed(&buf[..n]);

                    while let Some(line) = decoder.decode() {
                        match self.handle_line(&line).await {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Stop) => break 'serve Outcome::Rejected,
                            Err(e) => {
                                tracing::warn!("write error: {}", e);
                                break 'serve Outcome::Lost;
                            }
                        }
                    }

                    if decoder.discard_overflow() {
                        tracing::warn!(
                            "dropped unterminated input over {} bytes",
                            MAX_LINE_LEN
                        );
                    }
                }
                request = self.requests.recv() => {
                    let Some(request) = request else {
                        tracing::debug!("all session handles dropped");
                        break 'serve Outcome::Shutdown;
                    };
                    match self.handle_request(request).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Stop) => break 'serve Outcome::Shutdown,
                        Err(e) => {
                            tracing::warn!("write error: {}", e);
                            break 'serve Outcome::Lost;
                        }
                    }
                }
            }
        };

        self.close().await;
        outcome
    }

    /// Waits out the reconnect delay while still accepting requests.
    ///
    /// Returns false if the session should stop instead of reconnecting.
    async fn pause(&mut self) -> bool {
        let sleep = tokio::time::sleep(self.config.reconnect_delay_duration());
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                request = self.requests.recv() => {
                    let Some(request) = request else {
                        return false;
                    };
                    // Not ready, so nothing is written and this cannot fail
                    match self.handle_request(request).await {
                        Ok(Flow::Continue) | Err(_) => {}
                        Ok(Flow::Stop) => return false,
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        self.ready = false;
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("error closing transport: {}", e);
            }
        }
    }

    /// Handles one inbound line. `Flow::Stop` means the login was refused.
    async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match self.login.advance(line) {
            LoginStep::SendUsername => {
                tracing::debug!("login prompt, sending username");
                let username = normalize_line(&self.config.username);
                self.write(&username).await?;
            }
            LoginStep::SendPassword => {
                tracing::debug!("password prompt, sending password");
                let password = normalize_line(&self.config.password);
                self.write(&password).await?;
            }
            LoginStep::Confirmed => {
                self.on_authenticated().await?;
                self.handle_status_line(line);
            }
            LoginStep::Rejected => return Ok(Flow::Stop),
            LoginStep::Unexpected => {
                tracing::debug!("unexpected line in {:?}: {:?}", self.login, line);
            }
            LoginStep::Deliver => self.handle_status_line(line),
        }
        Ok(Flow::Continue)
    }

    async fn on_authenticated(&mut self) -> Result<()> {
        self.ready = true;
        self.authenticated_once = true;
        tracing::info!("logged in, flushing {} queued commands", self.queue.len());

        while let Some(line) = self.queue.pop_front() {
            if let Err(e) = self.write(&line).await {
                self.queue.push_front(line);
                return Err(e);
            }
        }

        self.dispatcher.dispatch(Event::LoggedIn);
        Ok(())
    }

    fn handle_status_line(&mut self, line: &str) {
        match parse_status(line) {
            Ok(Some(event)) => {
                self.cache.update(event);
                let waiting = self.bus.publish(event);
                tracing::trace!(
                    "output {} at {} ({} waiting)",
                    event.id,
                    event.level,
                    waiting
                );
                self.dispatcher.dispatch(Event::Status(event));
            }
            Ok(None) => tracing::trace!("ignoring line {:?}", line),
            Err(e) => tracing::warn!("dropping status line: {}", e),
        }
    }

    async fn handle_request(&mut self, request: Request) -> Result<Flow> {
        match request {
            Request::Command(text) => self.send(normalize_line(&text)).await?,
            Request::Query { id, reply } => {
                self.bus.register(id, reply);
                self.query(id).await?;
            }
            Request::Set { id, params, reply } => {
                self.bus.register(id, reply);
                self.send(OutputCommand::SetLevel { id, params }.encode())
                    .await?;
                self.schedule_echo_check(id);
            }
            Request::EchoCheck { id } => {
                if self.bus.has_pending(id) {
                    tracing::debug!("no status echo for output {}, querying", id);
                    self.query(id).await?;
                }
            }
            Request::CachedLevel { id, reply } => {
                let _ = reply.send(self.cache.level(id));
            }
            Request::Shutdown { reply } => {
                self.close().await;
                self.stop_reply = Some(reply);
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Sends a level query unless one for `id` is already outstanding.
    async fn query(&mut self, id: OutputId) -> Result<()> {
        let now = Instant::now();
        if self.cache.is_in_flight(id, now) {
            tracing::debug!("query for output {} already in flight, joining it", id);
            return Ok(());
        }
        self.cache.mark_in_flight(id, now);
        self.send(OutputCommand::QueryLevel { id }.encode()).await
    }

    fn schedule_echo_check(&self, id: OutputId) {
        let Some(loopback) = self.loopback.upgrade() else {
            return;
        };
        let grace = self.config.echo_grace_duration();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = loopback.send(Request::EchoCheck { id }).await;
        });
    }

    /// Writes a terminated line now, or queues it until logged in.
    async fn send(&mut self, line: String) -> Result<()> {
        if !self.ready {
            tracing::trace!("not logged in, queueing {:?}", line.trim_end());
            self.queue.push_back(line);
            return Ok(());
        }

        if let Err(e) = self.write(&line).await {
            self.queue.push_back(line);
            return Err(e);
        }
        Ok(())
    }

    async fn write(&mut self, line: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::SessionClosed)?;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        tracing::trace!("sent {} bytes", line.len());
        Ok(())
    }
}
