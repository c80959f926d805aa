use super::{ChannelMessage, Connector, Frame, FrameSink, FrameStream};
use crate::{Admission, Dispatcher, DispatcherConfig, Reply, RequestHandler, TimeSource, TransportError};
use core::fmt;
use core::pin::Pin;
use core::time::Duration;
use futures::future::{BoxFuture, OptionFuture};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, Sleep, interval_at, sleep};
use tokio_util::sync::CancellationToken;

/// Names of the slots the relay reads and writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotLayout {
    /// Where requests arrive; reset to the sentinel after each reply.
    pub request: String,
    /// Return slots are `{return_prefix}1` through `{return_prefix}{return_slots}`.
    pub return_prefix: String,
    pub return_slots: usize,
    /// Receives the seconds-since-epoch heartbeat value.
    pub liveness: String,
}

impl Default for SlotLayout {
    fn default() -> Self {
        Self {
            request: "☁request".to_owned(),
            return_prefix: "☁return".to_owned(),
            return_slots: 9,
            liveness: "☁alive".to_owned(),
        }
    }
}

impl SlotLayout {
    /// Name of the 1-based return slot `index`.
    pub fn return_slot(&self, index: usize) -> String {
        format!("{}{index}", self.return_prefix)
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Username sent in the handshake.
    pub identity: String,
    pub project_id: String,
    pub slots: SlotLayout,
    pub connect_timeout: Duration,
    /// Pause before reconnecting after a dropped or refused connection.
    pub reconnect_delay: Duration,
    /// Pause before reconnecting after a connect attempt timed out.
    pub timeout_retry_delay: Duration,
    pub heartbeat_interval: Duration,
    /// Must be shorter than `heartbeat_interval`.
    pub liveness_interval: Duration,
    pub dispatcher: DispatcherConfig,
}

impl ClientConfig {
    pub fn new(identity: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            project_id: project_id.into(),
            slots: SlotLayout::default(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            timeout_retry_delay: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(30),
            liveness_interval: Duration::from_secs(10),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keeps one channel connection alive and relays requests through a
/// [`RequestHandler`].
///
/// Everything runs on a single task: inbound frames, both timers, the
/// in-flight reply and the queue drain delay are multiplexed in one
/// `select!`, so at most one request is ever being answered.
pub struct ChannelClient<C, H, T> {
    connector: C,
    handler: Arc<H>,
    config: ClientConfig,
    dispatcher: Dispatcher<T>,
}

impl<C, H, T> ChannelClient<C, H, T>
where
    C: Connector,
    H: RequestHandler,
    T: TimeSource + Send + Sync + 'static,
{
    pub fn new(connector: C, handler: H, config: ClientConfig, clock: T) -> Self {
        let dispatcher = Dispatcher::new(config.dispatcher.clone(), clock);
        Self {
            connector,
            handler: Arc::new(handler),
            config,
            dispatcher,
        }
    }

    /// Spawns the connection loop on the current Tokio runtime.
    pub fn start(self) -> ClientHandle {
        let shutdown = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let join = tokio::spawn(self.run(shutdown.clone(), state_tx));
        ClientHandle {
            shutdown,
            state: state_rx,
            join,
        }
    }

    async fn run(mut self, shutdown: CancellationToken, state: watch::Sender<ConnectionState>) {
        loop {
            state.send_replace(ConnectionState::Connecting);
            #[cfg(feature = "tracing")]
            tracing::info!("connecting");

            let attempt = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                attempt = tokio::time::timeout(self.config.connect_timeout, self.connector.connect()) => attempt,
            };

            let delay = match attempt {
                Err(_elapsed) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(timeout = ?self.config.connect_timeout, "connect timed out");
                    self.config.timeout_retry_delay
                }
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("connect failed: {_e}");
                    self.config.reconnect_delay
                }
                Ok(Ok((sink, stream))) => {
                    state.send_replace(ConnectionState::Connected);
                    #[cfg(feature = "tracing")]
                    tracing::info!("connected");

                    let outcome = self.run_connected(sink, stream, &shutdown).await;
                    if self.dispatcher.is_busy() {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("connection lost mid-request, abandoning it");
                        self.dispatcher.abandon();
                    }
                    match outcome {
                        Ok(()) => break,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!("connection lost: {_e}");
                        }
                    }
                    self.config.reconnect_delay
                }
            };

            state.send_replace(ConnectionState::Reconnecting);
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = sleep(delay) => {}
            }
        }

        state.send_replace(ConnectionState::Disconnected);
        #[cfg(feature = "tracing")]
        tracing::info!("disconnected");
    }

    /// Serves one open connection. Returns `Ok` on shutdown and the
    /// transport error once the connection is gone.
    async fn run_connected(
        &mut self,
        mut sink: FrameSink,
        mut stream: FrameStream,
        shutdown: &CancellationToken,
    ) -> Result<(), TransportError> {
        let handshake = ChannelMessage::Handshake {
            user: self.config.identity.clone(),
            project_id: self.config.project_id.clone(),
        };
        send(&mut sink, &handshake).await?;

        // Both timers belong to this connection and go away with it.
        let now = Instant::now();
        let mut heartbeat = interval_at(
            now + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        let mut liveness = interval_at(
            now + self.config.liveness_interval,
            self.config.liveness_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut job: Option<BoxFuture<'static, Option<Reply>>> = None;
        let mut drain: Option<Pin<Box<Sleep>>> = None;
        if self.dispatcher.has_pending() {
            drain = Some(Box::pin(sleep(self.config.dispatcher.drain_delay)));
        }

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    let _ = sink.send(Frame::Close).await;
                    return Ok(());
                }
                frame = stream.next() => match frame {
                    None | Some(Ok(Frame::Close)) => return Err(TransportError::Closed),
                    Some(Err(e)) => return Err(e),
                    Some(Ok(Frame::Ping(payload))) => sink.send(Frame::Pong(payload)).await?,
                    Some(Ok(Frame::Pong(_))) => {}
                    Some(Ok(Frame::Text(text))) => {
                        for message in ChannelMessage::parse_frame(&text) {
                            if let Some(raw) = self.admit(message) {
                                job = Some(self.spawn_job(raw));
                            }
                        }
                    }
                },
                _ = heartbeat.tick() => send(&mut sink, &ChannelMessage::Heartbeat).await?,
                _ = liveness.tick() => {
                    let secs = self.dispatcher.clock().current_millis() / 1000;
                    let publish = ChannelMessage::set(&self.config.slots.liveness, secs.to_string());
                    send(&mut sink, &publish).await?;
                }
                Some(reply) = OptionFuture::from(job.as_mut()), if job.is_some() => {
                    job = None;
                    if let Some(reply) = reply {
                        self.publish(&mut sink, &reply).await?;
                    }
                    if let Some(delay) = self.dispatcher.complete() {
                        drain = Some(Box::pin(sleep(delay)));
                    }
                }
                Some(()) = OptionFuture::from(drain.as_mut()), if drain.is_some() => {
                    drain = None;
                    if let Some(raw) = self.dispatcher.drain_next() {
                        job = Some(self.spawn_job(raw));
                    }
                }
            }
        }
    }

    /// Hands a request-slot write to the dispatcher; returns the request to
    /// start now, if any.
    fn admit(&mut self, message: ChannelMessage) -> Option<String> {
        let ChannelMessage::SlotSet { name, value } = message else {
            return None;
        };
        if name != self.config.slots.request {
            return None;
        }
        match self.dispatcher.admit(&value) {
            Admission::Start(raw) => Some(raw),
            Admission::Queued { evicted: _evicted } => {
                #[cfg(feature = "tracing")]
                tracing::debug!(pending = self.dispatcher.pending(), dropped = ?_evicted, "request queued");
                None
            }
            Admission::Cooldown | Admission::Ignored => None,
        }
    }

    fn spawn_job(&self, raw: String) -> BoxFuture<'static, Option<Reply>> {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move { handler.handle(raw).await })
    }

    async fn publish(&self, sink: &mut FrameSink, reply: &Reply) -> Result<(), TransportError> {
        let slots = &self.config.slots;
        let _dropped = reply.overflow(slots);
        #[cfg(feature = "tracing")]
        if _dropped > 0 {
            tracing::warn!(dropped = _dropped, slots = slots.return_slots, "reply exceeds return slots");
        }
        for (name, value) in reply.slot_writes(slots) {
            send(sink, &ChannelMessage::set(name, value)).await?;
        }
        Ok(())
    }
}

async fn send(sink: &mut FrameSink, message: &ChannelMessage) -> Result<(), TransportError> {
    let text = message.to_text().map_err(|e| TransportError::Io {
        context: e.to_string(),
    })?;
    sink.send(Frame::Text(text)).await
}

/// Handle to a running [`ChannelClient`].
#[derive(Debug)]
pub struct ClientHandle {
    shutdown: CancellationToken,
    state: watch::Receiver<ConnectionState>,
    join: JoinHandle<()>,
}

impl ClientHandle {
    /// Subscribes to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Stops the client from any state and waits for it to reach
    /// [`ConnectionState::Disconnected`].
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(_e) = self.join.await {
            #[cfg(feature = "tracing")]
            tracing::error!("channel client task failed: {_e}");
        }
    }
}
