//! Live status channel
//!
//! Delivers near-real-time status events for exactly one order. Push mode
//! rides a WebSocket; when push is unavailable the channel degrades silently
//! to interval polling and keeps re-attempting push with exponential backoff.
//! There is no giving-up state: a subscription runs until its owner closes it.

mod poll;
mod push;

use crate::api::SnapshotFetch;
use crate::config::{TrackerConfig, TransportMode};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identity of one tracking session / subscription
pub type SessionId = Uuid;

/// Health of the live channel
///
/// `Open` means events are flowing over the preferred transport; `Failed`
/// means push is down and, in `Auto` mode, polling is covering for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
    Failed,
}

/// One status event, tagged with the subscription that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub session: SessionId,
    pub status: String,
}

/// Emission side of a subscription, handed to transports
///
/// The sink is the only path events take out of a transport, and it
/// re-checks the cancellation token on every emit: once the subscription is
/// closed, late deliveries from a still-draining transport are dropped here
/// rather than trusted to stop at the transport level.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl EventSink {
    /// Emit a status event. Returns false once the subscription is closed.
    pub fn emit(&self, status: impl Into<String>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx
            .send(StatusUpdate {
                session: self.session,
                status: status.into(),
            })
            .is_ok()
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Live association between one order identifier and one running transport
#[derive(Debug)]
pub struct Subscription {
    session: SessionId,
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<StatusUpdate>,
    state: watch::Receiver<ChannelState>,
}

impl Subscription {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Close the subscription.
    ///
    /// Idempotent and safe in any phase, including while a push connect is
    /// still pending (the pending open is cancelled, not leaked).
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Receive the next status event; `None` once the subscription closes.
    pub async fn recv(&mut self) -> Option<StatusUpdate> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            update = self.events.recv() => update,
        }
    }

    /// Current channel health
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Watch for channel health changes
    pub fn state_watch(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Factory for status subscriptions
///
/// The transport strategy is fixed at construction from the configuration;
/// business code never feature-sniffs mid-session.
pub struct StatusChannel {
    config: TrackerConfig,
    fetcher: Arc<dyn SnapshotFetch>,
}

impl StatusChannel {
    pub fn new(config: TrackerConfig, fetcher: Arc<dyn SnapshotFetch>) -> Self {
        Self { config, fetcher }
    }

    /// Open a subscription for one order with a fresh identity.
    pub fn open(&self, order_id: &str) -> Subscription {
        self.open_with(order_id, SessionId::new_v4(), CancellationToken::new())
    }

    /// Open a subscription with a caller-supplied identity and token.
    ///
    /// The tracker uses this to tie the subscription's lifetime to a session
    /// token it already owns.
    pub fn open_with(
        &self,
        order_id: &str,
        session: SessionId,
        cancel: CancellationToken,
    ) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);

        let worker = ChannelWorker {
            order_id: order_id.to_string(),
            config: self.config.clone(),
            fetcher: self.fetcher.clone(),
            sink: EventSink {
                session,
                cancel: cancel.clone(),
                tx,
            },
            state: state_tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(worker.run());

        Subscription {
            session,
            cancel,
            events: rx,
            state: state_rx,
        }
    }
}

/// Background task driving one subscription's transports
struct ChannelWorker {
    order_id: String,
    config: TrackerConfig,
    fetcher: Arc<dyn SnapshotFetch>,
    sink: EventSink,
    state: watch::Sender<ChannelState>,
    cancel: CancellationToken,
}

impl ChannelWorker {
    async fn run(self) {
        tracing::debug!(
            order_id = %self.order_id,
            session = %self.sink.session(),
            transport = ?self.config.transport,
            "status channel started"
        );

        match self.config.transport {
            TransportMode::Poll => self.poll_forever().await,
            TransportMode::Push => self.push_forever(false).await,
            TransportMode::Auto => self.push_forever(true).await,
        }

        let _ = self.state.send(ChannelState::Closed);
        tracing::debug!(
            order_id = %self.order_id,
            session = %self.sink.session(),
            "status channel stopped"
        );
    }

    async fn poll_forever(&self) {
        let _ = self.state.send(ChannelState::Open);
        let mut last_seen = None;
        poll::run(
            self.fetcher.as_ref(),
            &self.order_id,
            self.config.poll_interval,
            &self.sink,
            &self.cancel,
            &mut last_seen,
        )
        .await;
    }

    /// Push loop with reconnect backoff; in `Auto` mode the backoff window is
    /// spent polling so updates keep flowing while push is down.
    async fn push_forever(&self, fall_back_to_poll: bool) {
        let ws_url = self.config.ws_url(&self.order_id);
        let mut reconnect_delay = self.config.reconnect_initial;
        let mut last_seen: Option<String> = None;

        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let _ = self.state.send(ChannelState::Connecting);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = push::connect(&ws_url) => result,
            };

            match connected {
                Ok(ws) => {
                    reconnect_delay = self.config.reconnect_initial;
                    let _ = self.state.send(ChannelState::Open);
                    tracing::info!(order_id = %self.order_id, "live status channel connected");

                    match push::run_session(ws, &self.order_id, &self.sink, &self.cancel).await {
                        Ok(()) => return,
                        Err(e) => {
                            tracing::warn!(order_id = %self.order_id, error = %e, "live status channel lost")
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        order_id = %self.order_id,
                        error = %e,
                        delay_secs = reconnect_delay.as_secs(),
                        "live status channel connect failed"
                    )
                }
            }

            if self.cancel.is_cancelled() {
                return;
            }
            let _ = self.state.send(ChannelState::Failed);

            if fall_back_to_poll {
                // Poll until the backoff elapses, then try push again.
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = poll::run(
                        self.fetcher.as_ref(),
                        &self.order_id,
                        self.config.poll_interval,
                        &self.sink,
                        &self.cancel,
                        &mut last_seen,
                    ) => return,
                    _ = tokio::time::sleep(reconnect_delay) => {}
                }
            } else {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = tokio::time::sleep(reconnect_delay) => {}
                }
            }
            reconnect_delay = (reconnect_delay * 2).min(self.config.reconnect_max);
        }
    }
}
