//! Order tracker - composition root
//!
//! Owns at most one tracking session at a time: seeds state from an HTTP
//! snapshot, opens the live channel, and republishes every reconciled update
//! on a watch channel for the UI layer. Session identity (not order-id
//! equality) gates every publish, so a superseded session can never touch
//! state, even across a stop/restart with the same identifier.

use crate::api::{OrderApi, SnapshotFetch};
use crate::channel::{SessionId, StatusChannel};
use crate::config::TrackerConfig;
use crate::error::FetchError;
use crate::reconcile::reconcile;
use shared::util::now_millis;
use shared::{OrderSnapshot, StagePipeline};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Externally visible tracking state
#[derive(Debug, Clone, Default)]
pub enum TrackerState {
    /// No session active
    #[default]
    Idle,

    /// Initial snapshot fetch in flight
    Loading { order_id: String },

    /// The initial fetch failed; call `start` again to retry
    Error {
        order_id: String,
        error: FetchError,
    },

    /// Live: snapshot is current and the channel is delivering updates
    Tracking {
        snapshot: OrderSnapshot,
        /// Position of `snapshot.status` in the pipeline; `None` when the
        /// server reports a stage the pipeline does not know
        stage_index: Option<usize>,
        /// Wall-clock millis of the last applied update
        updated_at: i64,
    },
}

impl TrackerState {
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackerState::Tracking { .. })
    }

    pub fn snapshot(&self) -> Option<&OrderSnapshot> {
        match self {
            TrackerState::Tracking { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn stage_index(&self) -> Option<usize> {
        match self {
            TrackerState::Tracking { stage_index, .. } => *stage_index,
            _ => None,
        }
    }
}

/// Grants state-publish rights to exactly one session at a time.
///
/// The session check and the send happen under one lock, so once `revoke`
/// returns no publish from the revoked session can succeed, including a
/// fetch that resolves late or a buffered channel event.
#[derive(Clone)]
struct PublishGate {
    active: Arc<Mutex<Option<SessionId>>>,
    tx: Arc<watch::Sender<TrackerState>>,
}

impl PublishGate {
    fn new(tx: watch::Sender<TrackerState>) -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            tx: Arc::new(tx),
        }
    }

    fn grant(&self, session: SessionId) {
        *self.active.lock().unwrap() = Some(session);
    }

    /// Revoke the current session and settle the published state to Idle.
    fn revoke(&self) {
        let mut active = self.active.lock().unwrap();
        *active = None;
        let _ = self.tx.send(TrackerState::Idle);
    }

    /// Publish on behalf of `session`; a stale session is ignored.
    fn publish(&self, session: SessionId, state: TrackerState) -> bool {
        let active = self.active.lock().unwrap();
        if *active != Some(session) {
            return false;
        }
        let _ = self.tx.send(state);
        true
    }
}

/// Tracks one order's lifecycle against the backend
pub struct OrderTracker {
    config: TrackerConfig,
    pipeline: StagePipeline,
    fetcher: Arc<dyn SnapshotFetch>,
    gate: PublishGate,
    state_rx: watch::Receiver<TrackerState>,
    active: Option<ActiveSession>,
}

struct ActiveSession {
    id: SessionId,
    order_id: String,
    cancel: CancellationToken,
}

impl OrderTracker {
    /// Create a tracker backed by the real HTTP API.
    pub fn new(config: TrackerConfig, pipeline: StagePipeline) -> Self {
        let fetcher = Arc::new(OrderApi::new(&config));
        Self::with_fetcher(config, pipeline, fetcher)
    }

    /// Create a tracker with a caller-supplied fetcher (tests, alternative
    /// backends).
    pub fn with_fetcher(
        config: TrackerConfig,
        pipeline: StagePipeline,
        fetcher: Arc<dyn SnapshotFetch>,
    ) -> Self {
        let (tx, rx) = watch::channel(TrackerState::Idle);
        Self {
            config,
            pipeline,
            fetcher,
            gate: PublishGate::new(tx),
            state_rx: rx,
            active: None,
        }
    }

    /// Watch tracking state. The receiver stays valid across sessions.
    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state_rx.clone()
    }

    /// Current tracking state
    pub fn state(&self) -> TrackerState {
        self.state_rx.borrow().clone()
    }

    pub fn pipeline(&self) -> &StagePipeline {
        &self.pipeline
    }

    /// Order identifier of the active session, if any
    pub fn order_id(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.order_id.as_str())
    }

    /// Begin tracking `order_id`.
    ///
    /// Any previous session is fully torn down first; a push event still in
    /// flight for it can never cross over into the new session. Must be
    /// called from within a Tokio runtime.
    pub fn start(&mut self, order_id: impl Into<String>) {
        let order_id = order_id.into();
        self.stop();

        let session = SessionId::new_v4();
        let cancel = CancellationToken::new();
        self.gate.grant(session);
        self.gate.publish(
            session,
            TrackerState::Loading {
                order_id: order_id.clone(),
            },
        );

        let worker = SessionWorker {
            session,
            order_id: order_id.clone(),
            cancel: cancel.clone(),
            config: self.config.clone(),
            pipeline: self.pipeline.clone(),
            fetcher: self.fetcher.clone(),
            gate: self.gate.clone(),
        };
        tokio::spawn(worker.run());

        self.active = Some(ActiveSession {
            id: session,
            order_id,
            cancel,
        });
    }

    /// Stop tracking. Idempotent; effective immediately.
    pub fn stop(&mut self) {
        if let Some(session) = self.active.take() {
            tracing::info!(
                order_id = %session.order_id,
                session = %session.id,
                "stopping tracking session"
            );
            session.cancel.cancel();
            self.gate.revoke();
        }
    }
}

impl Drop for OrderTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background task driving one tracking session
struct SessionWorker {
    session: SessionId,
    order_id: String,
    cancel: CancellationToken,
    config: TrackerConfig,
    pipeline: StagePipeline,
    fetcher: Arc<dyn SnapshotFetch>,
    gate: PublishGate,
}

impl SessionWorker {
    async fn run(self) {
        tracing::info!(
            order_id = %self.order_id,
            session = %self.session,
            "tracking session started"
        );

        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => {
                tracing::debug!(order_id = %self.order_id, "session cancelled during initial fetch");
                return;
            }
            result = self.fetcher.fetch_order(&self.order_id) => result,
        };

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(order_id = %self.order_id, error = %error, "initial order fetch failed");
                // No subscription is opened for a failed session.
                self.gate.publish(
                    self.session,
                    TrackerState::Error {
                        order_id: self.order_id.clone(),
                        error,
                    },
                );
                return;
            }
        };

        let stage_index = self.pipeline.index_of(&snapshot.status);
        let mut current = snapshot;
        if !self.gate.publish(
            self.session,
            TrackerState::Tracking {
                snapshot: current.clone(),
                stage_index,
                updated_at: now_millis(),
            },
        ) {
            return; // superseded while fetching
        }

        let channel = StatusChannel::new(self.config.clone(), self.fetcher.clone());
        let mut subscription =
            channel.open_with(&self.order_id, self.session, self.cancel.child_token());

        loop {
            let update = tokio::select! {
                _ = self.cancel.cancelled() => break,
                update = subscription.recv() => match update {
                    Some(update) => update,
                    None => break,
                },
            };

            let (next, stage_index) = reconcile(&self.pipeline, &current, &update.status);
            let reached_terminal =
                next.status != current.status && self.pipeline.is_terminal(&next.status);
            current = next;

            if !self.gate.publish(
                self.session,
                TrackerState::Tracking {
                    snapshot: current.clone(),
                    stage_index,
                    updated_at: now_millis(),
                },
            ) {
                break; // superseded mid-session
            }

            if reached_terminal {
                // The channel stays open; closing early is the owner's call.
                tracing::info!(order_id = %self.order_id, status = %current.status, "order reached terminal stage");
            }
        }

        subscription.close();
        tracing::info!(
            order_id = %self.order_id,
            session = %self.session,
            "tracking session stopped"
        );
    }
}
