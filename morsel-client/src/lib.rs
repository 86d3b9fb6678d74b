//! Morsel Client - order status synchronization engine
//!
//! Tracks one placed order against the ordering backend: seeds from an HTTP
//! snapshot, then follows live status updates over a WebSocket channel with a
//! polling fallback, publishing the reconciled progress for the UI layer.

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod tracker;

pub use api::{OrderApi, SnapshotFetch};
pub use channel::{ChannelState, SessionId, StatusChannel, StatusUpdate, Subscription};
pub use config::{TrackerConfig, TransportMode};
pub use error::{ChannelError, FetchError, FetchResult};
pub use reconcile::reconcile;
pub use tracker::{OrderTracker, TrackerState};

// Re-export shared types for convenience
pub use shared::{CreateOrderRequest, OrderSnapshot, StagePipeline, StatusEvent};
