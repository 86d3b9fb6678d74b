// morsel-client/tests/live_channel.rs
// Live channel behavior against an in-process backend: push delivery,
// client-side frame filtering, and the push -> poll fallback.

use async_trait::async_trait;
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use morsel_client::{
    FetchError, FetchResult, OrderTracker, SnapshotFetch, StatusChannel, TrackerConfig,
    TrackerState,
};
use shared::{OrderSnapshot, StagePipeline};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

fn snapshot(id: &str, status: &str) -> OrderSnapshot {
    OrderSnapshot {
        id: id.to_string(),
        customer_name: "Asha".to_string(),
        customer_address: "12 Hill Road".to_string(),
        customer_phone: "9876543210".to_string(),
        total_price: 438.0,
        status: status.to_string(),
        created_at: chrono::Utc::now(),
        order_items: Vec::new(),
    }
}

/// In-process stand-in for the ordering backend.
#[derive(Clone)]
struct Backend {
    orders: Arc<Mutex<HashMap<String, OrderSnapshot>>>,
    updates: broadcast::Sender<(String, String)>,
    ws_clients: Arc<AtomicUsize>,
}

impl Backend {
    fn new() -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            orders: Arc::new(Mutex::new(HashMap::new())),
            updates,
            ws_clients: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn insert(&self, snapshot: OrderSnapshot) {
        self.orders
            .lock()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot);
    }

    /// Update stored state and push a status frame to every socket.
    fn set_status(&self, order_id: &str, status: &str) {
        if let Some(order) = self.orders.lock().unwrap().get_mut(order_id) {
            order.status = status.to_string();
        }
        let _ = self.updates.send((order_id.to_string(), status.to_string()));
    }

    async fn wait_for_ws_client(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.ws_clients.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("no websocket client connected");
    }
}

async fn get_order(State(backend): State<Backend>, Path(id): Path<String>) -> Response {
    match backend.orders.lock().unwrap().get(&id) {
        Some(order) => axum::Json(order.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "Order not found").into_response(),
    }
}

async fn order_status_ws(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let order_id = params.get("orderId").cloned().unwrap_or_default();
    let updates = backend.updates.subscribe();
    let clients = backend.ws_clients.clone();
    ws.on_upgrade(move |socket| stream_status(socket, order_id, updates, clients))
}

// Forwards every update tagged with its own order id; discarding frames for
// other orders is the client's job and one test relies on that.
async fn stream_status(
    mut socket: WebSocket,
    _order_id: String,
    mut updates: broadcast::Receiver<(String, String)>,
    clients: Arc<AtomicUsize>,
) {
    clients.fetch_add(1, Ordering::SeqCst);
    while let Ok((id, status)) = updates.recv().await {
        let frame = serde_json::json!({"orderId": id, "status": status}).to_string();
        if socket.send(Message::Text(frame.into())).await.is_err() {
            break;
        }
    }
}

async fn spawn_app(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_backend(backend: Backend) -> SocketAddr {
    let app = Router::new()
        .route("/orders/{id}", get(get_order))
        .route("/ws/order-status", get(order_status_ws))
        .with_state(backend);
    spawn_app(app).await
}

async fn wait_for_stage(
    states: &mut watch::Receiver<TrackerState>,
    want: Option<usize>,
) -> OrderSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = states.borrow_and_update();
                if let TrackerState::Tracking {
                    snapshot,
                    stage_index,
                    ..
                } = &*state
                    && *stage_index == want
                {
                    return snapshot.clone();
                }
            }
            states.changed().await.expect("tracker dropped");
        }
    })
    .await
    .expect("timed out waiting for stage")
}

#[tokio::test]
async fn test_push_updates_drive_tracking() {
    let backend = Backend::new();
    backend.insert(snapshot("ord-1", "Order Received"));
    let addr = spawn_backend(backend.clone()).await;

    let config = TrackerConfig::new(format!("http://{addr}"));
    let mut tracker = OrderTracker::new(config, StagePipeline::delivery());
    let mut states = tracker.subscribe();

    tracker.start("ord-1");
    wait_for_stage(&mut states, Some(0)).await;
    backend.wait_for_ws_client().await;

    backend.set_status("ord-1", "Preparing");
    wait_for_stage(&mut states, Some(1)).await;

    // A frame tagged for some other order must not leak into this session.
    backend.set_status("ord-2", "Delivered");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(tracker.state().stage_index(), Some(1));

    backend.set_status("ord-1", "Out for Delivery");
    wait_for_stage(&mut states, Some(2)).await;

    backend.set_status("ord-1", "Delivered");
    let last = wait_for_stage(&mut states, Some(3)).await;
    assert_eq!(last.status, "Delivered");

    // Terminal status leaves the session tracking until the owner stops it.
    assert!(tracker.state().is_tracking());
    tracker.stop();
    assert!(matches!(tracker.state(), TrackerState::Idle));
}

#[tokio::test]
async fn test_missing_order_maps_to_not_found() {
    let backend = Backend::new();
    let addr = spawn_backend(backend).await;

    let config = TrackerConfig::new(format!("http://{addr}"));
    let mut tracker = OrderTracker::new(config, StagePipeline::delivery());
    let mut states = tracker.subscribe();

    tracker.start("missing-id");
    let error = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = states.borrow_and_update();
                if let TrackerState::Error { error, .. } = &*state {
                    return error.clone();
                }
            }
            states.changed().await.expect("tracker dropped");
        }
    })
    .await
    .expect("timed out waiting for error state");

    assert!(matches!(error, FetchError::NotFound(_)));
}

#[tokio::test]
async fn test_push_failure_falls_back_to_polling() {
    // HTTP works but there is no websocket route: the upgrade fails and the
    // channel must cover with polling instead.
    let backend = Backend::new();
    backend.insert(snapshot("ord-1", "Preparing"));
    let app = Router::new()
        .route("/orders/{id}", get(get_order))
        .with_state(backend.clone());
    let addr = spawn_app(app).await;

    let config = TrackerConfig::new(format!("http://{addr}"))
        .with_poll_interval(Duration::from_millis(30))
        .with_reconnect(Duration::from_secs(5), Duration::from_secs(5));
    let mut tracker = OrderTracker::new(config, StagePipeline::delivery());
    let mut states = tracker.subscribe();

    tracker.start("ord-1");
    wait_for_stage(&mut states, Some(1)).await;

    backend.set_status("ord-1", "Out for Delivery");
    wait_for_stage(&mut states, Some(2)).await;
}

#[tokio::test]
async fn test_channel_degrades_to_poll_on_connect_refused() {
    struct FixedBackend;

    #[async_trait]
    impl SnapshotFetch for FixedBackend {
        async fn fetch_order(&self, order_id: &str) -> FetchResult<OrderSnapshot> {
            Ok(snapshot(order_id, "Preparing"))
        }
    }

    // Nothing listens on the target port; the connect is refused outright.
    let config = TrackerConfig::new("http://127.0.0.1:1")
        .with_poll_interval(Duration::from_millis(30))
        .with_reconnect(Duration::from_secs(10), Duration::from_secs(10));

    let channel = StatusChannel::new(config, Arc::new(FixedBackend));
    let mut subscription = channel.open("ord-1");

    let update = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("no fallback update within deadline")
        .expect("subscription closed unexpectedly");
    assert_eq!(update.status, "Preparing");

    subscription.close();
    subscription.close();
    assert!(subscription.is_closed());
    assert_eq!(subscription.recv().await, None);
}
