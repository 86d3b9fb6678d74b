//! Track one order against a running backend.
//!
//! Resolves the API origin from MORSEL_API_URL (default http://localhost:8080)
//! and follows the order until it reaches the terminal stage.
//!
//! Run: cargo run --example track_order -- <order-id>

use morsel_client::{OrderTracker, TrackerConfig, TrackerState};
use shared::StagePipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let order_id = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: track_order <order-id>"))?;

    let config = TrackerConfig::from_env();
    println!("tracking {order_id} via {}", config.base_url);

    let mut tracker = OrderTracker::new(config, StagePipeline::delivery());
    let mut states = tracker.subscribe();
    tracker.start(&order_id);

    loop {
        states.changed().await?;
        let state = states.borrow_and_update().clone();
        match state {
            TrackerState::Loading { order_id } => println!("loading {order_id}..."),
            TrackerState::Error { error, .. } => {
                eprintln!("tracking failed: {error}");
                break;
            }
            TrackerState::Tracking {
                snapshot,
                stage_index,
                ..
            } => {
                match stage_index {
                    Some(i) => println!("[{}/{}] {}", i + 1, tracker.pipeline().len(), snapshot.status),
                    None => println!("[?] {}", snapshot.status),
                }
                if tracker.pipeline().is_terminal(&snapshot.status) {
                    break;
                }
            }
            TrackerState::Idle => {}
        }
    }

    tracker.stop();
    Ok(())
}
