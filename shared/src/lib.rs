//! Shared types for the Morsel order tracking engine
//!
//! Wire-level value types exchanged with the ordering backend plus the
//! stage pipeline vocabulary used to interpret order status values.

pub mod order;
pub mod status;
pub mod util;

// Re-exports
pub use order::{CreateOrderRequest, MenuItemRef, OrderLineItem, OrderLineRequest, OrderSnapshot, StatusEvent};
pub use status::{PipelineError, StagePipeline};
