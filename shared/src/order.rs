//! Order wire model
//!
//! Shapes mirror the backend's JSON bodies exactly; snapshots are
//! immutable-at-read and replaced wholesale, never patched in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Menu item as embedded in an order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price in currency unit
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
}

/// One line of a placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: String,
    pub item_id: i64,
    pub quantity: i32,
    /// Unit price captured at order time
    pub price: f64,
    pub item: MenuItemRef,
}

/// Full order state as reported by `GET /orders/{id}`
///
/// `status` is a free-form stage name; interpret it against a
/// [`StagePipeline`](crate::status::StagePipeline) rather than matching on
/// literals, so unknown stages stay displayable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    /// Total amount in currency unit
    pub total_price: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub order_items: Vec<OrderLineItem>,
}

impl OrderSnapshot {
    /// Replace the status, leaving every other field untouched.
    pub fn with_status(&self, status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..self.clone()
        }
    }
}

/// Order line as submitted by the cart collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub item_id: i64,
    pub quantity: i32,
}

/// Create order payload (`POST /orders`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    pub items: Vec<OrderLineRequest>,
}

/// Status change notification pushed over the live channel
///
/// The hub tags each frame with the order it belongs to; `order_id` is
/// optional on decode so older servers that omit it keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(rename = "orderId", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_decodes_backend_body() {
        let body = r#"{
            "id": "a1b2c3",
            "customer_name": "Asha",
            "customer_address": "12 Hill Road",
            "customer_phone": "9876543210",
            "total_price": 438.0,
            "status": "Order Received",
            "created_at": "2024-06-01T10:15:00Z",
            "order_items": [
                {
                    "id": 1,
                    "order_id": "a1b2c3",
                    "item_id": 7,
                    "quantity": 2,
                    "price": 219.0,
                    "item": {
                        "id": 7,
                        "name": "Paneer Wrap",
                        "description": "",
                        "price": 219.0,
                        "image_url": ""
                    }
                }
            ]
        }"#;

        let snapshot: OrderSnapshot = serde_json::from_str(body).unwrap();
        assert_eq!(snapshot.id, "a1b2c3");
        assert_eq!(snapshot.status, "Order Received");
        assert_eq!(snapshot.order_items.len(), 1);
        assert_eq!(snapshot.order_items[0].item.name, "Paneer Wrap");
    }

    #[test]
    fn test_with_status_replaces_only_status() {
        let snapshot: OrderSnapshot = serde_json::from_str(
            r#"{
                "id": "a1b2c3",
                "customer_name": "Asha",
                "customer_address": "12 Hill Road",
                "customer_phone": "9876543210",
                "total_price": 438.0,
                "status": "Order Received",
                "created_at": "2024-06-01T10:15:00Z",
                "order_items": []
            }"#,
        )
        .unwrap();

        let next = snapshot.with_status("Preparing");
        assert_eq!(next.status, "Preparing");
        assert_eq!(next.id, snapshot.id);
        assert_eq!(next.total_price, snapshot.total_price);
        assert_eq!(snapshot.status, "Order Received");
    }

    #[test]
    fn test_status_event_roundtrip() {
        let json = r#"{"orderId":"a1b2c3","status":"Preparing"}"#;
        let event: StatusEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.order_id.as_deref(), Some("a1b2c3"));
        assert_eq!(event.status, "Preparing");

        let encoded = serde_json::to_string(&event).unwrap();
        assert!(encoded.contains(r#""orderId":"a1b2c3""#));
    }

    #[test]
    fn test_status_event_without_order_id() {
        let event: StatusEvent = serde_json::from_str(r#"{"status":"Delivered"}"#).unwrap();
        assert_eq!(event.order_id, None);
        assert_eq!(event.status, "Delivered");
    }
}
