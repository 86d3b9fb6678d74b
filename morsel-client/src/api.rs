//! HTTP client for the ordering backend

use crate::config::TrackerConfig;
use crate::error::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::{CreateOrderRequest, OrderSnapshot};

/// Read seam over the order backend
///
/// Implemented by [`OrderApi`] for the real backend and by fakes in tests.
/// No retry policy lives here; retries belong to the caller.
#[async_trait]
pub trait SnapshotFetch: Send + Sync {
    /// Fetch the current full order record for `order_id`.
    async fn fetch_order(&self, order_id: &str) -> FetchResult<OrderSnapshot>;
}

/// HTTP client for order snapshot and order management calls
#[derive(Debug, Clone)]
pub struct OrderApi {
    client: Client,
    base_url: String,
}

impl OrderApi {
    /// Create a new API client from configuration
    pub fn new(config: &TrackerConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one order (`GET /orders/{id}`)
    pub async fn get_order(&self, order_id: &str) -> FetchResult<OrderSnapshot> {
        let url = format!("{}/orders/{}", self.base_url, order_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        Self::handle_response(response, order_id).await
    }

    /// Place an order (`POST /orders`), returning the seed snapshot
    pub async fn create_order(&self, request: &CreateOrderRequest) -> FetchResult<OrderSnapshot> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        Self::handle_response(response, "new order").await
    }

    /// Order history for one customer (`GET /users/{name}/orders`)
    pub async fn customer_orders(&self, customer: &str) -> FetchResult<Vec<OrderSnapshot>> {
        let url = format!("{}/users/{}/orders", self.base_url, customer);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        Self::handle_response(response, customer).await
    }

    /// Map an HTTP response onto the fetch error taxonomy.
    ///
    /// Only 404 is terminal; every other non-success status is treated as a
    /// retryable hiccup from the client's point of view.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
        subject: &str,
    ) -> FetchResult<T> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(subject.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::Transient(format!("status {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Schema(e.to_string()))
    }
}

#[async_trait]
impl SnapshotFetch for OrderApi {
    async fn fetch_order(&self, order_id: &str) -> FetchResult<OrderSnapshot> {
        self.get_order(order_id).await
    }
}
