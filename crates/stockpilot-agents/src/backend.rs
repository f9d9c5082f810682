use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use stockpilot_models::{BackendConfig, BidRequest, MarketplaceSummary};
use tracing::{debug, warn};

use crate::error::AgentError;

/// The trading backend's marketplace API.
#[async_trait]
pub trait TradingBackend: Send + Sync {
    /// Current bid/match counts. Never fails: an unreachable backend reads as
    /// an idle market.
    async fn marketplace_summary(&self) -> MarketplaceSummary;

    /// Submit a bid. Only HTTP 201 counts as accepted.
    async fn submit_bid(&self, bid: &BidRequest) -> Result<(), AgentError>;
}

#[derive(Debug, Deserialize, Default)]
struct Envelope<T> {
    #[serde(default)]
    data: T,
}

#[derive(Debug, Deserialize, Default)]
struct BidsData {
    #[serde(default)]
    bids: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
struct MatchesData {
    #[serde(default)]
    matches: Vec<serde_json::Value>,
}

/// reqwest-backed client for `{base_url}/marketplace/*`.
pub struct HttpTradingBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTradingBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn count_bids(&self) -> Result<usize, AgentError> {
        let response = self
            .client
            .get(self.url("marketplace/bids"))
            .send()
            .await?
            .error_for_status()?;
        let envelope: Envelope<BidsData> = response.json().await?;
        Ok(envelope.data.bids.len())
    }

    async fn count_matches(&self) -> Result<usize, AgentError> {
        let response = self
            .client
            .get(self.url("marketplace/matches"))
            .send()
            .await?
            .error_for_status()?;
        let envelope: Envelope<MatchesData> = response.json().await?;
        Ok(envelope.data.matches.len())
    }
}

#[async_trait]
impl TradingBackend for HttpTradingBackend {
    async fn marketplace_summary(&self) -> MarketplaceSummary {
        let counts = async {
            let bids = self.count_bids().await?;
            let matches = self.count_matches().await?;
            Ok::<_, AgentError>((bids, matches))
        };
        match counts.await {
            Ok((bids, matches)) => MarketplaceSummary::from_counts(bids, matches),
            Err(e) => {
                warn!(error = %e, "Failed to fetch marketplace data");
                MarketplaceSummary::default()
            }
        }
    }

    async fn submit_bid(&self, bid: &BidRequest) -> Result<(), AgentError> {
        let response = self
            .client
            .post(self.url("marketplace/bids"))
            .json(bid)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::CREATED {
            debug!(product_id = %bid.product_id, "Bid accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AgentError::BackendExecutionFailure {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockpilot_models::{MarketActivity, Urgency};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpTradingBackend {
        HttpTradingBackend::new(&BackendConfig {
            base_url: format!("{}/api/v1/", server.uri()),
            timeout_seconds: 2,
        })
        .unwrap()
    }

    fn bid() -> BidRequest {
        BidRequest {
            product_id: "P1".to_string(),
            source_store_id: "S1".to_string(),
            target_store_id: "S2".to_string(),
            quantity: 100,
            max_price: dec!(96),
            urgency: Urgency::High,
            reasoning: "S2 critically low".to_string(),
        }
    }

    #[tokio::test]
    async fn summary_counts_bids_and_matches() {
        let server = MockServer::start().await;
        let bids: Vec<serde_json::Value> = (0..11).map(|i| serde_json::json!({"id": i})).collect();
        Mock::given(method("GET"))
            .and(path("/api/v1/marketplace/bids"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"bids": bids}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/marketplace/matches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"data": {"matches": [{"id": 1}, {"id": 2}]}}),
            ))
            .mount(&server)
            .await;

        let summary = backend(&server).marketplace_summary().await;
        assert_eq!(summary.active_bids, 11);
        assert_eq!(summary.recent_matches, 2);
        assert_eq!(summary.market_activity, MarketActivity::High);
    }

    #[tokio::test]
    async fn summary_is_zero_when_backend_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert_eq!(
            backend(&server).marketplace_summary().await,
            MarketplaceSummary::default()
        );
    }

    #[tokio::test]
    async fn bid_accepted_on_201() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/marketplace/bids"))
            .and(body_partial_json(serde_json::json!({
                "productId": "P1",
                "sourceStoreId": "S1",
                "targetStoreId": "S2",
                "quantity": 100,
                "maxPrice": 96.0
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server).submit_bid(&bid()).await.unwrap();
    }

    #[tokio::test]
    async fn bid_refused_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/marketplace/bids"))
            .respond_with(ResponseTemplate::new(200).set_body_string("duplicate bid"))
            .mount(&server)
            .await;

        let err = backend(&server).submit_bid(&bid()).await.unwrap_err();
        match err {
            AgentError::BackendExecutionFailure { status, body } => {
                assert_eq!(status, 200);
                assert_eq!(body, "duplicate bid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
