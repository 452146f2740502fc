//! Binance P2P advertisement adapter.
//!
//! Reduces the BUY and SELL advertisement windows for USDT/BOB to one
//! averaged price per side.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::FetchError;
use crate::providers::{P2pSnapshot, ParallelRateProvider, PriceRange, TradeSide, la_paz_now};
use crate::rates::mean;

pub const DEFAULT_BASE_URL: &str = "https://p2p.binance.com";

const SEARCH_PATH: &str = "/bapi/c2c/v2/friendly/c2c/adv/search";
const ASSET: &str = "USDT";
const FIAT: &str = "BOB";
/// Advertisement page requested for both sides. Page 1 is skipped: the top
/// of book is dominated by unrealistic teaser quotes. Tunable, not a
/// protocol requirement.
const PAGE: u32 = 2;
const BUY_ROWS: u32 = 10;
const SELL_ROWS: u32 = 5;

pub struct BinanceP2pProvider {
    base_url: String,
}

impl BinanceP2pProvider {
    pub fn new(base_url: &str) -> Self {
        BinanceP2pProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn search(
        &self,
        client: &reqwest::Client,
        side: TradeSide,
        rows: u32,
    ) -> Result<Vec<f64>, FetchError> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        debug!("Requesting {} advertisements from {}", side, url);

        let request = SearchRequest {
            asset: ASSET,
            fiat: FIAT,
            trade_type: side.as_str(),
            page: PAGE,
            rows,
            pay_types: Vec::new(),
        };

        let response = client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamHttp { status });
        }

        let text = response.text().await?;
        let decoded: SearchResponse = serde_json::from_str(&text)
            .map_err(|e| FetchError::MalformedResponse(format!("{side} listings search: {e}")))?;

        if decoded.data.is_empty() {
            return Err(FetchError::NoListings { side });
        }

        decoded
            .data
            .iter()
            .map(|listing| {
                listing.adv.price.parse::<f64>().map_err(|_| {
                    FetchError::MalformedResponse(format!(
                        "unparsable {side} price '{}'",
                        listing.adv.price
                    ))
                })
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    asset: &'a str,
    fiat: &'a str,
    trade_type: &'a str,
    page: u32,
    rows: u32,
    pay_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    adv: Advertisement,
}

#[derive(Debug, Deserialize)]
struct Advertisement {
    price: String,
}

fn price_range(prices: &[f64]) -> PriceRange {
    PriceRange {
        min: prices.iter().copied().fold(f64::INFINITY, f64::min),
        max: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

#[async_trait]
impl ParallelRateProvider for BinanceP2pProvider {
    #[instrument(name = "P2pFetch", skip(self))]
    async fn fetch_parallel_rate(&self) -> Result<P2pSnapshot, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("paralelo/0.2")
            .build()?;

        let buy_prices = self.search(&client, TradeSide::Buy, BUY_ROWS).await?;
        let sell_prices = self.search(&client, TradeSide::Sell, SELL_ROWS).await?;

        let snapshot = P2pSnapshot {
            buy_price: mean(&buy_prices),
            sell_price: mean(&sell_prices),
            last_update: la_paz_now(),
            timestamp: Utc::now().timestamp_millis(),
            buy_count: buy_prices.len(),
            sell_count: sell_prices.len(),
            buy_range: price_range(&buy_prices),
            sell_range: price_range(&sell_prices),
        };

        debug!(
            buy = snapshot.buy_price,
            sell = snapshot.sell_price,
            "Reduced P2P advertisement window"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listings_body(prices: &[&str]) -> serde_json::Value {
        json!({
            "data": prices
                .iter()
                .map(|p| json!({"adv": {"price": p, "tradeType": "BUY"}}))
                .collect::<Vec<_>>()
        })
    }

    async fn mount_side(server: &MockServer, side: &str, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_partial_json(json!({"tradeType": side})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_successful_fetch_averages_each_side() {
        let server = MockServer::start().await;
        mount_side(&server, "BUY", listings_body(&["13.40", "13.45", "13.50"])).await;
        mount_side(&server, "SELL", listings_body(&["13.60", "13.70"])).await;

        let provider = BinanceP2pProvider::new(&server.uri());
        let snapshot = provider.fetch_parallel_rate().await.unwrap();

        assert!((snapshot.buy_price - 13.45).abs() < 1e-9);
        assert!((snapshot.sell_price - 13.65).abs() < 1e-9);
        assert_eq!(snapshot.buy_count, 3);
        assert_eq!(snapshot.sell_count, 2);
        assert_eq!(snapshot.buy_range.min, 13.40);
        assert_eq!(snapshot.buy_range.max, 13.50);
        assert!(snapshot.timestamp > 0);
        assert!(!snapshot.last_update.is_empty());
    }

    #[tokio::test]
    async fn test_request_pins_asset_pair_and_paging_window() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_partial_json(json!({
                "asset": "USDT",
                "fiat": "BOB",
                "tradeType": "BUY",
                "page": 2,
                "rows": 10,
                "payTypes": []
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(listings_body(&["13.45"])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_partial_json(json!({
                "tradeType": "SELL",
                "page": 2,
                "rows": 5
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(listings_body(&["13.65"])),
            )
            .mount(&server)
            .await;

        let provider = BinanceP2pProvider::new(&server.uri());
        assert!(provider.fetch_parallel_rate().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_buy_listings_fail_with_no_listings() {
        let server = MockServer::start().await;
        mount_side(&server, "BUY", json!({"data": []})).await;
        mount_side(&server, "SELL", listings_body(&["13.65"])).await;

        let provider = BinanceP2pProvider::new(&server.uri());
        let err = provider.fetch_parallel_rate().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::NoListings {
                side: TradeSide::Buy
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_data_key_counts_as_empty() {
        let server = MockServer::start().await;
        mount_side(&server, "BUY", json!({"code": "000000"})).await;
        mount_side(&server, "SELL", listings_body(&["13.65"])).await;

        let provider = BinanceP2pProvider::new(&server.uri());
        assert!(matches!(
            provider.fetch_parallel_rate().await.unwrap_err(),
            FetchError::NoListings { .. }
        ));
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let provider = BinanceP2pProvider::new(&server.uri());
        let err = provider.fetch_parallel_rate().await.unwrap_err();
        match err {
            FetchError::UpstreamHttp { status } => assert_eq!(status.as_u16(), 502),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unparsable_price_is_malformed() {
        let server = MockServer::start().await;
        mount_side(&server, "BUY", listings_body(&["13.40", "not-a-price"])).await;
        mount_side(&server, "SELL", listings_body(&["13.65"])).await;

        let provider = BinanceP2pProvider::new(&server.uri());
        let err = provider.fetch_parallel_rate().await.unwrap_err();
        match err {
            FetchError::MalformedResponse(msg) => assert!(msg.contains("not-a-price")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let provider = BinanceP2pProvider::new(&server.uri());
        assert!(matches!(
            provider.fetch_parallel_rate().await.unwrap_err(),
            FetchError::MalformedResponse(_)
        ));
    }
}
