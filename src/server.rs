//! HTTP proxy surface over the fetch adapters.
//!
//! Mirrors the envelope contract the web frontend consumes: every
//! response carries a `success` flag, failures answer 500 with the error
//! message inline, and nothing is cached between requests.

use std::sync::Arc;

use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, web};
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::providers::{BasketProvider, ParallelRateProvider, PriceRange, la_paz_now};
use crate::rates::CurrencyBasket;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_SOURCE: &str = "dolarbluebolivia.click";

pub struct ApiState {
    pub p2p: Arc<dyn ParallelRateProvider>,
    pub basket: Arc<dyn BasketProvider>,
    /// Label reported in the exchange-currencies envelope.
    pub source: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct P2pPriceOk {
    success: bool,
    buy_price: f64,
    sell_price: f64,
    last_update: String,
    timestamp: i64,
    buy_announcements_count: usize,
    sell_announcements_count: usize,
    buy_price_range: PriceRange,
    sell_price_range: PriceRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct P2pPriceFailed {
    success: bool,
    error: String,
    buy_price: f64,
    sell_price: f64,
    last_update: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeCurrenciesOk {
    success: bool,
    data: CurrencyBasket,
    last_update: String,
    timestamp: i64,
    source: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeCurrenciesFailed {
    success: bool,
    error: String,
    data: Option<CurrencyBasket>,
    last_update: String,
}

#[post("/api/p2p-price")]
async fn p2p_price(state: web::Data<ApiState>) -> impl Responder {
    match state.p2p.fetch_parallel_rate().await {
        Ok(snapshot) => HttpResponse::Ok().json(P2pPriceOk {
            success: true,
            buy_price: snapshot.buy_price,
            sell_price: snapshot.sell_price,
            last_update: snapshot.last_update,
            timestamp: snapshot.timestamp,
            buy_announcements_count: snapshot.buy_count,
            sell_announcements_count: snapshot.sell_count,
            buy_price_range: snapshot.buy_range,
            sell_price_range: snapshot.sell_range,
        }),
        Err(err) => {
            error!("P2P price fetch failed: {err}");
            HttpResponse::InternalServerError().json(P2pPriceFailed {
                success: false,
                error: err.to_string(),
                buy_price: 0.0,
                sell_price: 0.0,
                last_update: String::new(),
            })
        }
    }
}

#[get("/api/exchange-currencies")]
async fn exchange_currencies(state: web::Data<ApiState>) -> impl Responder {
    match state.basket.fetch_basket().await {
        Ok(basket) => HttpResponse::Ok().json(ExchangeCurrenciesOk {
            success: true,
            data: basket,
            last_update: la_paz_now(),
            timestamp: Utc::now().timestamp_millis(),
            source: state.source.clone(),
        }),
        Err(err) => {
            error!("Exchange currencies fetch failed: {err}");
            HttpResponse::InternalServerError().json(ExchangeCurrenciesFailed {
                success: false,
                error: err.to_string(),
                data: None,
                last_update: String::new(),
            })
        }
    }
}

pub async fn serve(listen: &str, state: ApiState) -> anyhow::Result<()> {
    let data = web::Data::new(state);
    info!("Serving rate API on http://{listen}");

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .service(p2p_price)
            .service(exchange_currencies)
    })
    .bind(listen)
    .with_context(|| format!("Failed to bind {listen}"))?
    .run()
    .await
    .context("Rate API server terminated abnormally")
}
