pub mod binance;
pub mod dolarblue;
pub mod util;

use std::fmt;

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde::Serialize;

use crate::errors::FetchError;
use crate::rates::CurrencyBasket;

pub use binance::BinanceP2pProvider;
pub use dolarblue::DolarBlueProvider;

/// Advertisement side on the P2P marketplace, from the taker's point of
/// view: `Buy` listings sell USDT for BOB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Wire value for the listings search request.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("buy"),
            TradeSide::Sell => f.write_str("sell"),
        }
    }
}

/// Diagnostic min/max spread over one side's advertisement window. Not
/// used in conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// One successful reduction of the P2P advertisement window.
#[derive(Debug, Clone, PartialEq)]
pub struct P2pSnapshot {
    pub buy_price: f64,
    pub sell_price: f64,
    pub last_update: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub buy_count: usize,
    pub sell_count: usize,
    pub buy_range: PriceRange,
    pub sell_range: PriceRange,
}

#[async_trait]
pub trait ParallelRateProvider: Send + Sync {
    async fn fetch_parallel_rate(&self) -> Result<P2pSnapshot, FetchError>;
}

#[async_trait]
pub trait BasketProvider: Send + Sync {
    async fn fetch_basket(&self) -> Result<CurrencyBasket, FetchError>;
}

/// Offset for America/La_Paz. Bolivia observes no DST.
const LA_PAZ_UTC_OFFSET_SECS: i32 = -4 * 3600;

/// Current time in La Paz, formatted the way the rate consumers display
/// update stamps.
pub fn la_paz_now() -> String {
    let offset = FixedOffset::east_opt(LA_PAZ_UTC_OFFSET_SECS).expect("valid fixed offset");
    Utc::now()
        .with_timezone(&offset)
        .format("%d/%m/%Y, %H:%M:%S")
        .to_string()
}
