//! Error taxonomy for upstream fetches and rate computation.

use thiserror::Error;

use crate::currency::Currency;
use crate::providers::TradeSide;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream returned HTTP {status}")]
    UpstreamHttp { status: reqwest::StatusCode },

    #[error("no {side} listings returned")]
    NoListings { side: TradeSide },

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RateError {
    #[error("no conversion route from {from} to {to}")]
    UnsupportedPair { from: Currency, to: Currency },

    #[error("parallel USD/BOB price not available")]
    AnchorUnavailable,
}
