//! dolarbluebolivia.click aggregator adapter.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::errors::FetchError;
use crate::providers::BasketProvider;
use crate::rates::CurrencyBasket;

pub const DEFAULT_BASE_URL: &str = "https://www.dolarbluebolivia.click";

const EXCHANGE_PATH: &str = "/api/exchange_currencies";

pub struct DolarBlueProvider {
    base_url: String,
}

impl DolarBlueProvider {
    pub fn new(base_url: &str) -> Self {
        DolarBlueProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BasketProvider for DolarBlueProvider {
    #[instrument(name = "BasketFetch", skip(self))]
    async fn fetch_basket(&self) -> Result<CurrencyBasket, FetchError> {
        let url = format!("{}{}", self.base_url, EXCHANGE_PATH);
        debug!("Requesting currency basket from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("paralelo/0.2")
            .build()?;

        let response = client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamHttp { status });
        }

        let text = response.text().await?;
        let basket: CurrencyBasket = serde_json::from_str(&text)
            .map_err(|e| FetchError::MalformedResponse(format!("exchange currencies: {e}")))?;

        debug!(blue_buy = basket.blue.buy, "Decoded currency basket");
        Ok(basket)
    }
}
