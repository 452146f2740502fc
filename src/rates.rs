//! Quote math: averaging, the conversion engine, and unit values.

use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::errors::RateError;

/// Quotes below this many units per USD are treated as "strong" (EUR, GBP)
/// and the rest as "weak" (ARS, CLP). A display and orientation heuristic,
/// not an economic classification.
pub const STRONG_CUTOFF: f64 = 10.0;

/// One currency's buy/sell price pair against the US dollar. Replaced
/// wholesale on each successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub buy: f64,
    pub sell: f64,
}

impl Quote {
    /// Midpoint of the buy and sell prices.
    pub fn avg(&self) -> f64 {
        (self.buy + self.sell) / 2.0
    }

    pub fn is_strong(&self) -> bool {
        self.buy < STRONG_CUTOFF
    }
}

/// Reference basket as served by the aggregator. Field names on the wire
/// are the aggregator's Spanish labels; all nine keys are required, so a
/// response missing any of them fails decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyBasket {
    #[serde(rename = "Euro")]
    pub eur: Quote,
    #[serde(rename = "Libra Esterlina")]
    pub gbp: Quote,
    #[serde(rename = "Peso Argentino")]
    pub ars: Quote,
    #[serde(rename = "Peso Chileno")]
    pub clp: Quote,
    #[serde(rename = "Real Brasileño")]
    pub brl: Quote,
    #[serde(rename = "Sol Peruano")]
    pub pen: Quote,
    #[serde(rename = "Yuan Chino")]
    pub cny: Quote,
    pub blue: Quote,
    pub official: Quote,
}

impl CurrencyBasket {
    /// Quote for a basket currency; `None` for USD and BOB, which are
    /// anchored by the P2P price instead of the basket.
    pub fn quote(&self, currency: Currency) -> Option<&Quote> {
        match currency {
            Currency::Eur => Some(&self.eur),
            Currency::Gbp => Some(&self.gbp),
            Currency::Ars => Some(&self.ars),
            Currency::Clp => Some(&self.clp),
            Currency::Brl => Some(&self.brl),
            Currency::Pen => Some(&self.pen),
            Currency::Cny => Some(&self.cny),
            Currency::Usd | Currency::Bob => None,
        }
    }
}

/// Arithmetic mean. Empty input yields 0.0; the fetch adapters reject
/// empty advertisement lists before reducing them.
pub fn mean(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().sum::<f64>() / prices.len() as f64
}

/// Conversion rate between two supported currencies, anchored on the
/// P2P-derived USD/BOB buy price.
pub fn try_rate(
    from: Currency,
    to: Currency,
    usd_bob_buy: f64,
    basket: &CurrencyBasket,
) -> Result<f64, RateError> {
    use Currency::{Bob, Usd};

    if from == to {
        return Ok(1.0);
    }
    if usd_bob_buy <= 0.0 {
        return Err(RateError::AnchorUnavailable);
    }

    match (from, to) {
        (Usd, Bob) => Ok(usd_bob_buy),
        (Bob, Usd) => Ok(1.0 / usd_bob_buy),
        (_, Bob) => {
            let quote = basket
                .quote(from)
                .ok_or(RateError::UnsupportedPair { from, to })?;
            let avg = quote.avg();
            if quote.is_strong() {
                Ok((1.0 / avg) * usd_bob_buy)
            } else {
                Ok(usd_bob_buy / avg)
            }
        }
        (Bob, _) => {
            // Orientation is identical for strong and weak quotes in this
            // direction.
            let quote = basket
                .quote(to)
                .ok_or(RateError::UnsupportedPair { from, to })?;
            Ok(quote.avg() / usd_bob_buy)
        }
        _ => Err(RateError::UnsupportedPair { from, to }),
    }
}

/// Like [`try_rate`], but collapses every error to the 0.0 sentinel for
/// display paths that render unsupported pairs as a zero rate.
pub fn rate(from: Currency, to: Currency, usd_bob_buy: f64, basket: &CurrencyBasket) -> f64 {
    try_rate(from, to, usd_bob_buy, basket).unwrap_or(0.0)
}

pub fn convert(
    amount: f64,
    from: Currency,
    to: Currency,
    usd_bob_buy: f64,
    basket: &CurrencyBasket,
) -> Result<f64, RateError> {
    Ok(amount * try_rate(from, to, usd_bob_buy, basket)?)
}

/// Value of one unit of the quoted currency in BOB, used by the rate
/// board. Same strong/weak orientation as the X→BOB conversion rule.
pub fn unit_value_bob(quote: &Quote, usd_bob_buy: f64) -> f64 {
    if usd_bob_buy <= 0.0 {
        return 0.0;
    }
    let avg = quote.avg();
    if avg <= 0.0 {
        return 0.0;
    }
    if quote.is_strong() {
        (1.0 / avg) * usd_bob_buy
    } else {
        usd_bob_buy / avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_basket() -> CurrencyBasket {
        CurrencyBasket {
            eur: Quote { buy: 0.92, sell: 0.93 },
            gbp: Quote { buy: 0.78, sell: 0.80 },
            ars: Quote {
                buy: 1000.0,
                sell: 1010.0,
            },
            clp: Quote {
                buy: 940.0,
                sell: 950.0,
            },
            brl: Quote { buy: 5.4, sell: 5.6 },
            pen: Quote { buy: 3.7, sell: 3.8 },
            cny: Quote { buy: 7.1, sell: 7.2 },
            blue: Quote {
                buy: 13.5,
                sell: 13.7,
            },
            official: Quote {
                buy: 6.86,
                sell: 6.96,
            },
        }
    }

    #[test]
    fn test_mean_is_order_independent() {
        let sorted = [13.40, 13.45, 13.50];
        let shuffled = [13.50, 13.40, 13.45];
        assert!((mean(&sorted) - 13.45).abs() < 1e-9);
        assert_eq!(mean(&sorted), mean(&shuffled));
    }

    #[test]
    fn test_mean_of_empty_slice_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_identity_rate_for_every_currency() {
        let basket = test_basket();
        for currency in crate::currency::Currency::ALL {
            assert_eq!(rate(currency, currency, 13.5, &basket), 1.0);
        }
        // Holds even without an anchor price.
        assert_eq!(rate(Currency::Eur, Currency::Eur, 0.0, &basket), 1.0);
    }

    #[test]
    fn test_usd_bob_uses_anchor_directly() {
        let basket = test_basket();
        assert_eq!(rate(Currency::Usd, Currency::Bob, 13.5, &basket), 13.5);
        assert!((rate(Currency::Bob, Currency::Usd, 13.5, &basket) - 1.0 / 13.5).abs() < 1e-12);
    }

    #[test]
    fn test_strong_currency_to_bob_divides_by_midpoint() {
        let basket = test_basket();
        // (1 / 0.925) * 13.5
        let expected = (1.0 / 0.925) * 13.5;
        let got = rate(Currency::Eur, Currency::Bob, 13.5, &basket);
        assert!((got - expected).abs() < 1e-9);
        assert!((got - 14.59).abs() < 0.01);
    }

    #[test]
    fn test_weak_currency_to_bob_divides_anchor_by_midpoint() {
        let basket = test_basket();
        // 13.5 / 1005
        let got = rate(Currency::Ars, Currency::Bob, 13.5, &basket);
        assert!((got - 13.5 / 1005.0).abs() < 1e-9);
        assert!((got - 0.0134).abs() < 0.0001);
    }

    #[test]
    fn test_bob_to_basket_currency_ignores_strength() {
        let basket = test_basket();
        let strong = rate(Currency::Bob, Currency::Eur, 13.5, &basket);
        let weak = rate(Currency::Bob, Currency::Ars, 13.5, &basket);
        assert!((strong - 0.925 / 13.5).abs() < 1e-9);
        assert!((weak - 1005.0 / 13.5).abs() < 1e-9);
    }

    #[test]
    fn test_cross_pairs_are_unsupported() {
        let basket = test_basket();
        for (from, to) in [
            (Currency::Eur, Currency::Ars),
            (Currency::Usd, Currency::Eur),
            (Currency::Gbp, Currency::Usd),
        ] {
            assert_eq!(rate(from, to, 13.5, &basket), 0.0);
            assert_eq!(
                try_rate(from, to, 13.5, &basket),
                Err(RateError::UnsupportedPair { from, to })
            );
        }
    }

    #[test]
    fn test_missing_anchor_is_distinguishable() {
        let basket = test_basket();
        assert_eq!(
            try_rate(Currency::Usd, Currency::Bob, 0.0, &basket),
            Err(RateError::AnchorUnavailable)
        );
        assert_eq!(rate(Currency::Usd, Currency::Bob, 0.0, &basket), 0.0);
    }

    #[test]
    fn test_rate_is_pure() {
        let basket = test_basket();
        let first = rate(Currency::Eur, Currency::Bob, 13.5, &basket);
        let second = rate(Currency::Eur, Currency::Bob, 13.5, &basket);
        assert_eq!(first, second);
    }

    #[test]
    fn test_convert_usd_to_bob() {
        let basket = test_basket();
        let result = convert(100.0, Currency::Usd, Currency::Bob, 13.5, &basket).unwrap();
        assert_eq!(format!("{result:.2}"), "1350.00");
    }

    #[test]
    fn test_unit_value_bob_scenarios() {
        let euro = Quote { buy: 0.92, sell: 0.93 };
        let got = unit_value_bob(&euro, 13.5);
        assert!((got - 14.59).abs() < 0.01);

        let ars = Quote {
            buy: 1000.0,
            sell: 1010.0,
        };
        let got = unit_value_bob(&ars, 13.5);
        assert!((got - 0.0134).abs() < 0.0001);
    }

    #[test]
    fn test_unit_value_bob_guards_degenerate_inputs() {
        let euro = Quote { buy: 0.92, sell: 0.93 };
        assert_eq!(unit_value_bob(&euro, 0.0), 0.0);
        let empty = Quote { buy: 0.0, sell: 0.0 };
        assert_eq!(unit_value_bob(&empty, 13.5), 0.0);
    }

    #[test]
    fn test_basket_decodes_from_aggregator_keys() {
        let json = r#"{
            "Euro": {"buy": 0.92, "sell": 0.93},
            "Libra Esterlina": {"buy": 0.78, "sell": 0.80},
            "Peso Argentino": {"buy": 1000.0, "sell": 1010.0},
            "Peso Chileno": {"buy": 940.0, "sell": 950.0},
            "Real Brasileño": {"buy": 5.4, "sell": 5.6},
            "Sol Peruano": {"buy": 3.7, "sell": 3.8},
            "Yuan Chino": {"buy": 7.1, "sell": 7.2},
            "blue": {"buy": 13.5, "sell": 13.7},
            "official": {"buy": 6.86, "sell": 6.96}
        }"#;

        let basket: CurrencyBasket = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(basket.eur.buy, 0.92);
        assert_eq!(basket.blue.sell, 13.7);
        assert_eq!(basket.quote(Currency::Gbp).unwrap().sell, 0.80);
        assert!(basket.quote(Currency::Usd).is_none());
    }

    #[test]
    fn test_basket_rejects_missing_keys() {
        let json = r#"{"Euro": {"buy": 0.92, "sell": 0.93}}"#;
        assert!(serde_json::from_str::<CurrencyBasket>(json).is_err());
    }
}
