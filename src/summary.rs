//! One-shot rate board: concurrent fetch plus table rendering.

use std::time::Duration;

use comfy_table::Cell;
use futures::join;
use indicatif::ProgressBar;
use tracing::debug;

use crate::currency::Currency;
use crate::providers::{BasketProvider, P2pSnapshot, ParallelRateProvider};
use crate::rates::{self, CurrencyBasket};
use crate::ui;

/// Everything the `rates` command renders. Either side may be missing
/// when its upstream failed; the other still displays.
#[derive(Debug)]
pub struct RateBoard {
    pub p2p: Option<P2pSnapshot>,
    pub p2p_error: Option<String>,
    pub basket: Option<CurrencyBasket>,
    pub basket_error: Option<String>,
}

impl RateBoard {
    /// USD/BOB anchor for derived values; 0.0 until a P2P fetch succeeds.
    pub fn anchor_price(&self) -> f64 {
        self.p2p.as_ref().map_or(0.0, |snap| snap.buy_price)
    }

    pub fn display(&self) -> String {
        let mut out = String::new();

        out.push_str(&ui::style_text(
            "Dólar paralelo (Binance P2P)",
            ui::StyleType::Title,
        ));
        out.push('\n');

        match (&self.p2p, &self.p2p_error) {
            (Some(snap), _) => {
                out.push_str(&format!(
                    "Compra: {} | Venta: {}\n",
                    ui::style_text(&format!("Bs {:.2}", snap.buy_price), ui::StyleType::Value),
                    ui::style_text(&format!("Bs {:.2}", snap.sell_price), ui::StyleType::Value),
                ));
                out.push_str(&ui::style_text(
                    &format!(
                        "{} anuncios compra (rango {:.2} a {:.2}), {} venta (rango {:.2} a {:.2}), actualizado {}",
                        snap.buy_count,
                        snap.buy_range.min,
                        snap.buy_range.max,
                        snap.sell_count,
                        snap.sell_range.min,
                        snap.sell_range.max,
                        snap.last_update,
                    ),
                    ui::StyleType::Subtle,
                ));
                out.push('\n');
            }
            (None, Some(err)) => {
                out.push_str(&ui::style_text(
                    &format!("Sin datos P2P: {err}"),
                    ui::StyleType::Error,
                ));
                out.push('\n');
            }
            (None, None) => {}
        }

        match (&self.basket, &self.basket_error) {
            (Some(basket), _) => {
                out.push_str(&format!(
                    "Oficial: Bs {:.2} compra / Bs {:.2} venta\n",
                    basket.official.buy, basket.official.sell,
                ));
                out.push_str(&self.currency_table(basket));
                out.push('\n');
            }
            (None, Some(err)) => {
                out.push_str(&ui::style_text(
                    &format!("Sin canasta de referencia: {err}"),
                    ui::StyleType::Error,
                ));
                out.push('\n');
            }
            (None, None) => {}
        }

        out
    }

    fn currency_table(&self, basket: &CurrencyBasket) -> String {
        let anchor = self.anchor_price();
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Moneda"),
            ui::header_cell("Equivalente USD"),
            ui::header_cell("1 unidad en Bs"),
        ]);

        for currency in Currency::BASKET {
            let Some(quote) = basket.quote(currency) else {
                continue;
            };

            let usd_equivalent = if quote.is_strong() {
                format!("{:.2} {}", quote.buy, currency.code())
            } else {
                format!("{:.0} {}", quote.buy, currency.code())
            };

            let bob_value = rates::unit_value_bob(quote, anchor);
            let bob_value = if quote.is_strong() {
                format!("{bob_value:.2}")
            } else {
                format!("{bob_value:.4}")
            };

            table.add_row(vec![
                Cell::new(currency.display_name()),
                ui::value_cell(&usd_equivalent),
                ui::value_cell(&bob_value),
            ]);
        }

        table.to_string()
    }
}

/// Fetches both sources concurrently and assembles the board. A failed
/// source lands as an error string instead of aborting the other.
pub async fn fetch_board(
    p2p: &dyn ParallelRateProvider,
    basket: &dyn BasketProvider,
) -> RateBoard {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Consultando cotizaciones...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let (p2p_result, basket_result) = join!(p2p.fetch_parallel_rate(), basket.fetch_basket());
    spinner.finish_and_clear();

    let (p2p, p2p_error) = match p2p_result {
        Ok(snapshot) => (Some(snapshot), None),
        Err(err) => {
            debug!("P2P fetch failed: {err}");
            (None, Some(err.to_string()))
        }
    };
    let (basket, basket_error) = match basket_result {
        Ok(basket) => (Some(basket), None),
        Err(err) => {
            debug!("Basket fetch failed: {err}");
            (None, Some(err.to_string()))
        }
    };

    RateBoard {
        p2p,
        p2p_error,
        basket,
        basket_error,
    }
}
