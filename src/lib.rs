//! Core library for `paralelo`: upstream fetch adapters, the conversion
//! engine, polling coordinators, and the CLI/API surfaces over them.

pub mod config;
pub mod currency;
pub mod errors;
pub mod history;
pub mod log;
pub mod poller;
pub mod providers;
pub mod rates;
pub mod server;
pub mod summary;
pub mod ui;

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::currency::Currency;
use crate::history::ConversionLog;
use crate::providers::{BinanceP2pProvider, DolarBlueProvider};

pub enum AppCommand {
    Rates,
    Convert {
        from: Currency,
        to: Currency,
        amount: f64,
    },
    Watch,
    Serve {
        listen: Option<String>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let p2p = BinanceP2pProvider::new(config.binance_base_url());
    let basket = DolarBlueProvider::new(config.dolarblue_base_url());

    match command {
        AppCommand::Rates => run_rates(&p2p, &basket).await,
        AppCommand::Convert { from, to, amount } => {
            run_convert(&p2p, &basket, from, to, amount).await
        }
        AppCommand::Watch => run_watch(&config, p2p, basket).await,
        AppCommand::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| config.server.listen.clone());
            let state = server::ApiState {
                p2p: Arc::new(p2p),
                basket: Arc::new(basket),
                source: server::DEFAULT_SOURCE.to_string(),
            };
            server::serve(&listen, state).await
        }
    }
}

async fn run_rates(p2p: &BinanceP2pProvider, basket: &DolarBlueProvider) -> Result<()> {
    let board = summary::fetch_board(p2p, basket).await;
    println!("{}", board.display());

    if board.p2p.is_none() && board.basket.is_none() {
        bail!("all upstream sources failed");
    }
    Ok(())
}

async fn run_convert(
    p2p: &BinanceP2pProvider,
    basket_provider: &DolarBlueProvider,
    from: Currency,
    to: Currency,
    amount: f64,
) -> Result<()> {
    let board = summary::fetch_board(p2p, basket_provider).await;
    let snapshot = board.p2p.as_ref().ok_or_else(|| {
        anyhow!(
            "failed to fetch the parallel USD/BOB price: {}",
            board.p2p_error.as_deref().unwrap_or("unknown error")
        )
    })?;
    let basket = board.basket.as_ref().ok_or_else(|| {
        anyhow!(
            "failed to fetch the reference currency basket: {}",
            board.basket_error.as_deref().unwrap_or("unknown error")
        )
    })?;

    let rate = rates::try_rate(from, to, snapshot.buy_price, basket)?;
    let result = amount * rate;

    let mut log = ConversionLog::new();
    log.record(from, to, amount, result, rate);

    println!(
        "{amount:.2} {from} = {} {to}",
        ui::style_text(&format!("{result:.2}"), ui::StyleType::Value)
    );
    println!("Tasa: 1 {from} = {rate:.4} {to}");
    println!("{}", render_history(&log));
    Ok(())
}

fn render_history(log: &ConversionLog) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Conversión"),
        ui::header_cell("Resultado"),
        ui::header_cell("Tasa"),
        ui::header_cell("Hora"),
    ]);

    for record in log.entries() {
        table.add_row(vec![
            comfy_table::Cell::new(format!("{:.2} {}", record.amount, record.from)),
            ui::value_cell(&format!("{:.2} {}", record.result, record.to)),
            ui::value_cell(&format!("{:.2}", record.rate)),
            comfy_table::Cell::new(record.timestamp.format("%H:%M:%S").to_string()),
        ]);
    }

    table.to_string()
}

async fn run_watch(
    config: &AppConfig,
    p2p: BinanceP2pProvider,
    basket: DolarBlueProvider,
) -> Result<()> {
    let interval = config.poll_interval();
    let p2p_handle =
        poller::spawn_p2p_poller(Arc::new(p2p), interval, config.retry.policy(), true);
    let basket_handle = poller::spawn_basket_poller(Arc::new(basket), interval, true);

    let mut p2p_rx = p2p_handle.state();
    let mut basket_rx = basket_handle.state();

    info!(
        "Watching rates every {}s (Ctrl-C to stop)",
        config.poll_interval_secs
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = p2p_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = basket_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let p2p_state = p2p_rx.borrow_and_update().clone();
        let basket_state = basket_rx.borrow_and_update().clone();
        // Each round publishes a loading state first; only render settled ones.
        if p2p_state.is_loading || basket_state.is_loading {
            continue;
        }
        render_watch_update(&p2p_state, &basket_state);
    }

    p2p_handle.shutdown().await;
    basket_handle.shutdown().await;
    info!("Stopped watching");
    Ok(())
}

fn render_watch_update(p2p: &poller::P2pPriceState, basket: &poller::BasketState) {
    if let Some(err) = &p2p.error {
        println!(
            "{}",
            ui::style_text(&format!("P2P: {err}"), ui::StyleType::Error)
        );
    } else {
        println!(
            "Compra Bs {:.2} | Venta Bs {:.2} | {}",
            p2p.buy_price,
            p2p.sell_price,
            ui::style_text(&p2p.last_update, ui::StyleType::Subtle)
        );
    }

    if let Some(err) = &basket.error {
        println!(
            "{}",
            ui::style_text(&format!("Canasta: {err}"), ui::StyleType::Error)
        );
    } else if let Some(basket) = &basket.basket {
        println!(
            "Blue ref {:.2}/{:.2} | Oficial {:.2}/{:.2}",
            basket.blue.buy, basket.blue.sell, basket.official.buy, basket.official.sell
        );
    }
}
