//! Polling coordinators for the two upstream sources.
//!
//! Each coordinator is an independent, cancellable task that owns one
//! slice of state and publishes it through a `watch` channel. The two
//! loops are not synchronized with each other; each task is the only
//! writer of its slice. Overlapping ticks are not locked out; the design
//! assumes fetch latency stays below the polling interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::providers::util::{RetryPolicy, with_retry};
use crate::providers::{BasketProvider, ParallelRateProvider, la_paz_now};
use crate::rates::CurrencyBasket;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Latest view of the parallel USD/BOB price. On a failed round the
/// numeric fields are zeroed rather than retaining the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct P2pPriceState {
    pub buy_price: f64,
    pub sell_price: f64,
    pub last_update: String,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for P2pPriceState {
    fn default() -> Self {
        Self {
            buy_price: 0.0,
            sell_price: 0.0,
            last_update: String::new(),
            is_loading: true,
            error: None,
        }
    }
}

/// Latest view of the reference basket.
#[derive(Debug, Clone, PartialEq)]
pub struct BasketState {
    pub basket: Option<CurrencyBasket>,
    pub last_update: String,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for BasketState {
    fn default() -> Self {
        Self {
            basket: None,
            last_update: String::new(),
            is_loading: true,
            error: None,
        }
    }
}

pub type P2pPollerHandle = PollerHandle<P2pPriceState>;
pub type BasketPollerHandle = PollerHandle<BasketState>;

/// Consumer side of one polling task.
pub struct PollerHandle<S> {
    state: watch::Receiver<S>,
    refresh: mpsc::Sender<()>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<S: Clone> PollerHandle<S> {
    /// Receiver for the published state; `changed()` fires on every round.
    pub fn state(&self) -> watch::Receiver<S> {
        self.state.clone()
    }

    pub fn current(&self) -> S {
        self.state.borrow().clone()
    }

    /// Requests an immediate re-fetch with a fresh retry budget. A refresh
    /// already queued behind an in-flight round is not duplicated.
    pub fn refresh(&self) {
        let _ = self.refresh.try_send(());
    }

    /// Stops the polling task. A round already in flight finishes and
    /// publishes before the loop exits.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

async fn p2p_round(
    provider: &dyn ParallelRateProvider,
    retry: &RetryPolicy,
    state_tx: &watch::Sender<P2pPriceState>,
) {
    state_tx.send_modify(|state| {
        state.is_loading = true;
        state.error = None;
    });

    match with_retry(retry, || provider.fetch_parallel_rate()).await {
        Ok(snapshot) => {
            state_tx.send_replace(P2pPriceState {
                buy_price: snapshot.buy_price,
                sell_price: snapshot.sell_price,
                last_update: snapshot.last_update,
                is_loading: false,
                error: None,
            });
        }
        Err(err) => {
            warn!("P2P price fetch failed after retries: {err}");
            state_tx.send_replace(P2pPriceState {
                buy_price: 0.0,
                sell_price: 0.0,
                last_update: String::new(),
                is_loading: false,
                error: Some(err.to_string()),
            });
        }
    }
}

async fn basket_round(provider: &dyn BasketProvider, state_tx: &watch::Sender<BasketState>) {
    state_tx.send_modify(|state| {
        state.is_loading = true;
    });

    match provider.fetch_basket().await {
        Ok(basket) => {
            state_tx.send_replace(BasketState {
                basket: Some(basket),
                last_update: la_paz_now(),
                is_loading: false,
                error: None,
            });
        }
        Err(err) => {
            warn!("Currency basket fetch failed: {err}");
            state_tx.send_replace(BasketState {
                basket: None,
                last_update: String::new(),
                is_loading: false,
                error: Some(err.to_string()),
            });
        }
    }
}

/// Spawns the P2P price coordinator: fetch on start, then every
/// `interval` while `auto_refresh` holds. Each round runs the fetch under
/// `retry`; a round that exhausts its budget publishes a zeroed error
/// state that stands until the next round or a manual [`PollerHandle::refresh`].
pub fn spawn_p2p_poller(
    provider: Arc<dyn ParallelRateProvider>,
    interval: Duration,
    retry: RetryPolicy,
    auto_refresh: bool,
) -> P2pPollerHandle {
    let (state_tx, state_rx) = watch::channel(P2pPriceState::default());
    let (refresh_tx, mut refresh_rx) = mpsc::channel::<()>(1);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The interval's first tick completes at once: the fetch-on-start.
        ticker.tick().await;
        p2p_round(&*provider, &retry, &state_tx).await;

        loop {
            tokio::select! {
                _ = ticker.tick(), if auto_refresh => {}
                received = refresh_rx.recv() => {
                    if received.is_none() {
                        // Handle dropped; nobody can observe further rounds.
                        break;
                    }
                    ticker.reset();
                }
                _ = shutdown_rx.changed() => break,
            }
            p2p_round(&*provider, &retry, &state_tx).await;
        }
        debug!("P2P poller stopped");
    });

    PollerHandle {
        state: state_rx,
        refresh: refresh_tx,
        shutdown: shutdown_tx,
        task,
    }
}

/// Spawns the reference-basket coordinator. No retry: a single failure
/// surfaces immediately in the published state.
pub fn spawn_basket_poller(
    provider: Arc<dyn BasketProvider>,
    interval: Duration,
    auto_refresh: bool,
) -> BasketPollerHandle {
    let (state_tx, state_rx) = watch::channel(BasketState::default());
    let (refresh_tx, mut refresh_rx) = mpsc::channel::<()>(1);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        basket_round(&*provider, &state_tx).await;

        loop {
            tokio::select! {
                _ = ticker.tick(), if auto_refresh => {}
                received = refresh_rx.recv() => {
                    if received.is_none() {
                        break;
                    }
                    ticker.reset();
                }
                _ = shutdown_rx.changed() => break,
            }
            basket_round(&*provider, &state_tx).await;
        }
        debug!("Basket poller stopped");
    });

    PollerHandle {
        state: state_rx,
        refresh: refresh_tx,
        shutdown: shutdown_tx,
        task,
    }
}
