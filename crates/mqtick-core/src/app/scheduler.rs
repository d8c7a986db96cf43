//! Scheduler - tactic ごとの timer の起動・停止
//!
//! - start: 現在の snapshot の TypeTactic ごとに timer を 1 つ起動
//! - stop: 全 timer に停止を通知するだけ（実行中の handler は待たない）
//! - restart: stop → start（tactic の変更を次の周期から反映）
//! - shutdown: stop して timer と実行中の tick / handler の終了まで待つ

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::dispatch::Dispatcher;
use super::ticker::TickerGroup;
use crate::domain::TypeTactic;
use crate::registry::SharedRegistries;

pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    registries: Arc<SharedRegistries>,
    tickers: Mutex<Option<TickerGroup>>,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, registries: Arc<SharedRegistries>) -> Self {
        Self {
            dispatcher,
            registries,
            tickers: Mutex::new(None),
        }
    }

    /// Start one timer per tactic binding. No-op when already running.
    pub async fn start(&self) {
        let mut tickers = self.tickers.lock().await;
        if tickers.is_none() {
            *tickers = Some(self.spawn_tickers().await);
        }
    }

    /// Cancel every timer without waiting for anything. Returns whether the
    /// scheduler was running.
    pub async fn stop(&self) -> bool {
        let Some(group) = self.tickers.lock().await.take() else {
            return false;
        };
        group.request_shutdown();
        info!(timers = group.len(), "scheduler stopped");
        true
    }

    /// Replace every timer with fresh ones built from the current tactics.
    /// Does nothing while stopped.
    pub async fn restart(&self) {
        let mut tickers = self.tickers.lock().await;
        let Some(old) = tickers.take() else {
            return;
        };
        old.request_shutdown();
        *tickers = Some(self.spawn_tickers().await);
    }

    pub async fn is_running(&self) -> bool {
        self.tickers.lock().await.is_some()
    }

    /// Stop, then wait for the timers, in-flight ticks and handler
    /// invocations to finish.
    pub async fn shutdown(&self) {
        let group = self.tickers.lock().await.take();
        if let Some(group) = group {
            group.shutdown_and_join().await;
        }
        self.dispatcher.in_flight().wait_idle().await;
        info!("scheduler drained");
    }

    async fn spawn_tickers(&self) -> TickerGroup {
        let snapshot = self.registries.snapshot().await;
        let dispatcher = Arc::clone(&self.dispatcher);
        let registries = Arc::clone(&self.registries);

        let group = TickerGroup::spawn(snapshot.tactics.entries(), move |binding: &TypeTactic| {
            // tick body runs detached so store latency never delays the timer
            let guard = dispatcher.in_flight().enter();
            let dispatcher = Arc::clone(&dispatcher);
            let registries = Arc::clone(&registries);
            let binding = binding.clone();
            tokio::spawn(async move {
                let _guard = guard;
                let snapshot = registries.snapshot().await;
                dispatcher.run_tick(&binding, &snapshot).await;
            });
        });
        info!(timers = group.len(), "scheduler started");
        group
    }
}
