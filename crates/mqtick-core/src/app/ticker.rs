use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::TypeTactic;

/// One periodic timer per tactic binding.
/// - `request_shutdown()` で全 timer に停止を通知する（待たない）
/// - `shutdown_and_join()` で timer task の終了まで待つ
#[derive(Debug)]
pub struct TickerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl TickerGroup {
    /// Spawn a timer per binding. `on_tick` runs on the timer task and must
    /// not block; detach real work with `tokio::spawn`.
    pub fn spawn<F>(bindings: &[TypeTactic], on_tick: F) -> Self
    where
        F: Fn(&TypeTactic) + Clone + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = bindings
            .iter()
            .cloned()
            .map(|binding| {
                let on_tick = on_tick.clone();
                let rx = shutdown_rx.clone();
                tokio::spawn(ticker_loop(binding, on_tick, rx))
            })
            .collect();

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Cancel pending fires. Work already spawned by `on_tick` is untouched.
    pub fn request_shutdown(&self) {
        // ignore send error: every timer may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn ticker_loop<F>(binding: TypeTactic, on_tick: F, mut shutdown_rx: watch::Receiver<bool>)
where
    F: Fn(&TypeTactic),
{
    let period = binding.tactic.interval();
    // first fire one period after start, like a plain ticker
    let Some(start) = Instant::now().checked_add(period) else {
        tracing::error!(task_type = %binding.task_type, ?period, "interval out of range, ticker not started");
        return;
    };
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(task_type = %binding.task_type, ?period, "ticker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                // sender dropped: nobody can restart us either
                if changed.is_err() {
                    break;
                }
            }
            _ = interval.tick() => on_tick(&binding),
        }
    }
    tracing::debug!(task_type = %binding.task_type, "ticker stopped");
}
