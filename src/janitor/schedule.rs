//! Background scheduling for the janitor.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::Janitor;

/// Default period between sweeps (six hours).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Handle to a running sweeper task. Dropping it cancels the task.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
    cancel: DropGuard,
}

impl SweeperHandle {
    /// Cancels the task and waits for it to stop.
    pub async fn shutdown(self) {
        let Self { task, cancel } = self;
        drop(cancel);
        if let Err(err) = task.await {
            tracing::warn!(error = %err, "sweeper task ended abnormally");
        }
    }

    /// Returns `true` once the task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Starts sweeping immediately and then every `interval` until the returned
/// handle is shut down or dropped. Must be called inside a tokio runtime.
#[must_use = "dropping the handle stops the sweeper"]
pub fn spawn_sweeper(janitor: Janitor, interval: Duration) -> SweeperHandle {
    let token = CancellationToken::new();
    let period = interval.max(Duration::from_millis(1));
    let task = tokio::spawn(run(janitor, period, token.clone()));
    SweeperHandle {
        task,
        cancel: token.drop_guard(),
    }
}

async fn run(janitor: Janitor, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = period.as_secs(), "sweeper started");

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            () = token.cancelled() => break,
            result = janitor.sweep() => match result {
                Ok(summary) => tracing::info!(%summary, "sweep complete"),
                Err(err) => tracing::error!(error = %err, "sweep failed"),
            },
        }
    }

    tracing::info!("sweeper stopped");
}
